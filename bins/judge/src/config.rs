// Language configuration management for the judge
use crate::engine::CommandSpec;
use anyhow::{bail, Context, Result};
use judge_common::config::Platform;
use judge_common::types::LanguageMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Placeholder replaced by the source file path
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder replaced by the compiled artifact path
pub const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// A command template: program plus arguments, with placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageExecution {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LanguageExecution {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute placeholders and produce a runnable command
    pub fn render(&self, source: &Path, artifact: &Path) -> CommandSpec {
        let source = source.to_string_lossy();
        let artifact = artifact.to_string_lossy();
        let fill = |s: &str| {
            s.replace(SOURCE_PLACEHOLDER, &source)
                .replace(ARTIFACT_PLACEHOLDER, &artifact)
        };
        CommandSpec::new(fill(&self.command)).args(self.args.iter().map(|a| fill(a)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub mode: LanguageMode,
    /// Source file used when none is given on the command line
    pub default_source: String,
    /// Build step; required for compiled languages
    #[serde(default)]
    pub compile: Option<LanguageExecution>,
    pub run: LanguageExecution,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<String, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Profiles available without any configuration file
    pub fn builtin(platform: &Platform) -> Self {
        let cpp = LanguageConfig {
            name: "cpp".to_string(),
            mode: LanguageMode::Compiled,
            default_source: "main.cpp".to_string(),
            compile: Some(LanguageExecution::new(
                "g++",
                &["-std=c++11", SOURCE_PLACEHOLDER, "-o", ARTIFACT_PLACEHOLDER, "-Wall"],
            )),
            run: LanguageExecution::new(ARTIFACT_PLACEHOLDER, &[]),
        };
        let python = LanguageConfig {
            name: "python".to_string(),
            mode: LanguageMode::Interpreted,
            default_source: "main.py".to_string(),
            compile: None,
            run: LanguageExecution::new(&platform.python_command, &[SOURCE_PLACEHOLDER]),
        };

        let configs = [cpp, python]
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        Self { configs }
    }

    /// Load language configurations from a languages.json, on top of the built-ins
    pub fn load(config_path: &Path, platform: &Platform) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let languages_json: LanguagesJson = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let mut manager = Self::builtin(platform);
        for lang in languages_json.languages {
            validate(&lang)?;
            manager.configs.insert(lang.name.to_lowercase(), lang);
        }

        Ok(manager)
    }

    /// Load from `path` when given, otherwise use the built-ins
    pub fn load_or_builtin(path: Option<&Path>, platform: &Platform) -> Result<Self> {
        match path {
            Some(path) => Self::load(path, platform),
            None => Ok(Self::builtin(platform)),
        }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &str) -> Result<&LanguageConfig> {
        self.configs
            .get(&language.to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No configuration found for language: {} (available: {})",
                    language,
                    self.list_languages().join(", ")
                )
            })
    }

    /// List all supported languages, sorted
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }
}

fn validate(lang: &LanguageConfig) -> Result<()> {
    if lang.name.trim().is_empty() {
        bail!("Language name cannot be empty");
    }
    if lang.run.command.trim().is_empty() {
        bail!("Language '{}' has an empty run command", lang.name);
    }
    if lang.mode == LanguageMode::Compiled && lang.compile.is_none() {
        bail!("Compiled language '{}' has no compile command", lang.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_profiles() {
        let manager = LanguageConfigManager::builtin(&Platform::unix());
        assert_eq!(manager.list_languages(), vec!["cpp", "python"]);

        let cpp = manager.get_config("CPP").unwrap();
        assert_eq!(cpp.mode, LanguageMode::Compiled);
        assert!(cpp.compile.is_some());

        let python = manager.get_config("python").unwrap();
        assert_eq!(python.mode, LanguageMode::Interpreted);
        assert_eq!(python.run.command, "python3");
        assert_eq!(python.default_source, "main.py");
    }

    #[test]
    fn test_windows_python_command() {
        let manager = LanguageConfigManager::builtin(&Platform::windows());
        assert_eq!(manager.get_config("python").unwrap().run.command, "python");
    }

    #[test]
    fn test_unknown_language() {
        let manager = LanguageConfigManager::builtin(&Platform::unix());
        let err = manager.get_config("cobol").unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn test_render_placeholders() {
        let manager = LanguageConfigManager::builtin(&Platform::unix());
        let compile = manager.get_config("cpp").unwrap().compile.clone().unwrap();

        let spec = compile.render(&PathBuf::from("main.cpp"), &PathBuf::from("cases/temp_build_1.out"));
        assert_eq!(spec.program, "g++");
        assert_eq!(
            spec.args,
            vec!["-std=c++11", "main.cpp", "-o", "cases/temp_build_1.out", "-Wall"]
        );
    }

    #[test]
    fn test_load_overrides_and_extends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("languages.json");
        fs::write(
            &path,
            r#"{
                "languages": [
                    {
                        "name": "c",
                        "mode": "compiled",
                        "default_source": "main.c",
                        "compile": { "command": "gcc", "args": ["{source}", "-o", "{artifact}"] },
                        "run": { "command": "{artifact}" }
                    },
                    {
                        "name": "python",
                        "mode": "interpreted",
                        "default_source": "solution.py",
                        "run": { "command": "pypy3", "args": ["{source}"] }
                    }
                ]
            }"#,
        )
        .unwrap();

        let manager = LanguageConfigManager::load(&path, &Platform::unix()).unwrap();
        assert_eq!(manager.list_languages(), vec!["c", "cpp", "python"]);
        assert_eq!(manager.get_config("python").unwrap().run.command, "pypy3");
        assert!(manager.get_config("c").unwrap().run.args.is_empty());
    }

    #[test]
    fn test_compiled_without_compile_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("languages.json");
        fs::write(
            &path,
            r#"{"languages": [{"name": "go", "mode": "compiled", "default_source": "main.go",
                "run": {"command": "{artifact}"}}]}"#,
        )
        .unwrap();

        let err = LanguageConfigManager::load(&path, &Platform::unix()).unwrap_err();
        assert!(err.to_string().contains("no compile command"));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let result = LanguageConfigManager::load_or_builtin(
            Some(&dir.path().join("languages.json")),
            &Platform::unix(),
        );
        assert!(result.is_err());

        assert!(LanguageConfigManager::load_or_builtin(None, &Platform::unix()).is_ok());
    }
}
