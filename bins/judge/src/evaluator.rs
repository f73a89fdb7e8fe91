//! Output Evaluator - Line Reader and Comparator
//!
//! **Core Responsibility:**
//! Decide whether a program's captured output matches the expected output file,
//! and describe every difference precisely.
//!
//! **Critical Properties:**
//! - Knows nothing about processes or languages
//! - Never fails: missing files read as empty
//! - Diagnostics show ORIGINAL text and ORIGINAL line numbers, never the
//!   normalized view
//!
//! **Normalization Rules (from `ComparisonConfig`):**
//! - `\r\n` vs `\n`: always ignored (Line Reader)
//! - Trailing whitespace: ignored by default
//! - Leading whitespace: significant by default
//! - Blank lines: significant by default
//! - Case sensitivity: always exact

use judge_common::types::ComparisonConfig;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

/// Read a file as lines with a trailing `\r` stripped from each one
///
/// A missing file yields an empty sequence. Callers check existence
/// beforehand whenever "missing" and "empty" must be told apart.
pub fn read_lines(path: &Path) -> Vec<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read file; treating as empty");
            return Vec::new();
        }
    };

    String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// A line after normalization, still pointing back at what was really written
#[derive(Debug, Clone)]
struct PreparedLine<'a> {
    line_no: usize,
    original: &'a str,
    normalized: &'a str,
}

fn prepare<'a>(lines: &'a [String], config: &ComparisonConfig) -> Vec<PreparedLine<'a>> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let mut normalized = line.as_str();
            if config.ignore_trailing_spaces {
                normalized = normalized.trim_end();
            }
            if config.ignore_leading_spaces {
                normalized = normalized.trim_start();
            }
            if config.ignore_blank_lines && normalized.trim().is_empty() {
                return None;
            }
            Some(PreparedLine {
                line_no: idx + 1,
                original: line.as_str(),
                normalized,
            })
        })
        .collect()
}

/// One diagnostic produced by the comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    LineCount {
        actual: usize,
        expected: usize,
    },
    LineMismatch {
        actual_line: usize,
        expected_line: usize,
        actual: String,
        expected: String,
    },
    Extra {
        line: usize,
        text: String,
    },
    Missing {
        line: usize,
        text: String,
    },
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiffEntry::LineCount { actual, expected } => write!(
                f,
                "Line count mismatch: Your output ({}) vs Expected ({})",
                actual, expected
            ),
            DiffEntry::LineMismatch {
                actual_line,
                expected_line,
                actual,
                expected,
            } => {
                if actual_line == expected_line {
                    writeln!(f, "Line {} mismatch:", actual_line)?;
                } else {
                    writeln!(
                        f,
                        "Line {} mismatch (expected line {}):",
                        actual_line, expected_line
                    )?;
                }
                writeln!(f, "  Your output: {}", actual)?;
                write!(f, "  Expected: {}", expected)
            }
            DiffEntry::Extra { line, text } => write!(f, "  Extra line {}: {}", line, text),
            DiffEntry::Missing { line, text } => write!(f, "  Missing line {}: {}", line, text),
        }
    }
}

/// Result of comparing two outputs
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    pub entries: Vec<DiffEntry>,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable report, one entry per line group
    pub fn report(&self) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.entries.len() + 2);
        let mut section: Option<&'static str> = None;

        for entry in &self.entries {
            let heading = match entry {
                DiffEntry::Extra { .. } => Some("Extra lines in your output:"),
                DiffEntry::Missing { .. } => Some("Missing lines in your output:"),
                _ => None,
            };
            if let Some(heading) = heading {
                if section != Some(heading) {
                    out.push(heading.to_string());
                    section = Some(heading);
                }
            }
            out.push(entry.to_string());
        }

        out.join("\n")
    }
}

/// Compare two line sequences under `config`
pub fn compare_lines(actual: &[String], expected: &[String], config: &ComparisonConfig) -> Comparison {
    let actual = prepare(actual, config);
    let expected = prepare(expected, config);
    let mut entries = Vec::new();

    if actual.len() != expected.len() {
        entries.push(DiffEntry::LineCount {
            actual: actual.len(),
            expected: expected.len(),
        });
    }

    for (a, e) in actual.iter().zip(expected.iter()) {
        if a.normalized != e.normalized {
            entries.push(DiffEntry::LineMismatch {
                actual_line: a.line_no,
                expected_line: e.line_no,
                actual: a.original.to_string(),
                expected: e.original.to_string(),
            });
        }
    }

    let common = actual.len().min(expected.len());
    entries.extend(actual[common..].iter().map(|l| DiffEntry::Extra {
        line: l.line_no,
        text: l.original.to_string(),
    }));
    entries.extend(expected[common..].iter().map(|l| DiffEntry::Missing {
        line: l.line_no,
        text: l.original.to_string(),
    }));

    Comparison { entries }
}

/// Compare an output file against an expected-output file
///
/// ## Returns
/// `(is_match, diff_report)`; the report is empty on a match
pub fn compare(actual_path: &Path, expected_path: &Path, config: &ComparisonConfig) -> (bool, String) {
    let comparison = compare_files(actual_path, expected_path, config);
    (comparison.is_match(), comparison.report())
}

/// Structured form of [`compare`]
pub fn compare_files(actual_path: &Path, expected_path: &Path, config: &ComparisonConfig) -> Comparison {
    let actual = read_lines(actual_path);
    let expected = read_lines(expected_path);
    compare_lines(&actual, &expected, config)
}
