// Platform configuration
// Built once at startup and handed down explicitly; core logic never probes the OS itself.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Unix,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OsFamily::Windows => write!(f, "windows"),
            OsFamily::Unix => write!(f, "unix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os_family: OsFamily,
    /// Appended to compiled artifacts (`.exe` / `.out`)
    pub executable_suffix: String,
    /// Interpreter used by the built-in python profile
    pub python_command: String,
}

impl Platform {
    pub fn unix() -> Self {
        Self {
            os_family: OsFamily::Unix,
            executable_suffix: ".out".to_string(),
            python_command: "python3".to_string(),
        }
    }

    pub fn windows() -> Self {
        Self {
            os_family: OsFamily::Windows,
            executable_suffix: ".exe".to_string(),
            python_command: "python".to_string(),
        }
    }

    /// Platform of the running process, with the interpreter looked up on PATH
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self {
                python_command: unix_python_command(|cmd| which::which(cmd).is_ok()),
                ..Self::unix()
            }
        }
    }
}

/// `python3` when installed, otherwise plain `python`
fn unix_python_command(installed: impl Fn(&str) -> bool) -> String {
    if installed("python3") {
        "python3".to_string()
    } else {
        "python".to_string()
    }
}
