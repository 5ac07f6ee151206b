//! The two programs this init ever runs.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which child slot a program fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs once at boot; waited on synchronously.
    InitScript,
    /// Respawned whenever it exits.
    Login,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::InitScript => f.write_str("init-script"),
            Role::Login => f.write_str("login"),
        }
    }
}

/// An executable and its full argument vector (`args[0]` included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub role: Role,
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl Program {
    /// `shell script`, e.g. `bash /etc/sysinit`.
    pub fn init_script(shell: &Path, script: &Path) -> Self {
        Self {
            role: Role::InitScript,
            path: shell.to_path_buf(),
            args: vec![arg0(shell), script.to_string_lossy().into_owned()],
        }
    }

    /// The login program with no arguments.
    pub fn login(path: &Path) -> Self {
        Self {
            role: Role::Login,
            path: path.to_path_buf(),
            args: vec![arg0(path)],
        }
    }
}

fn arg0(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
