//! Resolution of the files the tool reads and writes.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::Args;

/// Locations of every file touched during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Shared credentials file holding the long-term profiles.
    pub credentials: PathBuf,
    /// Directory with one `<profile>.session` JSON file per profile.
    pub session_dir: PathBuf,
    /// Shell file overwritten with `export` lines for the active session.
    pub env_file: PathBuf,
}

impl Paths {
    /// Fills any path not given on the command line with its default under `~/.aws`.
    pub fn resolve(args: &Args) -> Result<Self> {
        let aws_dir = || {
            dirs::home_dir()
                .map(|d| d.join(".aws"))
                .context("Could not determine home directory")
        };
        let or_default = |explicit: &Option<PathBuf>, name: &str| -> Result<PathBuf> {
            match explicit {
                Some(path) => Ok(path.clone()),
                None => aws_dir().map(|dir| dir.join(name)),
            }
        };

        Ok(Self {
            credentials: or_default(&args.credentials_path, "credentials")?,
            session_dir: or_default(&args.session_dir, "session-data")?,
            env_file: or_default(&args.env_file, "env")?,
        })
    }

    /// Lays every file out under a single directory.
    #[cfg(test)]
    pub fn under(root: &std::path::Path) -> Self {
        Self {
            credentials: root.join("credentials"),
            session_dir: root.join("session-data"),
            env_file: root.join("env"),
        }
    }
}
