//! Shell environment file emitter.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{files::write_private, session::Session};

/// File the calling shell sources to pick up the active session.
pub struct EnvFile {
    /// Destination, typically `~/.aws/env`
    path: PathBuf,
}

impl EnvFile {
    /// Targets `path`. Nothing is written until [`EnvFile::write`].
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location the shell should `source`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the whole file with the exports for `session`.
    ///
    /// # Errors
    ///
    /// Fails if the file or its parent directory cannot be written.
    pub async fn write(&self, session: &Session) -> Result<()> {
        write_private(&self.path, &render(session)).await
    }
}

/// One `export KEY=value` line per variable, newline-joined.
pub fn render(session: &Session) -> String {
    [
        ("AWS_ACCESS_KEY_ID", &session.access_key_id),
        ("AWS_SECRET_ACCESS_KEY", &session.secret_access_key),
        ("AWS_SESSION_TOKEN", &session.session_token),
    ]
    .iter()
    .map(|(key, value)| format!("export {key}={value}"))
    .collect::<Vec<_>>()
    .join("\n")
}
