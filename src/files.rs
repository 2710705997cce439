//! Filesystem helpers for files holding live credentials.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

/// Overwrites `path` with `contents`, creating parent directories and
/// restricting the file to its owner.
///
/// The write is not atomic. A crash midway can leave a truncated file, which
/// the session cache then reads as "no session".
///
/// # Errors
///
/// Fails if a parent directory cannot be created, the file cannot be
/// written, or (on Unix) its permissions cannot be set.
pub async fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path).await?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions).await?;
    }

    Ok(())
}
