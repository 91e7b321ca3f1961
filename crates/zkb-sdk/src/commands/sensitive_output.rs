//! Owner-only output files for note secrets and transparent proofs.

use std::path::Path;

use eyre::Context as _;
use tokio::io::AsyncWriteExt as _;

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WriteMode {
    /// Fail instead of touching the existing file.
    CreateNew,
    /// Truncate and rewrite it.
    Replace,
}

/// Write a file readable only by its owner.
///
/// On Unix this enforces permissions `0o600`, also on a replaced file.
///
/// # Errors
/// Returns an error if the file exists under [`WriteMode::CreateNew`], or it
/// cannot be created, written, flushed, or permission-adjusted.
pub(super) async fn write_sensitive_output(
    path: &Path,
    contents: &str,
    mode: WriteMode,
) -> eyre::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    match mode {
        WriteMode::CreateNew => options.create_new(true),
        WriteMode::Replace => options.create(true).truncate(true),
    };
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;

        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    Ok(())
}
