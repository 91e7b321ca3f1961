//! Binary leaf files: the concatenation of 32-byte leaves in insertion order.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use zkb_core::base::{FIELD_SIZE, Field};

const FILE_BUF_SIZE: usize = 1024 * 1024;

/// Write leaves to an async writer.
///
/// # Errors
/// Returns an error if writing or flushing fails.
pub async fn write_leaves(
    leaves: &[Field],
    mut writer: impl AsyncWriteExt + Unpin,
) -> std::io::Result<()> {
    writer.write_all(bytemuck::cast_slice(leaves)).await?;
    writer.flush().await?;

    Ok(())
}

/// Read leaves from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - Reading fails
/// - The input size is not a multiple of 32 bytes
pub async fn read_leaves(mut reader: impl AsyncReadExt + Unpin) -> std::io::Result<Vec<Field>> {
    let mut buf = Vec::with_capacity(FILE_BUF_SIZE);
    reader.read_to_end(&mut buf).await?;

    if buf.len() % FIELD_SIZE != 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file has {} bytes which is not a multiple of leaf size ({FIELD_SIZE})",
                buf.len(),
            ),
        ));
    }

    let leaves: Vec<Field> = bytemuck::cast_slice(&buf).to_vec();

    Ok(leaves)
}
