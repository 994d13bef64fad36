use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::protocol::decode_header;
use super::utils::{
    CopyError, copy_payload, create_destination_file, format_transfer_speed, sanitize_file_name,
};
use crate::error::{Result, TransferError};

/// A file stored by the acceptor
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    /// Name the sender announced in the header
    pub original_name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Receive a single file from the stream into `upload_dir`.
///
/// Nothing is created on disk until the whole header has been decoded. The
/// payload is whatever follows the header up to the end of the stream.
pub async fn handle_stream<R>(stream: &mut R, upload_dir: &Path) -> Result<ReceivedFile>
where
    R: AsyncRead + Unpin,
{
    // 1. Header
    let original_name = decode_header(stream).await?;
    debug!("Header decoded: {:?}", original_name);

    // 2. Destination
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| TransferError::storage(upload_dir, e))?;

    let safe_name = sanitize_file_name(&original_name);
    let (path, mut file) = create_destination_file(upload_dir, &safe_name)
        .await
        .map_err(|e| TransferError::storage(upload_dir, e))?;
    info!("Receiving: {:?} -> {:?}", original_name, path);

    // 3. Payload
    let start_time = Instant::now();
    let bytes = match copy_payload(stream, &mut file).await {
        Ok(n) => n,
        Err(e) => {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!("Could not remove partial file {:?}: {}", path, remove_err);
            }
            return Err(match e {
                CopyError::Read(e) => {
                    TransferError::transport("stream failed during payload", Some(e))
                }
                CopyError::Write(e) => TransferError::storage(&path, e),
            });
        }
    };

    info!(
        "Receive file success: {:?} ({} bytes, {})",
        path,
        bytes,
        format_transfer_speed(bytes, start_time.elapsed().as_secs_f64())
    );

    Ok(ReceivedFile {
        original_name,
        path,
        bytes,
    })
}
