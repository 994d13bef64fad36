use quinn::{Connection, ConnectionError, Endpoint, VarInt};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::constants::{CLOSE_FAILED, CLOSE_OK};
use super::protocol::encode_header;
use super::quic::make_client_endpoint;
use super::utils::{CopyError, copy_payload, format_transfer_speed};
use crate::config::ClientConfig;
use crate::error::{Result, TransferError};

/// Outcome of a successful send
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Name announced to the server (base name of the source path)
    pub file_name: String,
    pub bytes: u64,
    pub remote_addr: SocketAddr,
}

/// Send one file to `server_addr` (`host:port`).
///
/// The source file is opened before any network activity, so an unreadable
/// path never produces a connection attempt.
pub async fn send_file(
    file_path: &Path,
    server_addr: &str,
    config: &ClientConfig,
) -> Result<TransferReport> {
    let (file, file_name) = open_source(file_path).await?;

    let remote_addr = resolve(server_addr).await?;
    let endpoint = make_client_endpoint(remote_addr).map_err(|e| TransferError::Connect {
        addr: server_addr.to_string(),
        reason: format!("cannot create client endpoint: {}", e),
    })?;

    let connection = match connect(&endpoint, remote_addr, config).await {
        Ok(connection) => connection,
        Err(e) => {
            // Nothing was established, so there is nothing worth draining
            endpoint.close(CLOSE_FAILED, b"");
            return Err(e);
        }
    };

    let result = send_on_connection(&connection, remote_addr, file, &file_name).await;
    connection.close(close_code(&result), b"");
    endpoint.wait_idle().await;
    result
}

async fn send_on_connection(
    connection: &Connection,
    remote_addr: SocketAddr,
    mut file: File,
    file_name: &str,
) -> Result<TransferReport> {
    let result: Result<u64> = async {
        let (mut send_stream, _recv_stream) = connection
            .open_bi()
            .await
            .map_err(TransferError::StreamOpen)?;
        debug!("Stream opened to {}", remote_addr);

        let start_time = Instant::now();
        let bytes = write_transfer(&mut send_stream, file_name, &mut file).await?;

        // Closing the stream marks the end of the payload
        send_stream
            .finish()
            .map_err(|e| TransferError::transport(format!("cannot finish stream: {}", e), None))?;
        wait_for_server_close(connection).await?;

        info!(
            "Sent {} ({} bytes, {})",
            file_name,
            bytes,
            format_transfer_speed(bytes, start_time.elapsed().as_secs_f64())
        );
        Ok(bytes)
    }
    .await;

    result.map(|bytes| TransferReport {
        file_name: file_name.to_string(),
        bytes,
        remote_addr,
    })
}

fn close_code<T>(result: &Result<T>) -> VarInt {
    if result.is_ok() { CLOSE_OK } else { CLOSE_FAILED }
}

/// Write the header for `file_name` followed by everything `source` yields
pub async fn write_transfer<W, R>(stream: &mut W, file_name: &str, source: &mut R) -> Result<u64>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let header = encode_header(file_name)?;
    stream
        .write_all(&header)
        .await
        .map_err(|e| TransferError::transport("failed to send header", Some(e)))?;

    copy_payload(source, stream).await.map_err(|e| match e {
        CopyError::Read(e) => TransferError::storage(file_name, e),
        CopyError::Write(e) => TransferError::transport("failed to send payload", Some(e)),
    })
}

async fn open_source(file_path: &Path) -> Result<(File, String)> {
    let open_err = |source: std::io::Error| TransferError::FileOpen {
        path: PathBuf::from(file_path),
        source,
    };

    let file = File::open(file_path).await.map_err(open_err)?;
    let metadata = file.metadata().await.map_err(open_err)?;
    if metadata.is_dir() {
        return Err(open_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "is a directory",
        )));
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            open_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;

    Ok((file, file_name))
}

async fn resolve(server_addr: &str) -> Result<SocketAddr> {
    let connect_err = |reason: String| TransferError::Connect {
        addr: server_addr.to_string(),
        reason,
    };

    tokio::net::lookup_host(server_addr)
        .await
        .map_err(|e| connect_err(format!("cannot resolve address: {}", e)))?
        .next()
        .ok_or_else(|| connect_err("address resolved to nothing".to_string()))
}

async fn connect(
    endpoint: &Endpoint,
    remote_addr: SocketAddr,
    config: &ClientConfig,
) -> Result<Connection> {
    let connect_err = |reason: String| TransferError::Connect {
        addr: remote_addr.to_string(),
        reason,
    };

    let connecting = endpoint
        .connect(remote_addr, &config.server_name)
        .map_err(|e| connect_err(e.to_string()))?;

    let timeout = config.connect_timeout();
    match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(connection)) => {
            info!("Connected to {}", remote_addr);
            Ok(connection)
        }
        Ok(Err(e)) => Err(connect_err(e.to_string())),
        Err(_) => Err(connect_err(format!("timed out after {:?}", timeout))),
    }
}

/// The server closes the connection once its handler returns; a non-zero
/// close code means the handler failed.
async fn wait_for_server_close(connection: &Connection) -> Result<()> {
    match connection.closed().await {
        ConnectionError::ApplicationClosed(close) if close.error_code == CLOSE_OK => Ok(()),
        ConnectionError::ApplicationClosed(close) => Err(TransferError::transport(
            format!(
                "server failed to store the file (close code {})",
                close.error_code
            ),
            None,
        )),
        e => Err(TransferError::transport(
            format!("connection lost before server finished: {}", e),
            None,
        )),
    }
}
