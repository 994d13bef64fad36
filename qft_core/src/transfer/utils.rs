use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::constants::{BUFFER_SIZE, CREATE_ATTEMPTS, DISAMBIGUATOR_RANGE, UNKNOWN_FILE_NAME};

/// Strip directory components and control characters from a received name
pub fn sanitize_file_name(file_name: &str) -> String {
    // Split by both / and \ so Windows-style paths are handled too
    let file_name = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let clean_name: String = file_name.chars().filter(|c| !c.is_control()).collect();

    if clean_name == ".." || clean_name == "." || clean_name.trim().is_empty() {
        return UNKNOWN_FILE_NAME.to_string();
    }

    clean_name
}

/// `"<name>-<unix_timestamp>-<random>"`
pub fn destination_name(name: &str, unix_timestamp: u64, random: u32) -> String {
    format!("{}-{}-{}", name, unix_timestamp, random)
}

/// Destination name for `name` using the current time and a fresh random number
pub fn new_destination_name(name: &str) -> String {
    let unix_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let random = rand::rng().random_range(0..DISAMBIGUATOR_RANGE);
    destination_name(name, unix_timestamp, random)
}

/// Create a file that did not exist before (0o600 on Unix)
pub async fn create_new_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Create a fresh destination file for `name` inside `dir`.
///
/// A derived name that already exists is never reused; a new disambiguator is
/// drawn instead, up to `CREATE_ATTEMPTS` times.
pub async fn create_destination_file(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let mut last_err = None;
    for _ in 0..CREATE_ATTEMPTS {
        let path = dir.join(new_destination_name(name));
        match create_new_file(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("Destination {:?} already exists, retrying", path);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)))
}

/// Which side of a copy failed
#[derive(Debug)]
pub enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Stream everything from `reader` into `writer` through a fixed-size buffer.
///
/// Returns the number of bytes copied once `reader` reports end-of-data.
pub async fn copy_payload<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut copied: u64 = 0;

    loop {
        let n = reader.read(&mut buffer).await.map_err(CopyError::Read)?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buffer[..n])
            .await
            .map_err(CopyError::Write)?;
        copied += n as u64;
    }

    writer.flush().await.map_err(CopyError::Write)?;
    Ok(copied)
}

/// Format transfer speed from bytes and elapsed time
pub fn format_transfer_speed(bytes_transferred: u64, elapsed_secs: f64) -> String {
    if elapsed_secs <= 0.0 {
        return "-".to_string();
    }

    let speed_bps = bytes_transferred as f64 / elapsed_secs;
    if speed_bps > 1_000_000.0 {
        format!("{:.2} MB/s", speed_bps / 1_000_000.0)
    } else if speed_bps > 1_000.0 {
        format!("{:.1} KB/s", speed_bps / 1_000.0)
    } else {
        format!("{:.0} B/s", speed_bps)
    }
}
