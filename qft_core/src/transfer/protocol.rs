//! Transfer header framing.
//!
//! A stream carries `[u32 big-endian name length][name bytes][payload...]`.
//! There is no payload length: the payload ends where the stream ends, so a
//! sender that disappears mid-copy without a transport error is
//! indistinguishable from one that finished.

use bytes::{BufMut, Bytes, BytesMut};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::constants::MAX_NAME_LENGTH;
use crate::error::{Result, TransferError};

/// Size of the length field in front of the name
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Encode the header for `name`
pub fn encode_header(name: &str) -> Result<Bytes> {
    let name = name.as_bytes();
    let len = u32::try_from(name.len()).map_err(|_| TransferError::Encoding {
        len: name.len(),
        max: u32::MAX as u64,
    })?;

    let mut buf = BytesMut::with_capacity(LENGTH_FIELD_SIZE + name.len());
    buf.put_u32(len);
    buf.put_slice(name);
    Ok(buf.freeze())
}

/// Read exactly one header from `stream` and return the name it carries.
///
/// Invalid UTF-8 in the name is replaced rather than rejected; the name is
/// only ever used to build a local file name.
pub async fn decode_header<R>(stream: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| read_error(e, "stream ended inside the length field"))?;
    let len = u32::from_be_bytes(len_buf);

    if len > MAX_NAME_LENGTH {
        return Err(TransferError::HeaderTooLarge {
            len,
            max: MAX_NAME_LENGTH,
        });
    }

    let mut name_buf = vec![0u8; len as usize];
    stream.read_exact(&mut name_buf).await.map_err(|e| {
        read_error(
            e,
            &format!("stream ended before all {} name bytes arrived", len),
        )
    })?;

    Ok(String::from_utf8_lossy(&name_buf).into_owned())
}

fn read_error(e: std::io::Error, truncated: &str) -> TransferError {
    if e.kind() == ErrorKind::UnexpectedEof {
        TransferError::TruncatedHeader(truncated.to_string())
    } else {
        TransferError::transport("failed to read header", Some(e))
    }
}
