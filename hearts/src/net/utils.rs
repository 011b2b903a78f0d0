//! Length-prefixed framing.
//!
//! A frame is a 4-byte big-endian length followed by that many payload
//! bytes. Writers emit the prefix and payload in a single buffer; readers
//! pull exactly one full frame before anything gets decoded.

use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::errors::{Result, SerializationError};

/// Maximum allowed payload size (1MB) to prevent DoS attacks via unbounded allocation
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Serialize a value into a bare payload.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = encode_to_vec(value, config::standard())?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(SerializationError::MessageTooLarge {
            actual: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(payload)
}

/// Serialize a value into a complete frame.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = encode(value)?;
    // Bounded by MAX_MESSAGE_SIZE, so this always fits.
    let size = payload.len() as u32;
    let mut buf = Vec::with_capacity(PREFIX_LEN + payload.len());
    buf.extend(size.to_be_bytes());
    buf.extend(payload);
    Ok(buf)
}

/// Deserialize a bare payload. Trailing bytes are rejected since a frame
/// holds exactly one value.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    let (value, read) = decode_from_slice(payload, config::standard())?;
    if read != payload.len() {
        return Err(SerializationError::TrailingBytes(payload.len() - read));
    }
    Ok(value)
}

fn check_size(len: usize) -> io::Result<()> {
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message size {len} exceeds maximum allowed size of {MAX_MESSAGE_SIZE} bytes"),
        ));
    }
    Ok(())
}

fn to_io_error(error: SerializationError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

pub fn read_prefixed<T: DeserializeOwned, R: Read>(reader: &mut R) -> io::Result<T> {
    let mut len_bytes = [0; PREFIX_LEN];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    check_size(len)?;

    // A would-block in the middle of a frame means the sender doesn't
    // follow the prefix protocol. Report it as invalid data so callers
    // drop the sender.
    let mut buf = vec![0; len];
    if let Err(error) = reader.read_exact(&mut buf) {
        let kind = match error.kind() {
            io::ErrorKind::WouldBlock => io::ErrorKind::InvalidData,
            error => error,
        };
        return Err(kind.into());
    }

    decode(&buf).map_err(to_io_error)
}

pub fn write_prefixed<T: Serialize, W: Write>(writer: &mut W, value: &T) -> io::Result<()> {
    let frame = encode_frame(value).map_err(to_io_error)?;
    writer.write_all(&frame)?;
    writer.flush()
}

/// Read one whole frame and return its payload undecoded. Any error here
/// means the stream can no longer be trusted to be on a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = reader.read_u32().await? as usize;
    check_size(len)?;
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write an already encoded frame and flush it.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}
