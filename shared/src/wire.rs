//! Length-prefixed framing for [`NetMessage`].
//!
//! Each frame is a big-endian `u32` payload length followed by the bincode-encoded message.
//! Payloads larger than [`MAX_FRAME_LEN`] are rejected in both directions.

use std::io::{self, Read, Write};

use crate::constants::MAX_FRAME_LEN;
use crate::net::NetMessage;

#[derive(thiserror::Error, Debug)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
}

/// Encode `msg` into a complete frame (length prefix included).
pub fn encode_frame(msg: &NetMessage) -> Result<Vec<u8>, WireError> {
    let payload = bincode::serialize(msg)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, msg: &NetMessage) -> Result<(), WireError> {
    let frame = encode_frame(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary. End of stream inside
/// a frame is an error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<NetMessage>, WireError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let frame_len = u32::from_be_bytes(len_buf) as usize;
    if frame_len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(frame_len));
    }

    let mut payload = vec![0u8; frame_len];
    reader.read_exact(&mut payload)?;
    Ok(Some(bincode::deserialize(&payload)?))
}
