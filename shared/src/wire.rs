//! Versioned length framing for packets over a byte stream.
//!
//! Format (little-endian):
//! - u8 `FRAME_VERSION`
//! - u32 payload length
//! - bincode-encoded `Packet`

use crate::protocol::Packet;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const FRAME_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 5;
pub const MAX_FRAME_LEN: usize = 1_048_576;

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

pub fn encode_frame(packet: &Packet) -> io::Result<Vec<u8>> {
    let payload = bincode::serialize(packet).map_err(|e| invalid(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(invalid(format!(
            "frame too large: {} > {}",
            payload.len(),
            MAX_FRAME_LEN
        )));
    }

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(FRAME_VERSION);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Validates a header and returns the payload length it announces.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> io::Result<usize> {
    if header[0] != FRAME_VERSION {
        return Err(invalid(format!("unsupported frame version: {}", header[0])));
    }
    let len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(invalid(format!("bad frame length: {}", len)));
    }
    Ok(len)
}

pub fn decode_payload(payload: &[u8]) -> io::Result<Packet> {
    bincode::deserialize(payload).map_err(|e| invalid(e.to_string()))
}

/// Reads the next packet. `Ok(None)` means the peer closed the stream.
pub async fn read_packet<R>(reader: &mut R) -> io::Result<Option<Packet>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = parse_header(&header)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload).map(Some)
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await
}
