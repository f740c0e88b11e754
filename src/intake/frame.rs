use crate::common::ClusterBatch;
use crate::error::FrameError;
use crate::pipeline::IdentifiedBatch;

pub const FRAME_LENGTH_BYTES: usize = 4;
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

pub const TAG_PING: u8 = 0;
pub const TAG_CLUSTERS: u8 = 1;
pub const TAG_SHUTDOWN: u8 = 2;
pub const TAG_IDENTIFIED: u8 = 3;

/// [length][tag][payload], where length is a little-endian u32 counting the
/// tag and the payload.
#[derive(Debug, Clone)]
pub enum Frame {
    Ping,
    Clusters(ClusterBatch),
    Shutdown,
    Identified(IdentifiedBatch),
}

impl Frame {
    pub fn tag(&self) -> u8 {
        match self {
            Frame::Ping => TAG_PING,
            Frame::Clusters(_) => TAG_CLUSTERS,
            Frame::Shutdown => TAG_SHUTDOWN,
            Frame::Identified(_) => TAG_IDENTIFIED,
        }
    }
}

/// Builds a complete frame around an already encoded payload.
pub fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let length = payload.len() + 1;
    if length > MAX_FRAME_LENGTH {
        return Err(FrameError::InvalidFrameLength(length));
    }
    let mut bytes = Vec::with_capacity(FRAME_LENGTH_BYTES + length);
    bytes.extend_from_slice(&(length as u32).to_le_bytes());
    bytes.push(tag);
    bytes.extend_from_slice(payload);
    Ok(bytes)
}
