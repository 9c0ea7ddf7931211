use crate::codec::{read_varint, CodecError};
use crate::packets::Packet;
use crate::registry::ProtocolRegistry;
use crate::version::ProtocolVersion;
use bytes::BytesMut;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("too many frames: {0}")]
    TooManyFrames(usize),
    #[error("bad packet id: {0}")]
    BadId(CodecError),
    #[error("{kind} too large: {len} > {max}")]
    TooLarge {
        kind: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{kind} too small: {len} < {min}")]
    TooSmall {
        kind: &'static str,
        len: usize,
        min: usize,
    },
    #[error("could not decode {kind}: {source}")]
    Codec {
        kind: &'static str,
        source: CodecError,
    },
    #[error("{kind} has {remaining} trailing bytes")]
    TrailingBytes { kind: &'static str, remaining: usize },
}

/// Turns uncompressed frames (`id` + body) into typed packets using the current table.
#[derive(Debug)]
pub struct PacketDecoder {
    registry: Arc<ProtocolRegistry>,
    frames: usize,
    max_frames: usize,
}

impl PacketDecoder {
    pub fn new(registry: Arc<ProtocolRegistry>, max_frames: usize) -> Self {
        Self {
            registry,
            frames: 0,
            max_frames,
        }
    }

    /// Non-empty frames seen so far, decoded or not.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Swap tables on a state change.
    pub fn update_registry(&mut self, registry: Arc<ProtocolRegistry>) {
        self.registry = registry;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.registry.version()
    }

    /// Decode one frame. Empty frames and ids without a decoder yield `Ok(None)`.
    pub fn decode(&mut self, mut frame: BytesMut) -> Result<Option<Packet>, DecodeError> {
        if frame.is_empty() {
            return Ok(None);
        }
        self.frames += 1;
        if self.frames > self.max_frames {
            return Err(DecodeError::TooManyFrames(self.max_frames));
        }

        let id = read_varint(&mut frame).map_err(DecodeError::BadId)?;
        let Some(factory) = self.registry.lookup(id) else {
            trace!("Skipping unhandled packet id=0x{:02X}", id);
            return Ok(None);
        };

        let version = self.registry.version();
        let kind = factory.kind().name();
        let len = frame.len();
        if let Some(max) = factory.max_len(version) {
            if len > max {
                return Err(DecodeError::TooLarge { kind, len, max });
            }
        }
        let min = factory.min_len(version);
        if len < min {
            return Err(DecodeError::TooSmall { kind, len, min });
        }

        let packet = factory
            .decode(&mut frame, version)
            .map_err(|source| DecodeError::Codec { kind, source })?;
        if !frame.is_empty() {
            return Err(DecodeError::TrailingBytes {
                kind,
                remaining: frame.len(),
            });
        }
        Ok(Some(packet))
    }
}
