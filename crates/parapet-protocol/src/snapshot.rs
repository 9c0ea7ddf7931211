//! Packets encoded once per protocol version and replayed as raw bytes.

use crate::codec::{CodecError, CodecResult};
use crate::packets::{Packet, PacketKind};
use crate::version::ProtocolVersion;
use bytes::{Bytes, BytesMut};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::warn;

/// A packet pre-encoded for every version from `first` to [`ProtocolVersion::LATEST`].
///
/// Versions that produce byte-identical bodies share a single buffer. Snapshots built
/// through the same [`SnapshotCache`] also share buffers with each other.
#[derive(Debug, Clone)]
pub struct PacketSnapshot {
    kind: PacketKind,
    encoded: Vec<Option<Bytes>>,
}

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Interns encoded bodies by content hash so identical renderings are stored once.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    seen: HashMap<u64, Vec<Bytes>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&mut self, packet: impl Into<Packet>) -> PacketSnapshot {
        self.between(packet, ProtocolVersion::OLDEST, ProtocolVersion::LATEST)
    }

    pub fn since(&mut self, packet: impl Into<Packet>, first: ProtocolVersion) -> PacketSnapshot {
        self.between(packet, first, ProtocolVersion::LATEST)
    }

    pub fn between(
        &mut self,
        packet: impl Into<Packet>,
        first: ProtocolVersion,
        last: ProtocolVersion,
    ) -> PacketSnapshot {
        let packet = packet.into();
        let mut encoded = vec![None; ProtocolVersion::ALL.len()];

        for (index, &version) in ProtocolVersion::ALL.iter().enumerate() {
            if !version.in_between(first, last) {
                continue;
            }
            let mut buf = BytesMut::new();
            if let Err(e) = packet.encode(&mut buf, version) {
                warn!(
                    "Could not snapshot {} for {}: {}",
                    packet.kind().name(),
                    version,
                    e
                );
                break;
            }
            encoded[index] = Some(self.intern(buf));
        }

        PacketSnapshot {
            kind: packet.kind(),
            encoded,
        }
    }

    fn intern(&mut self, buf: BytesMut) -> Bytes {
        let candidates = self.seen.entry(content_hash(&buf)).or_default();
        match candidates.iter().find(|b| b[..] == buf[..]) {
            Some(shared) => shared.clone(),
            None => {
                let bytes = buf.freeze();
                candidates.push(bytes.clone());
                bytes
            }
        }
    }

    /// Number of distinct buffers held.
    pub fn len(&self) -> usize {
        self.seen.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl PacketSnapshot {
    pub fn new(packet: impl Into<Packet>) -> Self {
        SnapshotCache::new().snapshot(packet)
    }

    /// Snapshot only versions at or after `first`.
    pub fn since(packet: impl Into<Packet>, first: ProtocolVersion) -> Self {
        SnapshotCache::new().since(packet, first)
    }

    /// Snapshot versions in `first..=last`.
    pub fn between(packet: impl Into<Packet>, first: ProtocolVersion, last: ProtocolVersion) -> Self {
        SnapshotCache::new().between(packet, first, last)
    }

    /// Kind of the wrapped packet. The encoder resolves ids through it.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn bytes(&self, version: ProtocolVersion) -> Option<&Bytes> {
        version
            .index()
            .and_then(|index| self.encoded.get(index))
            .and_then(Option::as_ref)
    }

    pub fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        let bytes = self
            .bytes(version)
            .ok_or(CodecError::InvalidValue("snapshot version"))?;
        buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Snapshots are outbound only.
    pub fn decode(&self, _buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Packet> {
        Err(CodecError::DecodeUnsupported(self.kind.name()))
    }

    /// Number of distinct encodings held.
    pub fn distinct_encodings(&self) -> usize {
        let mut unique: Vec<&Bytes> = Vec::new();
        for bytes in self.encoded.iter().flatten() {
            if !unique.iter().any(|u| u.as_ptr() == bytes.as_ptr()) {
                unique.push(bytes);
            }
        }
        unique.len()
    }
}
