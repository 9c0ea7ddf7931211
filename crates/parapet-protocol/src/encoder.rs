use crate::codec::{write_varint, CodecError};
use crate::packets::{Packet, PacketKind};
use crate::registry::{ProtocolRegistry, RegistryError};
use crate::snapshot::PacketSnapshot;
use crate::version::ProtocolVersion;
use bytes::BytesMut;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("could not encode {kind}: {source}")]
    Codec {
        kind: &'static str,
        source: CodecError,
    },
}

/// Something the server can send: a live packet or a pre-encoded snapshot.
#[derive(Debug, Clone)]
pub enum Outgoing {
    Packet(Packet),
    Snapshot(Arc<PacketSnapshot>),
}

impl Outgoing {
    pub fn kind(&self) -> PacketKind {
        match self {
            Outgoing::Packet(packet) => packet.kind(),
            Outgoing::Snapshot(snapshot) => snapshot.kind(),
        }
    }
}

impl Outgoing {
    pub fn packet(packet: impl Into<Packet>) -> Self {
        Outgoing::Packet(packet.into())
    }
}

impl From<Packet> for Outgoing {
    fn from(packet: Packet) -> Self {
        Outgoing::Packet(packet)
    }
}

impl From<Arc<PacketSnapshot>> for Outgoing {
    fn from(snapshot: Arc<PacketSnapshot>) -> Self {
        Outgoing::Snapshot(snapshot)
    }
}

/// Writes `id` + body for outgoing packets using the current clientbound table.
#[derive(Debug)]
pub struct PacketEncoder {
    registry: Arc<ProtocolRegistry>,
}

impl PacketEncoder {
    pub fn new(registry: Arc<ProtocolRegistry>) -> Self {
        Self { registry }
    }

    pub fn update_registry(&mut self, registry: Arc<ProtocolRegistry>) {
        self.registry = registry;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.registry.version()
    }

    pub fn encode(&self, outgoing: &Outgoing, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let kind = outgoing.kind();
        let id = self.registry.packet_id(kind)?;
        let version = self.registry.version();
        write_varint(buf, id);
        let result = match outgoing {
            Outgoing::Packet(packet) => packet.encode(buf, version),
            Outgoing::Snapshot(snapshot) => snapshot.encode(buf, version),
        };
        result.map_err(|source| EncodeError::Codec {
            kind: kind.name(),
            source,
        })
    }
}
