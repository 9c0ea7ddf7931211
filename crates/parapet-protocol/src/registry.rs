//! Version-aware packet id tables.
//!
//! Every packet is registered once per state and direction with a list of
//! `(id, first version)` mappings. A mapping holds from its version up to the
//! next mapping's version; the last one holds through [`ProtocolVersion::LATEST`].

use crate::codec::CodecResult;
use crate::packets::*;
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;
use crate::version::ProtocolVersion::*;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use Direction::{Clientbound, Serverbound};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0} registered without mappings")]
    EmptyMappings(&'static str),
    #[error("{0} mapped on an unknown protocol version")]
    UnknownVersion(&'static str),
    #[error("packet id 0x{id:02X} on {version} claimed by both {existing} and {kind}")]
    IdCollision {
        id: i32,
        version: ProtocolVersion,
        existing: &'static str,
        kind: &'static str,
    },
    #[error("{kind} registered twice on {version}")]
    DuplicateKind {
        kind: &'static str,
        version: ProtocolVersion,
    },
    #[error("{kind} has no id on {version}")]
    NotRegistered {
        kind: &'static str,
        version: ProtocolVersion,
    },
    #[error("no packet tables for {0}")]
    UnsupportedVersion(ProtocolVersion),
}

/// One row of a packet's id history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketMapping {
    pub id: i32,
    pub version: ProtocolVersion,
    /// Only used to look up ids for encoding; incoming frames with this id are not decoded.
    pub encode_only: bool,
}

pub const fn map(id: i32, version: ProtocolVersion, encode_only: bool) -> PacketMapping {
    PacketMapping {
        id,
        version,
        encode_only,
    }
}

fn decode_as<T: PacketBody>(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Packet> {
    T::decode(buf, version).map(Into::into)
}

/// Constructs a packet of one kind from a frame body.
#[derive(Clone, Copy)]
pub struct PacketFactory {
    kind: PacketKind,
    decode: fn(&mut BytesMut, ProtocolVersion) -> CodecResult<Packet>,
    min_len: fn(ProtocolVersion) -> usize,
    max_len: fn(ProtocolVersion) -> Option<usize>,
}

impl PacketFactory {
    pub fn of<T: PacketBody>() -> Self {
        Self {
            kind: T::KIND,
            decode: decode_as::<T>,
            min_len: T::min_len,
            max_len: T::max_len,
        }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn decode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Packet> {
        (self.decode)(buf, version)
    }

    pub fn min_len(&self, version: ProtocolVersion) -> usize {
        (self.min_len)(version)
    }

    pub fn max_len(&self, version: ProtocolVersion) -> Option<usize> {
        (self.max_len)(version)
    }
}

impl std::fmt::Debug for PacketFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketFactory")
            .field("kind", &self.kind)
            .finish()
    }
}

/// The resolved table for one state, direction and version.
#[derive(Debug)]
pub struct ProtocolRegistry {
    version: ProtocolVersion,
    factories: HashMap<i32, PacketFactory>,
    ids: HashMap<PacketKind, i32>,
    kinds: HashMap<i32, PacketKind>,
}

impl ProtocolRegistry {
    fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            factories: HashMap::new(),
            ids: HashMap::new(),
            kinds: HashMap::new(),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Factory for an incoming id. `None` for ids that are not decoded.
    pub fn lookup(&self, id: i32) -> Option<PacketFactory> {
        self.factories.get(&id).copied()
    }

    /// Kind mapped to `id`, including encode-only entries.
    pub fn kind_of(&self, id: i32) -> Option<PacketKind> {
        self.kinds.get(&id).copied()
    }

    /// Wire id for an outgoing packet kind.
    pub fn packet_id(&self, kind: PacketKind) -> Result<i32, RegistryError> {
        self.ids
            .get(&kind)
            .copied()
            .ok_or(RegistryError::NotRegistered {
                kind: kind.name(),
                version: self.version,
            })
    }

    fn insert(&mut self, factory: PacketFactory, mapping: PacketMapping) -> Result<(), RegistryError> {
        let kind = factory.kind;
        if self.ids.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind {
                kind: kind.name(),
                version: self.version,
            });
        }
        if mapping.encode_only {
            // Outgoing kind wins the reverse lookup over an incoming packet sharing the id
            self.ids.insert(kind, mapping.id);
            self.kinds.insert(mapping.id, kind);
            return Ok(());
        }
        if let Some(existing) = self.factories.get(&mapping.id) {
            return Err(RegistryError::IdCollision {
                id: mapping.id,
                version: self.version,
                existing: existing.kind.name(),
                kind: kind.name(),
            });
        }
        self.factories.insert(mapping.id, factory);
        self.ids.insert(kind, mapping.id);
        self.kinds.entry(mapping.id).or_insert(kind);
        Ok(())
    }
}

/// Per-version tables for one direction, indexed by [`ProtocolVersion::index`].
type VersionTables = Vec<ProtocolRegistry>;

fn version_tables() -> VersionTables {
    ProtocolVersion::ALL
        .iter()
        .map(|&version| ProtocolRegistry::new(version))
        .collect()
}

/// Both directions of one connection state while the registry is being built.
pub struct StateTable {
    serverbound: VersionTables,
    clientbound: VersionTables,
}

impl StateTable {
    fn new() -> Self {
        Self {
            serverbound: version_tables(),
            clientbound: version_tables(),
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut VersionTables {
        match direction {
            Serverbound => &mut self.serverbound,
            Clientbound => &mut self.clientbound,
        }
    }
}

/// Register `T` with its id history.
pub fn register<T: PacketBody>(
    table: &mut StateTable,
    direction: Direction,
    mappings: &[PacketMapping],
) -> Result<(), RegistryError> {
    register_factory(table, direction, PacketFactory::of::<T>(), mappings)
}

pub fn register_factory(
    table: &mut StateTable,
    direction: Direction,
    factory: PacketFactory,
    mappings: &[PacketMapping],
) -> Result<(), RegistryError> {
    if mappings.is_empty() {
        return Err(RegistryError::EmptyMappings(factory.kind.name()));
    }
    if mappings.iter().any(|m| m.version.is_unknown()) {
        return Err(RegistryError::UnknownVersion(factory.kind.name()));
    }

    let mut sorted = mappings.to_vec();
    sorted.sort_by_key(|m| m.version);

    let tables = table.direction_mut(direction);
    for (i, mapping) in sorted.iter().enumerate() {
        let until = sorted.get(i + 1).map(|next| next.version);
        for registry in tables.iter_mut() {
            let version = registry.version;
            let covered = version >= mapping.version && until.map_or(true, |end| version < end);
            if covered {
                registry.insert(factory, *mapping)?;
            }
        }
    }
    Ok(())
}

/// Every packet table the fallback uses, built once and shared.
#[derive(Debug)]
pub struct PacketRegistry {
    tables: HashMap<(ConnectionState, Direction), Vec<Arc<ProtocolRegistry>>>,
}

impl PacketRegistry {
    pub fn build() -> Result<Self, RegistryError> {
        let mut tables = HashMap::new();
        for state in ConnectionState::ALL {
            let mut table = StateTable::new();
            match state {
                ConnectionState::Handshake => handshake_packets(&mut table)?,
                ConnectionState::Login => login_packets(&mut table)?,
                ConnectionState::Configuration => configuration_packets(&mut table)?,
                ConnectionState::Play => play_packets(&mut table)?,
            }
            let StateTable {
                serverbound,
                clientbound,
            } = table;
            tables.insert(
                (state, Serverbound),
                serverbound.into_iter().map(Arc::new).collect(),
            );
            tables.insert(
                (state, Clientbound),
                clientbound.into_iter().map(Arc::new).collect(),
            );
        }
        Ok(Self { tables })
    }

    pub fn table(
        &self,
        state: ConnectionState,
        direction: Direction,
        version: ProtocolVersion,
    ) -> Result<Arc<ProtocolRegistry>, RegistryError> {
        let index = version
            .index()
            .ok_or(RegistryError::UnsupportedVersion(version))?;
        self.tables
            .get(&(state, direction))
            .and_then(|versions| versions.get(index))
            .cloned()
            .ok_or(RegistryError::UnsupportedVersion(version))
    }
}

// === Tables ===

fn handshake_packets(table: &mut StateTable) -> Result<(), RegistryError> {
    register::<Handshake>(table, Serverbound, &[
        map(0x00, V1_7_2, false),
    ])?;
    Ok(())
}

fn login_packets(table: &mut StateTable) -> Result<(), RegistryError> {
    register::<Disconnect>(table, Clientbound, &[
        map(0x00, V1_7_2, true),
    ])?;
    register::<LoginSuccess>(table, Clientbound, &[
        map(0x02, V1_7_2, true),
    ])?;
    register::<SetCompression>(table, Clientbound, &[
        map(0x03, V1_8, true),
    ])?;
    register::<LoginStart>(table, Serverbound, &[
        map(0x00, V1_7_2, false),
    ])?;
    register::<LoginAcknowledged>(table, Serverbound, &[
        map(0x03, V1_20_2, false),
    ])?;
    Ok(())
}

fn configuration_packets(table: &mut StateTable) -> Result<(), RegistryError> {
    register::<Disconnect>(table, Clientbound, &[
        map(0x01, V1_20_2, true),
        map(0x02, V1_20_5, true),
    ])?;
    register::<FinishConfiguration>(table, Clientbound, &[
        map(0x02, V1_20_2, true),
        map(0x03, V1_20_5, true),
    ])?;
    register::<KeepAlive>(table, Clientbound, &[
        map(0x03, V1_20_2, true),
        map(0x04, V1_20_5, true),
    ])?;
    register::<RegistryData>(table, Clientbound, &[
        map(0x05, V1_20_2, true),
        map(0x07, V1_20_5, true),
    ])?;
    register::<ClientInformation>(table, Serverbound, &[
        map(0x00, V1_20_2, false),
    ])?;
    register::<PluginMessage>(table, Serverbound, &[
        map(0x01, V1_20_2, false),
        map(0x02, V1_20_5, false),
    ])?;
    register::<FinishConfiguration>(table, Serverbound, &[
        map(0x02, V1_20_2, false),
        map(0x03, V1_20_5, false),
    ])?;
    register::<KeepAlive>(table, Serverbound, &[
        map(0x03, V1_20_2, false),
        map(0x04, V1_20_5, false),
    ])?;
    Ok(())
}

fn play_packets(table: &mut StateTable) -> Result<(), RegistryError> {
    register::<JoinGame>(table, Clientbound, &[
        map(0x01, V1_7_2, true),
        map(0x23, V1_9, true),
        map(0x25, V1_13, true),
        map(0x25, V1_14, true),
        map(0x26, V1_15, true),
        map(0x25, V1_16, true),
        map(0x24, V1_16_2, true),
        map(0x26, V1_17, true),
        map(0x23, V1_19, true),
        map(0x25, V1_19_1, true),
        map(0x24, V1_19_3, true),
        map(0x28, V1_19_4, true),
        map(0x29, V1_20_2, true),
        map(0x2B, V1_20_5, true),
        map(0x2C, V1_21_2, true),
        map(0x2B, V1_21_5, true),
        map(0x30, V1_21_9, true),
    ])?;
    register::<KeepAlive>(table, Clientbound, &[
        map(0x00, V1_7_2, true),
        map(0x1F, V1_9, true),
        map(0x21, V1_13, true),
        map(0x20, V1_14, true),
        map(0x21, V1_15, true),
        map(0x20, V1_16, true),
        map(0x1F, V1_16_2, true),
        map(0x21, V1_17, true),
        map(0x1E, V1_19, true),
        map(0x20, V1_19_1, true),
        map(0x1F, V1_19_3, true),
        map(0x23, V1_19_4, true),
        map(0x24, V1_20_2, true),
        map(0x26, V1_20_5, true),
        map(0x27, V1_21_2, true),
        map(0x26, V1_21_5, true),
        map(0x2B, V1_21_9, true),
    ])?;
    register::<Disconnect>(table, Clientbound, &[
        map(0x40, V1_7_2, true),
        map(0x1A, V1_9, true),
        map(0x1B, V1_13, true),
        map(0x1A, V1_14, true),
        map(0x1B, V1_15, true),
        map(0x1A, V1_16, true),
        map(0x19, V1_16_2, true),
        map(0x1A, V1_17, true),
        map(0x17, V1_19, true),
        map(0x19, V1_19_1, true),
        map(0x17, V1_19_3, true),
        map(0x1A, V1_19_4, true),
        map(0x1B, V1_20_2, true),
        map(0x1D, V1_20_5, true),
        map(0x1C, V1_21_5, true),
        map(0x20, V1_21_9, true),
    ])?;
    register::<PlayerPositionSync>(table, Clientbound, &[
        map(0x08, V1_7_2, true),
        map(0x2E, V1_9, true),
        map(0x2F, V1_12_1, true),
        map(0x32, V1_13, true),
        map(0x35, V1_14, true),
        map(0x36, V1_15, true),
        map(0x35, V1_16, true),
        map(0x34, V1_16_2, true),
        map(0x38, V1_17, true),
        map(0x36, V1_19, true),
        map(0x39, V1_19_1, true),
        map(0x38, V1_19_3, true),
        map(0x3C, V1_19_4, true),
        map(0x3E, V1_20_2, true),
        map(0x40, V1_20_5, true),
        map(0x42, V1_21_2, true),
        map(0x41, V1_21_5, true),
        map(0x46, V1_21_9, true),
    ])?;
    register::<PlayerAbilities>(table, Clientbound, &[
        map(0x39, V1_7_2, true),
        map(0x2B, V1_9, true),
        map(0x2C, V1_12_1, true),
        map(0x2E, V1_13, true),
        map(0x31, V1_14, true),
        map(0x32, V1_15, true),
        map(0x31, V1_16, true),
        map(0x30, V1_16_2, true),
        map(0x32, V1_17, true),
        map(0x2F, V1_19, true),
        map(0x31, V1_19_1, true),
        map(0x30, V1_19_3, true),
        map(0x34, V1_19_4, true),
        map(0x36, V1_20_2, true),
        map(0x38, V1_20_5, true),
        map(0x3A, V1_21_2, true),
        map(0x39, V1_21_5, true),
        map(0x3E, V1_21_9, true),
    ])?;
    register::<ChunkData>(table, Clientbound, &[
        map(0x21, V1_7_2, true),
        map(0x20, V1_9, true),
        map(0x22, V1_13, true),
        map(0x21, V1_14, true),
        map(0x22, V1_15, true),
        map(0x21, V1_16, true),
        map(0x20, V1_16_2, true),
        map(0x22, V1_17, true),
        map(0x1F, V1_19, true),
        map(0x21, V1_19_1, true),
        map(0x20, V1_19_3, true),
        map(0x24, V1_19_4, true),
        map(0x25, V1_20_2, true),
        map(0x27, V1_20_5, true),
        map(0x28, V1_21_2, true),
        map(0x27, V1_21_5, true),
        map(0x2C, V1_21_9, true),
    ])?;
    register::<UpdateSectionBlocks>(table, Clientbound, &[
        map(0x22, V1_7_2, true),
        map(0x10, V1_9, true),
        map(0x0F, V1_13, true),
        map(0x10, V1_15, true),
        map(0x0F, V1_16, true),
        map(0x3B, V1_16_2, true),
        map(0x3F, V1_17, true),
        map(0x3D, V1_19, true),
        map(0x40, V1_19_1, true),
        map(0x3F, V1_19_3, true),
        map(0x43, V1_19_4, true),
        map(0x45, V1_20_2, true),
        map(0x47, V1_20_3, true),
        map(0x49, V1_20_5, true),
        map(0x4E, V1_21_2, true),
        map(0x4D, V1_21_5, true),
        map(0x52, V1_21_9, true),
    ])?;
    register::<Transaction>(table, Clientbound, &[
        map(0x32, V1_7_2, true),
        map(0x11, V1_9, true),
        map(0x12, V1_13, true),
        map(0x13, V1_15, true),
        map(0x12, V1_16, true),
        map(0x11, V1_16_2, true),
        map(0x30, V1_17, true),
        map(0x2D, V1_19, true),
        map(0x2F, V1_19_1, true),
        map(0x2E, V1_19_3, true),
        map(0x32, V1_19_4, true),
        map(0x33, V1_20_2, true),
        map(0x35, V1_20_5, true),
        map(0x37, V1_21_2, true),
        map(0x36, V1_21_5, true),
        map(0x3B, V1_21_9, true),
    ])?;
    register::<SetDefaultSpawnPosition>(table, Clientbound, &[
        map(0x05, V1_7_2, true),
        map(0x43, V1_9, true),
        map(0x45, V1_12, true),
        map(0x46, V1_12_1, true),
        map(0x49, V1_13, true),
        map(0x4D, V1_14, true),
        map(0x4E, V1_15, true),
        map(0x42, V1_16, true),
        map(0x4B, V1_17, true),
        map(0x4A, V1_19, true),
        map(0x4D, V1_19_1, true),
        map(0x4C, V1_19_3, true),
        map(0x50, V1_19_4, true),
        map(0x52, V1_20_2, true),
        map(0x54, V1_20_3, true),
        map(0x56, V1_20_5, true),
        map(0x5B, V1_21_2, true),
        map(0x5A, V1_21_5, true),
        map(0x5F, V1_21_9, true),
    ])?;
    register::<MapData>(table, Clientbound, &[
        map(0x34, V1_7_2, true),
        map(0x24, V1_9, true),
        map(0x26, V1_13, true),
        map(0x27, V1_15, true),
        map(0x26, V1_16, true),
        map(0x25, V1_16_2, true),
        map(0x27, V1_17, true),
        map(0x24, V1_19, true),
        map(0x26, V1_19_1, true),
        map(0x25, V1_19_3, true),
        map(0x29, V1_19_4, true),
        map(0x2A, V1_20_2, true),
        map(0x2C, V1_20_5, true),
        map(0x2D, V1_21_2, true),
        map(0x2C, V1_21_5, true),
        map(0x31, V1_21_9, true),
    ])?;
    register::<SetContainerSlot>(table, Clientbound, &[
        map(0x2F, V1_7_2, true),
        map(0x16, V1_9, true),
        map(0x17, V1_13, true),
        map(0x16, V1_14, true),
        map(0x17, V1_15, true),
        map(0x16, V1_16, true),
        map(0x15, V1_16_2, true),
        map(0x16, V1_17, true),
        map(0x13, V1_19, true),
        map(0x12, V1_19_3, true),
        map(0x14, V1_19_4, true),
        map(0x15, V1_20_2, true),
        map(0x14, V1_21_5, true),
    ])?;
    register::<SetExperience>(table, Clientbound, &[
        map(0x1F, V1_7_2, true),
        map(0x3D, V1_9, true),
        map(0x3F, V1_12, true),
        map(0x40, V1_12_1, true),
        map(0x43, V1_13, true),
        map(0x47, V1_14, true),
        map(0x48, V1_15, true),
        map(0x51, V1_17, true),
        map(0x54, V1_19_1, true),
        map(0x52, V1_19_3, true),
        map(0x56, V1_19_4, true),
        map(0x58, V1_20_2, true),
        map(0x5A, V1_20_3, true),
        map(0x5C, V1_20_5, true),
        map(0x61, V1_21_2, true),
        map(0x60, V1_21_5, true),
        map(0x65, V1_21_9, true),
    ])?;
    register::<SystemChat>(table, Clientbound, &[
        map(0x02, V1_7_2, true),
        map(0x0F, V1_9, true),
        map(0x0E, V1_13, true),
        map(0x0F, V1_15, true),
        map(0x0E, V1_16, true),
        map(0x0F, V1_17, true),
        map(0x5F, V1_19, true),
        map(0x62, V1_19_1, true),
        map(0x60, V1_19_3, true),
        map(0x64, V1_19_4, true),
        map(0x67, V1_20_2, true),
        map(0x69, V1_20_3, true),
        map(0x6C, V1_20_5, true),
        map(0x73, V1_21_2, true),
        map(0x72, V1_21_5, true),
        map(0x77, V1_21_9, true),
    ])?;
    register::<GameEvent>(table, Clientbound, &[
        map(0x20, V1_20_3, true),
        map(0x22, V1_20_5, true),
        map(0x23, V1_21_2, true),
        map(0x22, V1_21_5, true),
        map(0x26, V1_21_9, true),
    ])?;
    register::<Transfer>(table, Clientbound, &[
        map(0x73, V1_20_5, true),
        map(0x7A, V1_21_2, true),
        map(0x7F, V1_21_9, true),
    ])?;
    register::<UpdateTime>(table, Clientbound, &[
        map(0x03, V1_7_2, true),
        map(0x44, V1_9, true),
        map(0x46, V1_12, true),
        map(0x47, V1_12_1, true),
        map(0x4A, V1_13, true),
        map(0x4E, V1_14, true),
        map(0x4F, V1_15, true),
        map(0x4E, V1_16, true),
        map(0x58, V1_17, true),
        map(0x59, V1_18, true),
        map(0x5C, V1_19_1, true),
        map(0x5A, V1_19_3, true),
        map(0x5E, V1_19_4, true),
        map(0x60, V1_20_2, true),
        map(0x62, V1_20_3, true),
        map(0x64, V1_20_5, true),
        map(0x6B, V1_21_2, true),
        map(0x6A, V1_21_5, true),
        map(0x6F, V1_21_9, true),
    ])?;
    register::<ClientTickEnd>(table, Serverbound, &[
        map(0x0B, V1_21_2, false),
        map(0x0C, V1_21_6, false),
    ])?;
    register::<ChatMessage>(table, Serverbound, &[
        map(0x01, V1_7_2, false),
        map(0x02, V1_9, false),
        map(0x03, V1_12, false),
        map(0x02, V1_12_1, false),
        map(0x03, V1_14, false),
        map(0x04, V1_19, false),
        map(0x05, V1_19_1, false),
        map(0x05, V1_19_3, false),
        map(0x06, V1_20_5, false),
        map(0x07, V1_21_2, false),
        map(0x08, V1_21_6, false),
    ])?;
    register::<KeepAlive>(table, Serverbound, &[
        map(0x00, V1_7_2, false),
        map(0x0B, V1_9, false),
        map(0x0C, V1_12, false),
        map(0x0B, V1_12_1, false),
        map(0x0E, V1_13, false),
        map(0x0F, V1_14, false),
        map(0x10, V1_16, false),
        map(0x0F, V1_17, false),
        map(0x11, V1_19, false),
        map(0x12, V1_19_1, false),
        map(0x11, V1_19_3, false),
        map(0x12, V1_19_4, false),
        map(0x14, V1_20_2, false),
        map(0x15, V1_20_3, false),
        map(0x18, V1_20_5, false),
        map(0x1A, V1_21_2, false),
        map(0x1B, V1_21_6, false),
    ])?;
    register::<ClientInformation>(table, Serverbound, &[
        map(0x15, V1_7_2, false),
        map(0x04, V1_9, false),
        map(0x05, V1_12, false),
        map(0x04, V1_12_1, false),
        map(0x05, V1_14, false),
        map(0x07, V1_19, false),
        map(0x08, V1_19_1, false),
        map(0x07, V1_19_3, false),
        map(0x08, V1_19_4, false),
        map(0x09, V1_20_2, false),
        map(0x0A, V1_20_5, false),
        map(0x0C, V1_21_2, false),
        map(0x0D, V1_21_6, false),
    ])?;
    register::<PluginMessage>(table, Serverbound, &[
        map(0x17, V1_7_2, false),
        map(0x09, V1_9, false),
        map(0x0A, V1_12, false),
        map(0x09, V1_12_1, false),
        map(0x0A, V1_13, false),
        map(0x0B, V1_14, false),
        map(0x0A, V1_17, false),
        map(0x0C, V1_19, false),
        map(0x0D, V1_19_1, false),
        map(0x0C, V1_19_3, false),
        map(0x0D, V1_19_4, false),
        map(0x0F, V1_20_2, false),
        map(0x12, V1_21, false),
        map(0x14, V1_21_2, false),
        map(0x15, V1_21_6, false),
    ])?;
    register::<MovePlayerStatus>(table, Serverbound, &[
        map(0x03, V1_7_2, false),
        map(0x0F, V1_9, false),
        map(0x0D, V1_12, false),
        map(0x0C, V1_12_1, false),
        map(0x0F, V1_13, false),
        map(0x14, V1_14, false),
        map(0x15, V1_16, false),
        map(0x14, V1_17, false),
        map(0x16, V1_19, false),
        map(0x17, V1_19_1, false),
        map(0x16, V1_19_3, false),
        map(0x17, V1_19_4, false),
        map(0x19, V1_20_2, false),
        map(0x1A, V1_20_3, false),
        map(0x1D, V1_20_5, false),
        map(0x1F, V1_21_2, false),
        map(0x20, V1_21_6, false),
    ])?;
    register::<MovePlayerPos>(table, Serverbound, &[
        map(0x04, V1_7_2, false),
        map(0x0C, V1_9, false),
        map(0x0E, V1_12, false),
        map(0x0D, V1_12_1, false),
        map(0x10, V1_13, false),
        map(0x11, V1_14, false),
        map(0x12, V1_16, false),
        map(0x11, V1_17, false),
        map(0x13, V1_19, false),
        map(0x14, V1_19_1, false),
        map(0x13, V1_19_3, false),
        map(0x14, V1_19_4, false),
        map(0x16, V1_20_2, false),
        map(0x17, V1_20_3, false),
        map(0x1A, V1_20_5, false),
        map(0x1C, V1_21_2, false),
        map(0x1D, V1_21_6, false),
    ])?;
    register::<MovePlayerRot>(table, Serverbound, &[
        map(0x05, V1_7_2, false),
        map(0x0E, V1_9, false),
        map(0x10, V1_12, false),
        map(0x0F, V1_12_1, false),
        map(0x12, V1_13, false),
        map(0x13, V1_14, false),
        map(0x14, V1_16, false),
        map(0x13, V1_17, false),
        map(0x15, V1_19, false),
        map(0x16, V1_19_1, false),
        map(0x15, V1_19_3, false),
        map(0x16, V1_19_4, false),
        map(0x18, V1_20_2, false),
        map(0x19, V1_20_3, false),
        map(0x1C, V1_20_5, false),
        map(0x1E, V1_21_2, false),
        map(0x1F, V1_21_6, false),
    ])?;
    register::<MovePlayerPosRot>(table, Serverbound, &[
        map(0x06, V1_7_2, false),
        map(0x0D, V1_9, false),
        map(0x0F, V1_12, false),
        map(0x0E, V1_12_1, false),
        map(0x11, V1_13, false),
        map(0x12, V1_14, false),
        map(0x13, V1_16, false),
        map(0x12, V1_17, false),
        map(0x14, V1_19, false),
        map(0x15, V1_19_1, false),
        map(0x14, V1_19_3, false),
        map(0x15, V1_19_4, false),
        map(0x17, V1_20_2, false),
        map(0x18, V1_20_3, false),
        map(0x1B, V1_20_5, false),
        map(0x1D, V1_21_2, false),
        map(0x1E, V1_21_6, false),
    ])?;
    register::<ConfirmTeleportation>(table, Serverbound, &[
        map(0x00, V1_9, false),
    ])?;
    register::<Transaction>(table, Serverbound, &[
        map(0x0F, V1_7_2, false),
        map(0x05, V1_9, false),
        map(0x06, V1_12, false),
        map(0x05, V1_12_1, false),
        map(0x06, V1_13, false),
        map(0x07, V1_14, false),
        map(0x1D, V1_17, false),
        map(0x1F, V1_19, false),
        map(0x20, V1_19_1, false),
        map(0x1F, V1_19_3, false),
        map(0x20, V1_19_4, false),
        map(0x23, V1_20_2, false),
        map(0x24, V1_20_3, false),
        map(0x27, V1_20_5, false),
        map(0x29, V1_21_2, false),
        map(0x2B, V1_21_4, false),
        map(0x2C, V1_21_6, false),
    ])?;
    Ok(())
}
