use crate::codec::{CodecError, CodecResult};
use crate::version::ProtocolVersion;
use bytes::BytesMut;

mod chat;
mod configuration;
mod handshake;
mod join;
mod login;
mod map;
mod movement;
mod play;

pub use chat::*;
pub use configuration::*;
pub use handshake::*;
pub use join::*;
pub use login::*;
pub use map::*;
pub use movement::*;
pub use play::*;

/// A concrete packet body with a version-aware wire layout.
///
/// Outbound-only packets keep the default `decode`, which reports
/// [`CodecError::DecodeUnsupported`] instead of guessing at a layout.
pub trait PacketBody: Sized + Into<Packet> {
    const KIND: PacketKind;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()>;

    fn decode(_buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Self> {
        Err(CodecError::DecodeUnsupported(Self::KIND.name()))
    }

    /// Smallest body the decoder accepts, in bytes.
    fn min_len(_version: ProtocolVersion) -> usize {
        0
    }

    /// Largest body the decoder accepts, in bytes. `None` means unbounded.
    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        None
    }
}

macro_rules! packets {
    ($($kind:ident),* $(,)?) => {
        /// Fieldless tag naming each packet type. Registry tables are keyed by it.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PacketKind {
            $($kind),*
        }

        impl PacketKind {
            pub fn name(self) -> &'static str {
                match self {
                    $(PacketKind::$kind => stringify!($kind)),*
                }
            }
        }

        /// Every packet the fallback speaks, in either direction.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Packet {
            $($kind($kind)),*
        }

        impl Packet {
            pub fn kind(&self) -> PacketKind {
                match self {
                    $(Packet::$kind(_) => PacketKind::$kind),*
                }
            }

            pub fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
                match self {
                    $(Packet::$kind(p) => p.encode(buf, version)),*
                }
            }
        }

        $(
            impl From<$kind> for Packet {
                fn from(p: $kind) -> Self {
                    Packet::$kind(p)
                }
            }
        )*
    };
}

packets! {
    // Handshake
    Handshake,
    // Login
    LoginStart,
    LoginAcknowledged,
    LoginSuccess,
    SetCompression,
    // Shared between phases
    Disconnect,
    KeepAlive,
    ClientInformation,
    PluginMessage,
    // Configuration
    RegistryData,
    FinishConfiguration,
    // Play, clientbound
    JoinGame,
    PlayerPositionSync,
    PlayerAbilities,
    ChunkData,
    UpdateSectionBlocks,
    SetDefaultSpawnPosition,
    Transaction,
    MapData,
    SetContainerSlot,
    SetExperience,
    SystemChat,
    GameEvent,
    Transfer,
    UpdateTime,
    // Play, serverbound
    ConfirmTeleportation,
    MovePlayerPos,
    MovePlayerPosRot,
    MovePlayerRot,
    MovePlayerStatus,
    ChatMessage,
    ClientTickEnd,
}

#[cfg(test)]
pub(crate) fn roundtrip<T: PacketBody + std::fmt::Debug + PartialEq>(
    packet: &T,
    version: ProtocolVersion,
) -> T {
    let mut buf = BytesMut::new();
    packet.encode(&mut buf, version).unwrap();
    let len = buf.len();
    assert!(len >= T::min_len(version), "{:?} below min length on {}", packet, version);
    if let Some(max) = T::max_len(version) {
        assert!(len <= max, "{:?} above max length on {}", packet, version);
    }
    let decoded = T::decode(&mut buf, version).unwrap();
    assert!(buf.is_empty(), "leftover bytes for {:?} on {}", packet, version);
    decoded
}
