pub mod codec;
pub mod component;
pub mod decoder;
pub mod dimension;
pub mod encoder;
pub mod frame;
pub mod packets;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod version;

pub use codec::*;
pub use decoder::{DecodeError, PacketDecoder};
pub use encoder::{EncodeError, Outgoing, PacketEncoder};
pub use frame::{FrameReader, FrameWriter, MalformedFrame, MAX_FRAME_LEN};
pub use packets::*;
pub use registry::{PacketRegistry, ProtocolRegistry, RegistryError};
pub use snapshot::{PacketSnapshot, SnapshotCache};
pub use state::*;
pub use version::ProtocolVersion;
