use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};

/// The first packet of every connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub intent: i32,
}

impl PacketBody for Handshake {
    const KIND: PacketKind = PacketKind::Handshake;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        write_varint(buf, self.protocol_version);
        write_string(buf, &self.server_address);
        buf.put_u16(self.server_port);
        write_varint(buf, self.intent);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Self> {
        Ok(Self {
            protocol_version: read_varint(buf)?,
            server_address: read_string(buf, 255)?,
            server_port: read_u16(buf)?,
            intent: read_varint(buf)?,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        5
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(5 + 3 + 255 * 4 + 2 + 5)
    }
}
