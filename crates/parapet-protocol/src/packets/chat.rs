use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::component::write_component;
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use parapet_types::TextComponent;
use uuid::Uuid;

pub const MAX_CHAT_LENGTH: usize = 256;
const SIGNATURE_LENGTH: usize = 256;
const MAX_LAST_SEEN: usize = 5;

/// Server-originated chat line. `overlay` targets the action bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemChat {
    pub message: TextComponent,
    pub overlay: bool,
}

impl SystemChat {
    pub fn chat(message: TextComponent) -> Self {
        Self {
            message,
            overlay: false,
        }
    }

    pub fn action_bar(message: TextComponent) -> Self {
        Self {
            message,
            overlay: true,
        }
    }
}

impl PacketBody for SystemChat {
    const KIND: PacketKind = PacketKind::SystemChat;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_component(buf, &self.message, version);
        if version >= ProtocolVersion::V1_19_1 {
            write_bool(buf, self.overlay);
        } else if version == ProtocolVersion::V1_19 {
            // Chat type registry id: system or game_info
            write_varint(buf, if self.overlay { 2 } else { 1 });
        } else if version >= ProtocolVersion::V1_8 {
            buf.put_u8(if self.overlay { 2 } else { 1 });
            if version >= ProtocolVersion::V1_16 {
                write_uuid(buf, &Uuid::nil());
            }
        }
        Ok(())
    }
}

/// Player chat. Signing data is parsed for framing and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub message: String,
    pub timestamp: i64,
    pub salt: i64,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: 0,
            salt: 0,
        }
    }
}

impl PacketBody for ChatMessage {
    const KIND: PacketKind = PacketKind::ChatMessage;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.message);
        if version < ProtocolVersion::V1_19 {
            return Ok(());
        }
        buf.put_i64(self.timestamp);
        buf.put_i64(self.salt);
        if version >= ProtocolVersion::V1_19_3 {
            // Unsigned, no acknowledgements
            write_bool(buf, false);
            write_varint(buf, 0);
            buf.put_slice(&[0, 0, 0]);
            if version >= ProtocolVersion::V1_21_5 {
                buf.put_u8(0);
            }
            return Ok(());
        }
        write_byte_array(buf, &[]);
        // Signed preview
        write_bool(buf, false);
        if version >= ProtocolVersion::V1_19_1 {
            write_varint(buf, 0);
            write_bool(buf, false);
        }
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let message = read_string(buf, MAX_CHAT_LENGTH)?;
        if version < ProtocolVersion::V1_19 {
            return Ok(Self::new(message));
        }
        let timestamp = read_i64(buf)?;
        let salt = read_i64(buf)?;

        if version >= ProtocolVersion::V1_19_3 {
            if read_bool(buf)? {
                skip_bytes(buf, SIGNATURE_LENGTH)?;
            }
            // Message offset, acknowledged bitset
            read_varint(buf)?;
            skip_bytes(buf, 3)?;
            if version >= ProtocolVersion::V1_21_5 {
                // Checksum
                read_u8(buf)?;
            }
        } else {
            read_byte_array(buf, SIGNATURE_LENGTH)?;
            // Signed preview
            read_bool(buf)?;
            if version >= ProtocolVersion::V1_19_1 {
                let seen = read_length(buf)?;
                if seen > MAX_LAST_SEEN {
                    return Err(CodecError::ArrayTooLong(seen, MAX_LAST_SEEN));
                }
                for _ in 0..seen {
                    read_uuid(buf)?;
                    read_byte_array(buf, SIGNATURE_LENGTH)?;
                }
                if read_bool(buf)? {
                    read_uuid(buf)?;
                    read_byte_array(buf, SIGNATURE_LENGTH)?;
                }
            }
        }
        Ok(Self {
            message,
            timestamp,
            salt,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        1
    }
}
