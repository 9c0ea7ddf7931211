use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::version::ProtocolVersion;
use bytes::{Buf, BufMut, BytesMut};
use parapet_nbt::{NbtRoot, NbtValue};

/// One entry of a 1.20.5+ registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub id: String,
    pub data: Option<NbtValue>,
}

/// Registry synchronisation during the configuration phase.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryData {
    /// 1.20.2-1.20.4: one compound holding every registry.
    Codec(NbtValue),
    /// 1.20.5+: one packet per registry.
    Registry {
        registry_id: String,
        entries: Vec<RegistryEntry>,
    },
}

impl PacketBody for RegistryData {
    const KIND: PacketKind = PacketKind::RegistryData;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        match self {
            RegistryData::Codec(codec) if version < ProtocolVersion::V1_20_5 => {
                codec.write_root(NbtRoot::Nameless, buf);
            }
            RegistryData::Registry {
                registry_id,
                entries,
            } if version >= ProtocolVersion::V1_20_5 => {
                write_string(buf, registry_id);
                write_varint(buf, entries.len() as i32);
                for entry in entries {
                    write_string(buf, &entry.id);
                    write_bool(buf, entry.data.is_some());
                    if let Some(data) = &entry.data {
                        data.write_root(NbtRoot::Nameless, buf);
                    }
                }
            }
            _ => return Err(CodecError::InvalidValue("registry data layout")),
        }
        Ok(())
    }
}

/// Ends the configuration phase. Sent by the server, echoed by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishConfiguration;

impl PacketBody for FinishConfiguration {
    const KIND: PacketKind = PacketKind::FinishConfiguration;

    fn encode(&self, _buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        Ok(())
    }

    fn decode(_buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Self> {
        Ok(Self)
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeepAlive {
    pub id: i64,
}

impl PacketBody for KeepAlive {
    const KIND: PacketKind = PacketKind::KeepAlive;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version >= ProtocolVersion::V1_12_2 {
            buf.put_i64(self.id);
        } else if version >= ProtocolVersion::V1_8 {
            write_varint(buf, self.id as i32);
        } else {
            buf.put_i32(self.id as i32);
        }
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let id = if version >= ProtocolVersion::V1_12_2 {
            read_i64(buf)?
        } else if version >= ProtocolVersion::V1_8 {
            read_varint(buf)? as i64
        } else {
            read_i32(buf)? as i64
        };
        Ok(Self { id })
    }

    fn min_len(version: ProtocolVersion) -> usize {
        if version >= ProtocolVersion::V1_12_2 {
            8
        } else if version >= ProtocolVersion::V1_8 {
            1
        } else {
            4
        }
    }

    fn max_len(version: ProtocolVersion) -> Option<usize> {
        Some(if version >= ProtocolVersion::V1_12_2 {
            8
        } else if version >= ProtocolVersion::V1_8 {
            5
        } else {
            4
        })
    }
}

/// Client settings. Sent during configuration on 1.20.2+, in play before that.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInformation {
    pub locale: String,
    pub view_distance: i8,
    pub chat_visibility: i32,
    pub chat_colors: bool,
    pub difficulty: u8,
    pub skin_parts: u8,
    pub main_hand: i32,
    pub text_filtering: bool,
    pub server_listing: bool,
    pub particle_status: i32,
}

impl ClientInformation {
    /// What a vanilla client with default options sends.
    pub fn vanilla(locale: impl Into<String>, view_distance: i8) -> Self {
        Self {
            locale: locale.into(),
            view_distance,
            chat_visibility: 0,
            chat_colors: true,
            difficulty: 2,
            skin_parts: 0x7F,
            main_hand: 1,
            text_filtering: false,
            server_listing: true,
            particle_status: 0,
        }
    }
}

impl PacketBody for ClientInformation {
    const KIND: PacketKind = PacketKind::ClientInformation;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.locale);
        buf.put_i8(self.view_distance);
        write_varint(buf, self.chat_visibility);
        write_bool(buf, self.chat_colors);
        if version < ProtocolVersion::V1_8 {
            buf.put_u8(self.difficulty);
        }
        buf.put_u8(self.skin_parts);
        if version >= ProtocolVersion::V1_9 {
            write_varint(buf, self.main_hand);
        }
        if version >= ProtocolVersion::V1_17 {
            write_bool(buf, self.text_filtering);
        }
        if version >= ProtocolVersion::V1_18 {
            write_bool(buf, self.server_listing);
        }
        if version >= ProtocolVersion::V1_21_2 {
            write_varint(buf, self.particle_status);
        }
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let locale = read_string(buf, 16)?;
        let view_distance = read_i8(buf)?;
        let chat_visibility = read_varint(buf)?;
        let chat_colors = read_bool(buf)?;
        let difficulty = if version < ProtocolVersion::V1_8 {
            read_u8(buf)?
        } else {
            0
        };
        let skin_parts = read_u8(buf)?;
        let main_hand = if version >= ProtocolVersion::V1_9 {
            read_varint(buf)?
        } else {
            1
        };
        let text_filtering = version >= ProtocolVersion::V1_17 && read_bool(buf)?;
        let server_listing = version >= ProtocolVersion::V1_18 && read_bool(buf)?;
        let particle_status = if version >= ProtocolVersion::V1_21_2 {
            read_varint(buf)?
        } else {
            0
        };
        Ok(Self {
            locale,
            view_distance,
            chat_visibility,
            chat_colors,
            difficulty,
            skin_parts,
            main_hand,
            text_filtering,
            server_listing,
            particle_status,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        2
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(256)
    }
}

/// Custom payload on a named channel. The fallback only reads the client brand.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Vec<u8>,
}

impl PluginMessage {
    /// Build a brand message the way a real client does: the brand as a protocol string.
    pub fn brand(version: ProtocolVersion, brand: &str) -> Self {
        let channel = if version >= ProtocolVersion::V1_13 {
            "minecraft:brand"
        } else {
            "MC|Brand"
        };
        let data = if version >= ProtocolVersion::V1_8 {
            let mut buf = BytesMut::new();
            write_string(&mut buf, brand);
            buf.to_vec()
        } else {
            brand.as_bytes().to_vec()
        };
        Self {
            channel: channel.into(),
            data,
        }
    }
}

impl PacketBody for PluginMessage {
    const KIND: PacketKind = PacketKind::PluginMessage;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.channel);
        if version < ProtocolVersion::V1_8 {
            buf.put_i16(self.data.len() as i16);
        }
        buf.put_slice(&self.data);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let channel = read_string(buf, 48)?;
        let len = if version >= ProtocolVersion::V1_8 {
            buf.remaining()
        } else {
            let len = read_i16(buf)?;
            if len < 0 {
                return Err(CodecError::NegativeLength(len as i32));
            }
            len as usize
        };
        if len > i16::MAX as usize {
            return Err(CodecError::ArrayTooLong(len, i16::MAX as usize));
        }
        let data = read_bytes(buf, len)?;
        Ok(Self { channel, data })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        4
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(0xFFF)
    }
}
