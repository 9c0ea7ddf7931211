use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use parapet_nbt::{nbt_compound, NbtRoot, NbtValue};
use parapet_types::BlockPos;

/// Game event that lets 1.20.3+ clients leave the loading screen.
pub const GAME_EVENT_START_WAITING_FOR_CHUNKS: u8 = 13;

/// Global palette id of stone on 1.13+. Older versions use the legacy id, which is also 1.
pub const STONE_BLOCK_ID: i32 = 1;

fn write_nbt(buf: &mut BytesMut, version: ProtocolVersion, tag: &NbtValue) {
    let root = if version >= ProtocolVersion::V1_20_2 {
        NbtRoot::Nameless
    } else {
        NbtRoot::Named
    };
    tag.write_root(root, buf);
}

// === Abilities ===

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAbilities {
    pub flags: u8,
    pub flying_speed: f32,
    pub walking_speed: f32,
}

impl PlayerAbilities {
    pub const INVULNERABLE: u8 = 0x01;
    pub const FLYING: u8 = 0x02;
    pub const ALLOW_FLYING: u8 = 0x04;
    pub const CREATIVE: u8 = 0x08;

    pub fn new(flags: u8) -> Self {
        Self {
            flags,
            flying_speed: 0.0,
            walking_speed: 0.1,
        }
    }
}

impl PacketBody for PlayerAbilities {
    const KIND: PacketKind = PacketKind::PlayerAbilities;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        buf.put_u8(self.flags);
        buf.put_f32(self.flying_speed);
        buf.put_f32(self.walking_speed);
        Ok(())
    }
}

// === World ===

/// An empty chunk column. Clients need one loaded around them before they start falling.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    pub chunk_x: i32,
    pub chunk_z: i32,
}

const LEGACY_LIGHT_DATA: [u8; 15] = [1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 3, 0xFF, 0xFF, 0, 0];
const EMPTY_SECTION: [u8; 8] = [0, 0, 0, 0, 0, 0, 1, 0];

impl PacketBody for ChunkData {
    const KIND: PacketKind = PacketKind::ChunkData;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_i32(self.chunk_x);
        buf.put_i32(self.chunk_z);

        if version >= ProtocolVersion::V1_17 {
            if version <= ProtocolVersion::V1_17_1 {
                // Section mask
                write_varint(buf, 0);
            }
        } else {
            // Full chunk
            write_bool(buf, true);
            if version.in_between(ProtocolVersion::V1_16, ProtocolVersion::V1_16_1) {
                // Ignore old data
                write_bool(buf, true);
            }
            if version > ProtocolVersion::V1_8 {
                write_varint(buf, 0);
            } else {
                // A zero mask would unload the column on 1.7/1.8
                buf.put_i16(1);
            }
        }

        if version >= ProtocolVersion::V1_14 {
            let longs = if version < ProtocolVersion::V1_18 { 36 } else { 37 };
            let heightmaps = nbt_compound! {
                "root" => nbt_compound! {
                    "MOTION_BLOCKING" => NbtValue::LongArray(vec![0; longs]),
                },
            };
            write_nbt(buf, version, &heightmaps);

            if version.in_between(ProtocolVersion::V1_15, ProtocolVersion::V1_17_1) {
                if version >= ProtocolVersion::V1_16_2 {
                    write_varint(buf, 1024);
                    for _ in 0..1024 {
                        write_varint(buf, 1);
                    }
                } else {
                    for _ in 0..1024 {
                        buf.put_i32(0);
                    }
                }
            }
        }

        if version < ProtocolVersion::V1_8 {
            buf.put_i32(0);
            buf.put_slice(&[0, 0]);
        } else if version < ProtocolVersion::V1_13 {
            write_varint(buf, 0);
        } else if version < ProtocolVersion::V1_15 {
            write_byte_array(buf, &[0; 1024]);
        } else if version < ProtocolVersion::V1_18 {
            write_varint(buf, 0);
        } else {
            let count = if version >= ProtocolVersion::V1_21_2 { 24 } else { 16 };
            write_varint(buf, (EMPTY_SECTION.len() * count) as i32);
            for _ in 0..count {
                buf.put_slice(&EMPTY_SECTION);
            }
        }

        if version >= ProtocolVersion::V1_9_4 {
            // Block entities
            write_varint(buf, 0);
        }

        if version >= ProtocolVersion::V1_21_2 {
            for _ in 0..6 {
                write_varint(buf, 0);
            }
        } else if version >= ProtocolVersion::V1_18 {
            if version >= ProtocolVersion::V1_20 {
                buf.put_slice(&LEGACY_LIGHT_DATA[1..]);
            } else {
                buf.put_slice(&LEGACY_LIGHT_DATA);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockUpdate {
    pub pos: BlockPos,
    pub block_id: i32,
}

impl BlockUpdate {
    pub fn new(pos: BlockPos, block_id: i32) -> Self {
        Self { pos, block_id }
    }
}

/// Multi-block change inside one chunk section.
///
/// Before 1.16.2 the packet addresses a whole column and `section_y` is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSectionBlocks {
    pub section_x: i32,
    pub section_y: i32,
    pub section_z: i32,
    pub blocks: Vec<BlockUpdate>,
}

impl PacketBody for UpdateSectionBlocks {
    const KIND: PacketKind = PacketKind::UpdateSectionBlocks;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version < ProtocolVersion::V1_16_2 {
            buf.put_i32(self.section_x);
            buf.put_i32(self.section_z);
            if version < ProtocolVersion::V1_8 {
                buf.put_i16(self.blocks.len() as i16);
                buf.put_i32(4 * self.blocks.len() as i32);
            } else {
                write_varint(buf, self.blocks.len() as i32);
            }
            for block in &self.blocks {
                buf.put_u16(block.pos.chunk_local_legacy());
                if version >= ProtocolVersion::V1_13 {
                    write_varint(buf, block.block_id);
                } else if version >= ProtocolVersion::V1_8 {
                    write_varint(buf, block.block_id << 4);
                } else {
                    buf.put_i16((block.block_id << 4) as i16);
                }
            }
            return Ok(());
        }

        let section = ((self.section_x as i64 & 0x3FFFFF) << 42)
            | (self.section_y as i64 & 0xFFFFF)
            | ((self.section_z as i64 & 0x3FFFFF) << 20);
        buf.put_i64(section);
        if version < ProtocolVersion::V1_20 {
            // Suppress light updates
            write_bool(buf, true);
        }
        write_varint(buf, self.blocks.len() as i32);
        for block in &self.blocks {
            write_varlong(
                buf,
                (block.block_id as i64) << 12 | block.pos.section_local() as i64,
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetDefaultSpawnPosition {
    pub pos: BlockPos,
    pub angle: f32,
}

impl PacketBody for SetDefaultSpawnPosition {
    const KIND: PacketKind = PacketKind::SetDefaultSpawnPosition;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version < ProtocolVersion::V1_8 {
            buf.put_i32(self.pos.x);
            buf.put_i32(self.pos.y);
            buf.put_i32(self.pos.z);
            return Ok(());
        }
        if version >= ProtocolVersion::V1_21_9 {
            write_string(buf, "minecraft:overworld");
        }
        if version < ProtocolVersion::V1_14 {
            buf.put_u64(self.pos.encode_legacy());
        } else {
            buf.put_u64(self.pos.encode());
        }
        if version >= ProtocolVersion::V1_17 {
            buf.put_f32(self.angle);
        }
        if version >= ProtocolVersion::V1_21_9 {
            // Pitch
            buf.put_f32(0.0);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTime {
    pub world_age: i64,
    pub time_of_day: i64,
}

impl PacketBody for UpdateTime {
    const KIND: PacketKind = PacketKind::UpdateTime;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_i64(self.world_age);
        buf.put_i64(self.time_of_day);
        if version >= ProtocolVersion::V1_21_2 {
            // Advance time
            write_bool(buf, false);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub event: u8,
    pub value: f32,
}

impl PacketBody for GameEvent {
    const KIND: PacketKind = PacketKind::GameEvent;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        buf.put_u8(self.event);
        buf.put_f32(self.value);
        Ok(())
    }
}

// === Checks ===

/// Window confirmation before 1.17, ping/pong after.
///
/// The same layout is used in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub window_id: u8,
    pub id: i32,
    pub accepted: bool,
}

impl Transaction {
    pub fn new(id: i32) -> Self {
        Self {
            window_id: 0,
            id,
            accepted: false,
        }
    }
}

impl PacketBody for Transaction {
    const KIND: PacketKind = PacketKind::Transaction;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version >= ProtocolVersion::V1_17 {
            buf.put_i32(self.id);
        } else {
            buf.put_u8(self.window_id);
            buf.put_i16(self.id as i16);
            write_bool(buf, self.accepted);
        }
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        if version >= ProtocolVersion::V1_17 {
            return Ok(Self {
                window_id: 0,
                id: read_i32(buf)?,
                accepted: true,
            });
        }
        Ok(Self {
            window_id: read_u8(buf)?,
            id: read_i16(buf)? as i32,
            accepted: read_bool(buf)?,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        4
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(4)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetExperience {
    pub bar: f32,
    pub level: i32,
    pub total: i32,
}

impl PacketBody for SetExperience {
    const KIND: PacketKind = PacketKind::SetExperience;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_f32(self.bar);
        if version < ProtocolVersion::V1_8 {
            buf.put_i16(self.level as i16);
            buf.put_i16(self.total as i16);
        } else {
            write_varint(buf, self.level);
            write_varint(buf, self.total);
        }
        Ok(())
    }
}

/// Hands a verified 1.20.5+ client over to another server.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub host: String,
    pub port: i32,
}

impl PacketBody for Transfer {
    const KIND: PacketKind = PacketKind::Transfer;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.host);
        write_varint(buf, self.port);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::roundtrip;

    fn encoded<T: PacketBody>(packet: &T, version: ProtocolVersion) -> BytesMut {
        let mut buf = BytesMut::new();
        packet.encode(&mut buf, version).unwrap();
        buf
    }

    #[test]
    fn test_transaction_layouts() {
        let legacy = Transaction {
            window_id: 0,
            id: -5,
            accepted: true,
        };
        assert_eq!(roundtrip(&legacy, ProtocolVersion::V1_8), legacy);

        let ping = Transaction::new(-123_456);
        let decoded = roundtrip(&ping, ProtocolVersion::V1_17);
        assert_eq!(decoded.id, -123_456);
        assert!(decoded.accepted);
    }

    #[test]
    fn test_legacy_transaction_rejects_bad_bool() {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        buf.put_i16(-1);
        buf.put_u8(7);
        assert!(Transaction::decode(&mut buf, ProtocolVersion::V1_12_2).is_err());
    }

    #[test]
    fn test_chunk_data_section_count() {
        let chunk = ChunkData {
            chunk_x: 0,
            chunk_z: 0,
        };
        let old = encoded(&chunk, ProtocolVersion::V1_20_5);
        let new = encoded(&chunk, ProtocolVersion::V1_21_2);
        assert!(new.len() > old.len());

        let legacy = encoded(&chunk, ProtocolVersion::V1_7_2);
        // x, z, full, mask, size, two padding bytes
        assert_eq!(legacy.len(), 4 + 4 + 1 + 2 + 4 + 2);
    }

    #[test]
    fn test_section_blocks_modern_layout() {
        let packet = UpdateSectionBlocks {
            section_x: 0,
            section_y: 4,
            section_z: 0,
            blocks: vec![BlockUpdate::new(BlockPos::new(1, 66, 2), STONE_BLOCK_ID)],
        };
        let mut buf = encoded(&packet, ProtocolVersion::V1_20);
        assert_eq!(read_i64(&mut buf).unwrap(), 4);
        assert_eq!(read_varint(&mut buf).unwrap(), 1);
        let entry = read_varlong(&mut buf).unwrap();
        assert_eq!(entry >> 12, STONE_BLOCK_ID as i64);
        assert_eq!(entry & 0xFFF, (1 << 8 | 2 << 4 | 2) as i64);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_section_blocks_legacy_layout() {
        let packet = UpdateSectionBlocks {
            section_x: 0,
            section_y: 0,
            section_z: 0,
            blocks: vec![BlockUpdate::new(BlockPos::new(3, 64, 5), STONE_BLOCK_ID)],
        };
        let mut buf = encoded(&packet, ProtocolVersion::V1_7_6);
        assert_eq!(read_i32(&mut buf).unwrap(), 0);
        assert_eq!(read_i32(&mut buf).unwrap(), 0);
        assert_eq!(read_i16(&mut buf).unwrap(), 1);
        assert_eq!(read_i32(&mut buf).unwrap(), 4);
        assert_eq!(read_u16(&mut buf).unwrap(), 3 << 12 | 5 << 8 | 64);
        assert_eq!(read_i16(&mut buf).unwrap(), 1 << 4);
    }

    #[test]
    fn test_spawn_position_layouts() {
        let packet = SetDefaultSpawnPosition {
            pos: BlockPos::new(8, 100, 8),
            angle: 0.0,
        };
        assert_eq!(encoded(&packet, ProtocolVersion::V1_7_2).len(), 12);
        assert_eq!(encoded(&packet, ProtocolVersion::V1_8).len(), 8);
        assert_eq!(encoded(&packet, ProtocolVersion::V1_17).len(), 12);

        let mut buf = encoded(&packet, ProtocolVersion::V1_14);
        assert_eq!(BlockPos::decode(read_i64(&mut buf).unwrap() as u64), packet.pos);
    }

    #[test]
    fn test_update_time_flag() {
        let packet = UpdateTime {
            world_age: 0,
            time_of_day: 1000,
        };
        assert_eq!(encoded(&packet, ProtocolVersion::V1_21).len(), 16);
        assert_eq!(encoded(&packet, ProtocolVersion::V1_21_2).len(), 17);
    }
}
