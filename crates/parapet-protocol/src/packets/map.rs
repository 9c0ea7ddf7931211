use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use parapet_nbt::{nbt_compound, NbtRoot};

/// Side length of a map item in pixels.
pub const MAP_SIZE: usize = 128;

/// Item id of `minecraft:filled_map` on the given version.
pub fn filled_map_item_id(version: ProtocolVersion) -> i32 {
    use ProtocolVersion::*;
    const IDS: [(ProtocolVersion, i32); 16] = [
        (V1_12_2, 358),
        (V1_13_1, 608),
        (V1_13_2, 613),
        (V1_15_2, 671),
        (V1_16_4, 733),
        (V1_18_2, 847),
        (V1_19_1, 886),
        (V1_19_3, 914),
        (V1_19_4, 937),
        (V1_20_2, 941),
        (V1_20_3, 979),
        (V1_21, 982),
        (V1_21_2, 1022),
        (V1_21_4, 1031),
        (V1_21_5, 1042),
        (V1_21_7, 1059),
    ];
    IDS.iter()
        .find(|(until, _)| version <= *until)
        .map(|(_, id)| *id)
        .unwrap_or(1104)
}

/// Data component id of `minecraft:map_id` on 1.20.5+.
fn map_id_component(version: ProtocolVersion) -> i32 {
    if version <= ProtocolVersion::V1_21 {
        26
    } else if version <= ProtocolVersion::V1_21_4 {
        36
    } else {
        37
    }
}

/// A rectangular patch of map pixels, one palette index per pixel in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub map_id: i32,
    pub columns: u8,
    pub rows: u8,
    pub x: u8,
    pub y: u8,
    pub data: Vec<u8>,
}

impl MapData {
    /// The whole 128x128 canvas in one packet (1.8+).
    pub fn full(map_id: i32, pixels: Vec<u8>) -> Self {
        Self {
            map_id,
            columns: MAP_SIZE as u8,
            rows: MAP_SIZE as u8,
            x: 0,
            y: 0,
            data: pixels,
        }
    }

    /// One packet per pixel column, which is all 1.7 clients accept.
    pub fn legacy_columns(map_id: i32, pixels: &[u8]) -> Vec<Self> {
        (0..MAP_SIZE)
            .map(|x| Self {
                map_id,
                columns: 1,
                rows: MAP_SIZE as u8,
                x: x as u8,
                y: 0,
                data: (0..MAP_SIZE)
                    .map(|y| pixels.get(y * MAP_SIZE + x).copied().unwrap_or(0))
                    .collect(),
            })
            .collect()
    }
}

impl PacketBody for MapData {
    const KIND: PacketKind = PacketKind::MapData;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if self.data.len() != self.columns as usize * self.rows as usize {
            return Err(CodecError::InvalidValue("map pixel count"));
        }
        write_varint(buf, self.map_id);

        if version < ProtocolVersion::V1_8 {
            if self.columns != 1 {
                return Err(CodecError::InvalidValue("legacy map column"));
            }
            buf.put_i16(self.data.len() as i16 + 3);
            buf.put_u8(0);
            buf.put_u8(self.x);
            buf.put_u8(self.y);
            buf.put_slice(&self.data);
            return Ok(());
        }

        // Scale
        buf.put_u8(0);
        if version.in_between(ProtocolVersion::V1_9, ProtocolVersion::V1_16_4) {
            // Tracking position
            write_bool(buf, false);
        }
        if version >= ProtocolVersion::V1_14 {
            // Locked
            write_bool(buf, false);
        }
        if version >= ProtocolVersion::V1_17 {
            // No icons
            write_bool(buf, false);
        } else {
            write_varint(buf, 0);
        }
        buf.put_u8(self.columns);
        buf.put_u8(self.rows);
        buf.put_u8(self.x);
        buf.put_u8(self.y);
        write_byte_array(buf, &self.data);
        Ok(())
    }
}

/// Puts a filled map with id 0 into a player inventory slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SetContainerSlot {
    pub window_id: i32,
    pub state_id: i32,
    pub slot: i16,
    pub count: i32,
}

impl SetContainerSlot {
    pub fn filled_map(slot: i16) -> Self {
        Self {
            window_id: 0,
            state_id: 0,
            slot,
            count: 1,
        }
    }
}

impl PacketBody for SetContainerSlot {
    const KIND: PacketKind = PacketKind::SetContainerSlot;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version >= ProtocolVersion::V1_21_2 {
            write_varint(buf, self.window_id);
        } else {
            buf.put_u8(self.window_id as u8);
        }
        if version >= ProtocolVersion::V1_17_1 {
            write_varint(buf, self.state_id);
        }
        buf.put_i16(self.slot);

        let item_id = filled_map_item_id(version);
        if version.in_between(ProtocolVersion::V1_13_2, ProtocolVersion::V1_20_3) {
            // Present
            write_bool(buf, true);
        }
        if version >= ProtocolVersion::V1_20_5 {
            write_varint(buf, self.count);
        }
        if version < ProtocolVersion::V1_13_2 {
            buf.put_i16(item_id as i16);
        } else {
            write_varint(buf, item_id);
        }
        if version < ProtocolVersion::V1_20_5 {
            buf.put_u8(self.count as u8);
        }
        if version < ProtocolVersion::V1_13 {
            // Damage doubles as the map id
            buf.put_i16(0);
        }

        if version < ProtocolVersion::V1_8 {
            buf.put_i16(-1);
        } else if version < ProtocolVersion::V1_17 {
            // No NBT
            buf.put_u8(0);
        } else if version < ProtocolVersion::V1_20_5 {
            let root = if version >= ProtocolVersion::V1_20_2 {
                NbtRoot::Nameless
            } else {
                NbtRoot::Named
            };
            nbt_compound! { "map" => 0 }.write_root(root, buf);
        } else {
            // Components to add, then to remove
            write_varint(buf, 1);
            write_varint(buf, 0);
            write_varint(buf, map_id_component(version));
            write_varint(buf, 0);
        }
        Ok(())
    }
}
