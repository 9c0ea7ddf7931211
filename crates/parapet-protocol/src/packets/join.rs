use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::dimension::{dimension_codec, dimension_element, OVERWORLD};
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use parapet_nbt::{NbtRoot, NbtValue};
use parapet_types::GameMode;

fn write_nbt(buf: &mut BytesMut, version: ProtocolVersion, tag: &NbtValue) {
    let root = if version >= ProtocolVersion::V1_20_2 {
        NbtRoot::Nameless
    } else {
        NbtRoot::Named
    };
    tag.write_root(root, buf);
}

/// Puts the client into the overworld of a flat, empty world.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGame {
    pub entity_id: i32,
    pub hardcore: bool,
    pub game_mode: GameMode,
    pub max_players: i32,
    pub view_distance: i32,
    pub simulation_distance: i32,
    pub reduced_debug_info: bool,
    pub show_respawn_screen: bool,
    pub hashed_seed: i64,
    pub portal_cooldown: i32,
    pub sea_level: i32,
    pub enforces_secure_chat: bool,
}

impl JoinGame {
    pub fn new(entity_id: i32, game_mode: GameMode) -> Self {
        Self {
            entity_id,
            hardcore: false,
            game_mode,
            max_players: 1,
            view_distance: 2,
            simulation_distance: 2,
            reduced_debug_info: true,
            show_respawn_screen: false,
            hashed_seed: 0,
            portal_cooldown: 0,
            sea_level: 63,
            enforces_secure_chat: false,
        }
    }
}

impl PacketBody for JoinGame {
    const KIND: PacketKind = PacketKind::JoinGame;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        let game_mode = self.game_mode.id();
        buf.put_i32(self.entity_id);
        if version >= ProtocolVersion::V1_16_2 {
            write_bool(buf, self.hardcore);
        }
        if version < ProtocolVersion::V1_20_2 {
            buf.put_u8(game_mode);
        }

        if version >= ProtocolVersion::V1_16 {
            if version < ProtocolVersion::V1_20_2 {
                // Previous game mode
                buf.put_u8(game_mode);
            }
            // Level names
            write_varint(buf, 1);
            write_string(buf, OVERWORLD);

            if version < ProtocolVersion::V1_20_2 {
                let codec = dimension_codec(version)
                    .ok_or(CodecError::InvalidValue("dimension codec"))?;
                write_nbt(buf, version, &codec);

                if version.in_between(ProtocolVersion::V1_16_2, ProtocolVersion::V1_18_2) {
                    write_nbt(buf, version, &dimension_element(version));
                } else {
                    write_string(buf, OVERWORLD);
                }
                // Level name
                write_string(buf, OVERWORLD);
            }
        } else if version > ProtocolVersion::V1_9 {
            buf.put_i32(0);
        } else {
            buf.put_i8(0);
        }

        if version.in_between(ProtocolVersion::V1_15, ProtocolVersion::V1_20) {
            buf.put_i64(self.hashed_seed);
        }
        if version < ProtocolVersion::V1_14 {
            // Difficulty
            buf.put_u8(0);
        }
        if version >= ProtocolVersion::V1_16_2 {
            write_varint(buf, self.max_players);
        } else {
            buf.put_u8(self.max_players as u8);
        }
        if version < ProtocolVersion::V1_16 {
            // Level type
            write_string(buf, "flat");
        }
        if version >= ProtocolVersion::V1_14 {
            write_varint(buf, self.view_distance);
        }
        if version >= ProtocolVersion::V1_18 {
            write_varint(buf, self.simulation_distance);
        }
        if version >= ProtocolVersion::V1_8 {
            write_bool(buf, self.reduced_debug_info);
        }
        if version >= ProtocolVersion::V1_15 {
            write_bool(buf, self.show_respawn_screen);
        }

        if version >= ProtocolVersion::V1_20_2 {
            // Limited crafting
            write_bool(buf, false);
            if version >= ProtocolVersion::V1_20_5 {
                // Index into the dimension type registry
                write_varint(buf, 0);
            } else {
                write_string(buf, OVERWORLD);
            }
            write_string(buf, OVERWORLD);
            buf.put_i64(self.hashed_seed);
            buf.put_u8(game_mode);
            buf.put_u8(game_mode);
        }

        if version >= ProtocolVersion::V1_16 {
            // Debug, flat
            write_bool(buf, false);
            write_bool(buf, true);
        }
        if version >= ProtocolVersion::V1_19 {
            // Last death location
            write_bool(buf, false);
        }
        if version >= ProtocolVersion::V1_20 {
            write_varint(buf, self.portal_cooldown);
        }
        if version >= ProtocolVersion::V1_21_2 {
            write_varint(buf, self.sea_level);
        }
        if version >= ProtocolVersion::V1_20_5 {
            write_bool(buf, self.enforces_secure_chat);
        }
        Ok(())
    }
}
