//! Dimension, biome and related registries the client needs before it can
//! render a world. Each builder only emits the fields the target version knows.

use crate::packets::{RegistryData, RegistryEntry};
use crate::version::ProtocolVersion;
use parapet_nbt::{nbt_compound, nbt_list, NbtValue};

pub const OVERWORLD: &str = "minecraft:overworld";
const PLAINS: &str = "minecraft:plains";

// === Dimension type ===

fn dimension_fields(version: ProtocolVersion) -> Vec<(String, NbtValue)> {
    let mut fields = vec![
        ("piglin_safe".into(), NbtValue::Byte(0)),
        ("natural".into(), NbtValue::Byte(1)),
        ("ambient_light".into(), NbtValue::Float(0.0)),
        ("respawn_anchor_works".into(), NbtValue::Byte(0)),
        ("has_skylight".into(), NbtValue::Byte(1)),
        ("bed_works".into(), NbtValue::Byte(1)),
        ("has_raids".into(), NbtValue::Byte(1)),
        ("ultrawarm".into(), NbtValue::Byte(0)),
        ("has_ceiling".into(), NbtValue::Byte(0)),
    ];
    let infiniburn = if version >= ProtocolVersion::V1_18_2 {
        "#minecraft:infiniburn_overworld"
    } else {
        "minecraft:infiniburn_overworld"
    };
    fields.push(("infiniburn".into(), NbtValue::from(infiniburn)));

    if version >= ProtocolVersion::V1_17 {
        fields.push(("min_y".into(), NbtValue::Int(-64)));
        fields.push(("height".into(), NbtValue::Int(384)));
        fields.push(("logical_height".into(), NbtValue::Int(384)));
    } else {
        fields.push(("logical_height".into(), NbtValue::Int(256)));
    }

    if version >= ProtocolVersion::V1_16_2 {
        fields.push(("effects".into(), NbtValue::from(OVERWORLD)));
        fields.push(("coordinate_scale".into(), NbtValue::Double(1.0)));
    } else {
        fields.push(("shrunk".into(), NbtValue::Byte(0)));
    }

    if version >= ProtocolVersion::V1_19 {
        fields.push(("monster_spawn_light_level".into(), NbtValue::Int(0)));
        fields.push(("monster_spawn_block_light_limit".into(), NbtValue::Int(0)));
    }
    fields
}

/// The overworld dimension type as sent inside the 1.16.2-1.18.2 join packet.
pub fn dimension_element(version: ProtocolVersion) -> NbtValue {
    NbtValue::Compound(dimension_fields(version))
}

// === Biome ===

fn biome_element(version: ProtocolVersion) -> NbtValue {
    let mut fields = vec![
        ("temperature".into(), NbtValue::Float(0.8)),
        ("downfall".into(), NbtValue::Float(0.4)),
    ];
    if version >= ProtocolVersion::V1_19_4 {
        fields.push(("has_precipitation".into(), NbtValue::Byte(1)));
    } else {
        fields.push(("precipitation".into(), NbtValue::from("rain")));
    }
    if version < ProtocolVersion::V1_18 {
        fields.push(("depth".into(), NbtValue::Float(0.125)));
        fields.push(("scale".into(), NbtValue::Float(0.05)));
    }
    if version < ProtocolVersion::V1_19 {
        fields.push(("category".into(), NbtValue::from("plains")));
    }
    fields.push((
        "effects".into(),
        nbt_compound! {
            "fog_color" => 12638463,
            "water_color" => 4159204,
            "water_fog_color" => 329011,
            "sky_color" => 7907327,
            "mood_sound" => nbt_compound! {
                "sound" => "minecraft:ambient.cave",
                "tick_delay" => 6000,
                "offset" => 2.0,
                "block_search_extent" => 8,
            },
        },
    ));
    NbtValue::Compound(fields)
}

// === Chat type ===

fn chat_decoration(key: &str) -> NbtValue {
    nbt_compound! {
        "translation_key" => key,
        "parameters" => nbt_list!["sender", "content"],
    }
}

fn chat_type_element(version: ProtocolVersion) -> NbtValue {
    if version >= ProtocolVersion::V1_19_1 {
        nbt_compound! {
            "chat" => chat_decoration("chat.type.text"),
            "narration" => chat_decoration("chat.type.text.narrate"),
        }
    } else {
        nbt_compound! {
            "chat" => nbt_compound! {
                "decoration" => chat_decoration("chat.type.text"),
            },
            "narration" => nbt_compound! {
                "decoration" => chat_decoration("chat.type.text.narrate"),
                "priority" => "chat",
            },
        }
    }
}

/// 1.19 addresses system chat by registry id, so all three kinds must exist.
const CHAT_TYPES: [&str; 3] = ["minecraft:chat", "minecraft:system", "minecraft:game_info"];

// === Damage type ===

fn damage_entry(id: &str, message_id: &str, scaling: &str, exhaustion: f32) -> (String, NbtValue) {
    (
        format!("minecraft:{}", id),
        nbt_compound! {
            "message_id" => message_id,
            "scaling" => scaling,
            "exhaustion" => exhaustion,
        },
    )
}

fn damage_types(version: ProtocolVersion) -> Vec<(String, NbtValue)> {
    let s = "when_caused_by_living_non_player";
    let mut entries = vec![
        damage_entry("arrow", "arrow", s, 0.1),
        damage_entry("bad_respawn_point", "badRespawnPoint", "always", 0.1),
        damage_entry("cactus", "cactus", s, 0.1),
        damage_entry("cramming", "cramming", s, 0.0),
        damage_entry("dragon_breath", "dragonBreath", s, 0.0),
        damage_entry("drown", "drown", s, 0.0),
        damage_entry("dry_out", "dryout", s, 0.1),
        damage_entry("explosion", "explosion", "always", 0.1),
        damage_entry("fall", "fall", s, 0.0),
        damage_entry("falling_anvil", "anvil", s, 0.1),
        damage_entry("falling_block", "fallingBlock", s, 0.1),
        damage_entry("falling_stalactite", "fallingStalactite", s, 0.1),
        damage_entry("fireball", "fireball", s, 0.1),
        damage_entry("fireworks", "fireworks", s, 0.1),
        damage_entry("fly_into_wall", "flyIntoWall", s, 0.0),
        damage_entry("freeze", "freeze", s, 0.0),
        damage_entry("generic", "generic", s, 0.0),
        damage_entry("hot_floor", "hotFloor", s, 0.1),
        damage_entry("in_fire", "inFire", s, 0.1),
        damage_entry("in_wall", "inWall", s, 0.0),
        damage_entry("indirect_magic", "indirectMagic", s, 0.0),
        damage_entry("lava", "lava", s, 0.1),
        damage_entry("lightning_bolt", "lightningBolt", s, 0.1),
        damage_entry("magic", "magic", s, 0.0),
        damage_entry("mob_attack", "mob", s, 0.1),
        damage_entry("mob_attack_no_aggro", "mob", s, 0.1),
        damage_entry("mob_projectile", "mob", s, 0.1),
        damage_entry("on_fire", "onFire", s, 0.0),
        damage_entry("out_of_world", "outOfWorld", s, 0.0),
        damage_entry("player_attack", "player", s, 0.1),
        damage_entry("player_explosion", "explosion.player", "always", 0.1),
        damage_entry("sonic_boom", "sonic_boom", "always", 0.0),
        damage_entry("stalagmite", "stalagmite", s, 0.0),
        damage_entry("starve", "starve", s, 0.0),
        damage_entry("sting", "sting", s, 0.1),
        damage_entry("sweet_berry_bush", "sweetBerryBush", s, 0.1),
        damage_entry("thorns", "thorns", s, 0.1),
        damage_entry("thrown", "thrown", s, 0.1),
        damage_entry("trident", "trident", s, 0.1),
        damage_entry("unattributed_fireball", "onFire", s, 0.1),
        damage_entry("wither", "wither", s, 0.0),
        damage_entry("wither_skull", "witherSkull", s, 0.1),
    ];
    if version >= ProtocolVersion::V1_20 {
        entries.push(damage_entry("outside_border", "outsideBorder", s, 0.0));
        entries.push(damage_entry("generic_kill", "genericKill", s, 0.0));
    }
    if version >= ProtocolVersion::V1_20_3 {
        entries.push(damage_entry("campfire", "inFire", s, 0.1));
    }
    if version >= ProtocolVersion::V1_20_5 {
        entries.push(damage_entry("spit", "mob", s, 0.1));
        entries.push(damage_entry("wind_charge", "mob", s, 0.1));
    }
    if version >= ProtocolVersion::V1_21 {
        entries.push(damage_entry("mace_smash", "mace_smash", s, 0.1));
    }
    if version >= ProtocolVersion::V1_21_2 {
        entries.push(damage_entry("ender_pearl", "fall", s, 0.0));
    }
    entries
}

// === Codec ===

/// Wraps entries as `{type, value: [{name, id, element}]}`.
fn codec_registry(registry: &str, entries: Vec<(String, NbtValue)>) -> NbtValue {
    let value = entries
        .into_iter()
        .enumerate()
        .map(|(id, (name, element))| {
            nbt_compound! {
                "name" => name,
                "id" => id as i32,
                "element" => element,
            }
        })
        .collect();
    nbt_compound! {
        "type" => registry,
        "value" => NbtValue::List(value),
    }
}

/// Registry codec carried by the join packet (1.16-1.20.1) or by the single
/// configuration registry packet (1.20.2-1.20.4). `None` where neither exists.
pub fn dimension_codec(version: ProtocolVersion) -> Option<NbtValue> {
    if version < ProtocolVersion::V1_16 || version >= ProtocolVersion::V1_20_5 {
        return None;
    }

    if version < ProtocolVersion::V1_16_2 {
        let mut overworld = dimension_fields(version);
        overworld.insert(0, ("name".into(), NbtValue::from(OVERWORLD)));
        return Some(nbt_compound! {
            "dimension" => NbtValue::List(vec![NbtValue::Compound(overworld)]),
        });
    }

    let mut codec = vec![
        (
            "minecraft:dimension_type".to_string(),
            codec_registry(
                "minecraft:dimension_type",
                vec![(OVERWORLD.into(), dimension_element(version))],
            ),
        ),
        (
            "minecraft:worldgen/biome".to_string(),
            codec_registry(
                "minecraft:worldgen/biome",
                vec![(PLAINS.into(), biome_element(version))],
            ),
        ),
    ];
    if version >= ProtocolVersion::V1_19 {
        let chat_types = CHAT_TYPES
            .iter()
            .map(|id| (id.to_string(), chat_type_element(version)))
            .collect();
        codec.push((
            "minecraft:chat_type".into(),
            codec_registry("minecraft:chat_type", chat_types),
        ));
    }
    if version >= ProtocolVersion::V1_19_4 {
        codec.push((
            "minecraft:damage_type".into(),
            codec_registry("minecraft:damage_type", damage_types(version)),
        ));
    }
    Some(NbtValue::Compound(codec))
}

// === Configuration registries ===

fn registry(registry_id: &str, entries: Vec<(String, NbtValue)>) -> RegistryData {
    RegistryData::Registry {
        registry_id: registry_id.into(),
        entries: entries
            .into_iter()
            .map(|(id, data)| RegistryEntry {
                id,
                data: Some(data),
            })
            .collect(),
    }
}

fn empty_registry(registry_id: &str) -> RegistryData {
    RegistryData::Registry {
        registry_id: registry_id.into(),
        entries: vec![],
    }
}

fn simple_variant(registry_id: &str, texture: &str) -> RegistryData {
    registry(
        registry_id,
        vec![(
            "minecraft:temperate".into(),
            nbt_compound! {
                "asset_id" => texture,
                "spawn_conditions" => NbtValue::List(vec![]),
            },
        )],
    )
}

fn variant_registries(version: ProtocolVersion) -> Vec<RegistryData> {
    let wolf = if version >= ProtocolVersion::V1_21_5 {
        nbt_compound! {
            "assets" => nbt_compound! {
                "wild" => "minecraft:entity/wolf/wolf",
                "tame" => "minecraft:entity/wolf/wolf_tame",
                "angry" => "minecraft:entity/wolf/wolf_angry",
            },
            "spawn_conditions" => NbtValue::List(vec![]),
        }
    } else {
        nbt_compound! {
            "wild_texture" => "minecraft:textures/entity/wolf/wolf.png",
            "tame_texture" => "minecraft:textures/entity/wolf/wolf_tame.png",
            "angry_texture" => "minecraft:textures/entity/wolf/wolf_angry.png",
            "biomes" => PLAINS,
        }
    };
    let mut registries = vec![
        registry("minecraft:wolf_variant", vec![("minecraft:pale".into(), wolf)]),
        registry(
            "minecraft:painting_variant",
            vec![(
                "minecraft:kebab".into(),
                nbt_compound! {
                    "asset_id" => "minecraft:kebab",
                    "width" => 1,
                    "height" => 1,
                },
            )],
        ),
    ];
    if version >= ProtocolVersion::V1_21_5 {
        registries.push(registry(
            "minecraft:wolf_sound_variant",
            vec![(
                "minecraft:classic".into(),
                nbt_compound! {
                    "ambient_sound" => "minecraft:entity.wolf.ambient",
                    "death_sound" => "minecraft:entity.wolf.death",
                    "growl_sound" => "minecraft:entity.wolf.growl",
                    "hurt_sound" => "minecraft:entity.wolf.hurt",
                    "pant_sound" => "minecraft:entity.wolf.pant",
                    "whine_sound" => "minecraft:entity.wolf.whine",
                },
            )],
        ));
        registries.push(simple_variant("minecraft:pig_variant", "minecraft:entity/pig/temperate_pig"));
        registries.push(simple_variant("minecraft:cat_variant", "minecraft:entity/cat/tabby"));
        registries.push(simple_variant("minecraft:frog_variant", "minecraft:entity/frog/temperate_frog"));
        registries.push(simple_variant("minecraft:cow_variant", "minecraft:entity/cow/temperate_cow"));
        registries.push(simple_variant("minecraft:chicken_variant", "minecraft:entity/chicken/temperate_chicken"));
    }
    registries
}

/// Registry packets for the configuration phase, in send order.
pub fn registry_packets(version: ProtocolVersion) -> Vec<RegistryData> {
    if !version.has_configuration() {
        return vec![];
    }
    if version < ProtocolVersion::V1_20_5 {
        return dimension_codec(version)
            .map(RegistryData::Codec)
            .into_iter()
            .collect();
    }

    let chat_types = CHAT_TYPES
        .iter()
        .map(|id| (id.to_string(), chat_type_element(version)))
        .collect();
    let mut packets = vec![
        registry(
            "minecraft:dimension_type",
            vec![(OVERWORLD.into(), dimension_element(version))],
        ),
        registry(
            "minecraft:worldgen/biome",
            vec![(PLAINS.into(), biome_element(version))],
        ),
        registry("minecraft:chat_type", chat_types),
        registry("minecraft:damage_type", damage_types(version)),
        empty_registry("minecraft:trim_pattern"),
        empty_registry("minecraft:trim_material"),
        empty_registry("minecraft:banner_pattern"),
    ];
    packets.extend(variant_registries(version));
    if version >= ProtocolVersion::V1_21 {
        packets.push(empty_registry("minecraft:enchantment"));
        packets.push(empty_registry("minecraft:jukebox_song"));
    }
    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_ids(version: ProtocolVersion) -> Vec<String> {
        registry_packets(version)
            .into_iter()
            .filter_map(|packet| match packet {
                RegistryData::Registry { registry_id, .. } => Some(registry_id),
                RegistryData::Codec(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_codec_presence() {
        assert!(dimension_codec(ProtocolVersion::V1_15_2).is_none());
        assert!(dimension_codec(ProtocolVersion::V1_16).is_some());
        assert!(dimension_codec(ProtocolVersion::V1_20_3).is_some());
        assert!(dimension_codec(ProtocolVersion::V1_20_5).is_none());
    }

    #[test]
    fn test_old_codec_shape() {
        let codec = dimension_codec(ProtocolVersion::V1_16_1).unwrap();
        let Some(NbtValue::List(dimensions)) = codec.get("dimension") else {
            panic!("missing dimension list");
        };
        assert_eq!(dimensions[0].get("name"), Some(&NbtValue::from(OVERWORLD)));
    }

    #[test]
    fn test_codec_registries_by_version() {
        let codec = dimension_codec(ProtocolVersion::V1_18_2).unwrap();
        assert!(codec.get("minecraft:chat_type").is_none());

        let codec = dimension_codec(ProtocolVersion::V1_19).unwrap();
        assert!(codec.get("minecraft:chat_type").is_some());
        assert!(codec.get("minecraft:damage_type").is_none());

        let codec = dimension_codec(ProtocolVersion::V1_19_4).unwrap();
        assert!(codec.get("minecraft:damage_type").is_some());
    }

    #[test]
    fn test_dimension_element_fields() {
        let old = dimension_element(ProtocolVersion::V1_16_2);
        assert!(old.get("min_y").is_none());
        assert_eq!(
            old.get("infiniburn"),
            Some(&NbtValue::from("minecraft:infiniburn_overworld"))
        );

        let new = dimension_element(ProtocolVersion::V1_19);
        assert_eq!(new.get("min_y"), Some(&NbtValue::Int(-64)));
        assert_eq!(
            new.get("infiniburn"),
            Some(&NbtValue::from("#minecraft:infiniburn_overworld"))
        );
        assert!(new.get("monster_spawn_light_level").is_some());
    }

    #[test]
    fn test_biome_precipitation_field() {
        assert!(biome_element(ProtocolVersion::V1_19_3).get("precipitation").is_some());
        assert!(biome_element(ProtocolVersion::V1_19_4).get("has_precipitation").is_some());
        assert!(biome_element(ProtocolVersion::V1_17).get("depth").is_some());
        assert!(biome_element(ProtocolVersion::V1_19).get("category").is_none());
    }

    #[test]
    fn test_registry_packets() {
        assert!(registry_packets(ProtocolVersion::V1_20).is_empty());

        let single = registry_packets(ProtocolVersion::V1_20_2);
        assert!(matches!(single.as_slice(), [RegistryData::Codec(_)]));

        let ids = registry_ids(ProtocolVersion::V1_21);
        assert_eq!(ids[0], "minecraft:dimension_type");
        assert!(ids.contains(&"minecraft:enchantment".to_string()));
        assert!(!ids.contains(&"minecraft:pig_variant".to_string()));

        let ids = registry_ids(ProtocolVersion::V1_21_5);
        assert!(ids.contains(&"minecraft:pig_variant".to_string()));
        assert!(ids.contains(&"minecraft:wolf_sound_variant".to_string()));
    }
}
