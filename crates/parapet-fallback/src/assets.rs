//! Everything a session sends that does not depend on the player, built once per settings.
//!
//! A configuration reload builds a fresh [`PreparedAssets`] and swaps the `Arc`; sessions
//! already running keep the instance they started with.

use crate::gravity::GravityOracle;
use crate::settings::FallbackSettings;
use parapet_protocol::dimension::registry_packets;
use parapet_protocol::*;
use parapet_types::{BlockPos, GameMode, TextComponent};
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Horizontal center of the platform chunk.
pub const SPAWN_X: f64 = 8.0;
pub const SPAWN_Z: f64 = 8.0;
/// Width of the square collision platform, in blocks.
pub const PLATFORM_WIDTH: i32 = 8;
/// Inventory slot for the CAPTCHA map: off hand on 1.9+, first hotbar slot before.
pub const OFFHAND_SLOT: i16 = 40;
pub const HOTBAR_SLOT: i16 = 36;
/// Client ticks per second.
pub const TICKS_PER_SECOND: usize = 20;

pub type Snapshot = Arc<PacketSnapshot>;

#[derive(Debug, Error)]
pub enum AssetsError {
    #[error("invalid {field} pattern: {source}")]
    Regex {
        field: &'static str,
        source: regex::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, AssetsError> {
    Regex::new(pattern).map_err(|source| AssetsError::Regex { field, source })
}

fn snapshot(cache: &mut SnapshotCache, packet: impl Into<Packet>) -> Snapshot {
    Arc::new(cache.snapshot(packet))
}

fn chat(cache: &mut SnapshotCache, message: &str) -> Option<Snapshot> {
    if message.is_empty() {
        None
    } else {
        Some(Arc::new(cache.snapshot(SystemChat::chat(TextComponent::plain(message)))))
    }
}

fn kick(cache: &mut SnapshotCache, message: &str, during_login: bool) -> Snapshot {
    Arc::new(cache.snapshot(Disconnect::new(TextComponent::plain(message), during_login)))
}

/// Disconnects handed out by the login gate, before any session exists.
#[derive(Debug)]
pub struct GateMessages {
    pub unsupported_version: Snapshot,
    pub already_verifying: Snapshot,
    pub blacklisted: Snapshot,
    pub too_fast_reconnect: Snapshot,
    pub already_queued: Snapshot,
    pub invalid_username: Snapshot,
    /// Sent to players that were already verified.
    pub verified: Snapshot,
}

#[derive(Debug)]
pub struct PreparedAssets {
    pub settings: FallbackSettings,
    pub registry: PacketRegistry,
    pub oracle: GravityOracle,
    pub entity_id: i32,
    /// Height the player is parked at while solving the CAPTCHA.
    pub captcha_y: i32,
    pub captcha_keep_alive_id: i64,
    /// Session ceiling on decoded packets.
    pub max_packets: usize,
    /// Decoder ceiling on frames, registered or not.
    pub max_frames: usize,

    pub name_regex: Regex,
    pub locale_regex: Regex,
    pub brand_regex: Regex,

    pub gate: GateMessages,

    pub join_game: Snapshot,
    pub creative_abilities: Snapshot,
    pub default_spawn: Snapshot,
    pub start_chunks: Snapshot,
    pub empty_chunk: Snapshot,
    pub platform: Snapshot,
    pub update_time: Option<Snapshot>,
    pub welcome: Option<Snapshot>,

    pub enter_code: Snapshot,
    pub incorrect_code: Snapshot,
    pub offhand_map: Snapshot,
    pub hotbar_map: Snapshot,
    pub captcha_position: Snapshot,
    pub no_move_abilities: Snapshot,
    pub captcha_keep_alive: Snapshot,
    pub xp_countdown: Vec<Snapshot>,
    pub currently_preparing: Snapshot,

    pub success: Snapshot,
    pub transfer: Option<Snapshot>,
    registry_data: Vec<Vec<Snapshot>>,
}

impl PreparedAssets {
    /// Build with a random platform height.
    pub fn build(settings: FallbackSettings) -> Result<Self, AssetsError> {
        let platform_y = rand::thread_rng().gen_range(1..=255);
        Self::build_with(settings, platform_y)
    }

    pub fn build_with(settings: FallbackSettings, platform_y: i32) -> Result<Self, AssetsError> {
        let mut rng = rand::thread_rng();
        let registry = PacketRegistry::build()?;
        let oracle = GravityOracle::new(settings.gravity.max_movement_ticks, platform_y);
        let messages = &settings.messages;
        let mut cache = SnapshotCache::new();

        let gate = GateMessages {
            unsupported_version: kick(&mut cache, &messages.unsupported_version, true),
            already_verifying: kick(&mut cache, &messages.already_verifying, true),
            blacklisted: kick(&mut cache, &messages.blacklisted, true),
            too_fast_reconnect: kick(&mut cache, &messages.too_fast_reconnect, true),
            already_queued: kick(&mut cache, &messages.already_queued, true),
            invalid_username: kick(&mut cache, &messages.invalid_username, true),
            verified: kick(&mut cache, &messages.verification_success, true),
        };

        let entity_id = rng.gen_range(1..i32::MAX);
        let mut join = JoinGame::new(entity_id, settings.game_mode);
        join.hashed_seed = rng.gen();

        let spawn = BlockPos::new(SPAWN_X as i32, oracle.spawn_y(), SPAWN_Z as i32);
        let offset = PLATFORM_WIDTH / 2;
        let mut blocks = Vec::with_capacity((PLATFORM_WIDTH * PLATFORM_WIDTH) as usize);
        for x in 0..PLATFORM_WIDTH {
            for z in 0..PLATFORM_WIDTH {
                let pos = BlockPos::new(x + offset, platform_y, z + offset);
                blocks.push(BlockUpdate::new(pos, STONE_BLOCK_ID));
            }
        }
        let platform = UpdateSectionBlocks {
            section_x: 0,
            section_y: platform_y >> 4,
            section_z: 0,
            blocks,
        };

        let update_time = (settings.time_of_day >= 0).then(|| {
            snapshot(&mut cache, UpdateTime {
                world_age: 0,
                time_of_day: settings.time_of_day,
            })
        });

        let captcha_y = 1000 + rng.gen_range(0..338);
        let captcha_keep_alive_id = rng.gen_range(1..i32::MAX) as i64;
        let countdown_len = (settings.captcha.max_duration_ms / 1000) as usize;
        let xp_countdown = (0..countdown_len)
            .map(|i| {
                snapshot(&mut cache, SetExperience {
                    bar: i as f32 / countdown_len as f32,
                    level: i as i32,
                    total: 0,
                })
            })
            .collect();

        let max_ticks = settings.gravity.max_movement_ticks as usize;
        let captcha_packets = if settings.captcha_reachable() {
            // Positions and tick ends for the whole CAPTCHA window, plus the answers
            countdown_len * (TICKS_PER_SECOND + 1) + settings.captcha.max_tries as usize
        } else {
            0
        };
        let max_packets = (oracle.ticks() + max_ticks + 2) * 2 + 5 + captcha_packets
            + settings.packet_margin;
        let max_frames = max_packets + settings.packet_margin;

        let mut registry_data = Vec::with_capacity(ProtocolVersion::ALL.len());
        for &version in ProtocolVersion::ALL {
            registry_data.push(
                registry_packets(version)
                    .into_iter()
                    .map(|packet| Arc::new(cache.between(packet, version, version)))
                    .collect(),
            );
        }

        let transfer = settings.transfer.as_ref().map(|target| {
            Arc::new(cache.since(
                Transfer {
                    host: target.host.clone(),
                    port: target.port,
                },
                ProtocolVersion::V1_20_5,
            ))
        });

        let assets = Self {
            name_regex: compile("name", &settings.valid_name_regex)?,
            locale_regex: compile("locale", &settings.valid_locale_regex)?,
            brand_regex: compile("brand", &settings.brand.valid_regex)?,
            gate,
            join_game: snapshot(&mut cache, join),
            creative_abilities: snapshot(&mut cache, PlayerAbilities::new(
                PlayerAbilities::CREATIVE | PlayerAbilities::ALLOW_FLYING,
            )),
            default_spawn: Arc::new(cache.since(
                SetDefaultSpawnPosition {
                    pos: spawn,
                    angle: 0.0,
                },
                ProtocolVersion::V1_19_3,
            )),
            start_chunks: Arc::new(cache.since(
                GameEvent {
                    event: GAME_EVENT_START_WAITING_FOR_CHUNKS,
                    value: 0.0,
                },
                ProtocolVersion::V1_20_3,
            )),
            empty_chunk: snapshot(&mut cache, ChunkData {
                chunk_x: 0,
                chunk_z: 0,
            }),
            platform: snapshot(&mut cache, platform),
            update_time,
            welcome: chat(&mut cache, &messages.welcome),
            enter_code: snapshot(&mut cache, SystemChat::chat(TextComponent::plain(&messages.enter_code))),
            incorrect_code: snapshot(&mut cache, SystemChat::chat(TextComponent::plain(
                &messages.incorrect_code,
            ))),
            offhand_map: Arc::new(cache.since(
                SetContainerSlot::filled_map(OFFHAND_SLOT),
                ProtocolVersion::V1_9,
            )),
            hotbar_map: snapshot(&mut cache, SetContainerSlot::filled_map(HOTBAR_SLOT)),
            captcha_position: snapshot(&mut cache, PlayerPositionSync {
                x: SPAWN_X,
                y: captcha_y as f64,
                z: SPAWN_Z,
                yaw: 0.0,
                pitch: 90.0,
                relative_flags: 0,
                teleport_id: 0,
            }),
            no_move_abilities: snapshot(&mut cache, PlayerAbilities {
                flags: PlayerAbilities::FLYING,
                flying_speed: 0.0,
                walking_speed: 0.0,
            }),
            captcha_keep_alive: snapshot(&mut cache, KeepAlive {
                id: captcha_keep_alive_id,
            }),
            xp_countdown,
            currently_preparing: kick(&mut cache, &messages.currently_preparing, false),
            success: kick(&mut cache, &messages.verification_success, false),
            transfer,
            registry_data,
            registry,
            oracle,
            entity_id,
            captcha_y,
            captcha_keep_alive_id,
            max_packets,
            max_frames,
            settings,
        };
        info!(
            "Prepared fallback assets: platform at y {}, spawn at y {}, {} packets max, {} distinct encodings",
            platform_y,
            assets.oracle.spawn_y(),
            assets.max_packets,
            cache.len()
        );
        Ok(assets)
    }

    /// Configuration-phase registry packets for `version`. Empty before 1.20.2.
    pub fn registry_data(&self, version: ProtocolVersion) -> &[Snapshot] {
        version
            .index()
            .and_then(|index| self.registry_data.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The CAPTCHA map item goes to the off hand where there is one.
    pub fn captcha_slot(&self, version: ProtocolVersion) -> Outgoing {
        let slot = if version >= ProtocolVersion::V1_9 {
            &self.offhand_map
        } else {
            &self.hotbar_map
        };
        Outgoing::from(Arc::clone(slot))
    }

    pub fn failure(&self, reason: &str, during_login: bool) -> Disconnect {
        Disconnect::new(
            TextComponent::plain(self.settings.failure_message(reason)),
            during_login,
        )
    }

    pub fn needs_abilities(&self) -> bool {
        self.settings.game_mode == GameMode::Creative
    }
}
