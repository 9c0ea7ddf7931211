//! The per-connection verification state machine.
//!
//! A session is fed decoded packets strictly in arrival order and answers by queueing
//! [`Action`]s. Every check that fails ends the session through a single failure path,
//! except movement failures when the CAPTCHA is configured to absorb them.

use crate::assets::{PreparedAssets, Snapshot, PLATFORM_WIDTH, SPAWN_X, SPAWN_Z, TICKS_PER_SECOND};
use crate::captcha::CaptchaPool;
use crate::collaborators::{Collaborators, VerifiedPlayer};
use crate::failure::FailReason;
use crate::login::Ticket;
use crate::settings::CaptchaTiming;
use bytes::BytesMut;
use parapet_protocol::*;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

const MODERN_BRAND_CHANNEL: &str = "minecraft:brand";
const LEGACY_BRAND_CHANNEL: &str = "MC|Brand";
/// The real client reports itself as lowercase `vanilla`.
const SPOOFED_BRAND: &str = "Vanilla";
/// Teleport id of the CAPTCHA viewing position.
const CAPTCHA_TELEPORT_ID: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoginAck,
    Configure,
    KeepAlive,
    ClientSettings,
    PluginMessage,
    Transaction,
    Teleport,
    Position,
    MapCaptcha,
    Success,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::LoginAck => "waiting for login acknowledgement",
            Stage::Configure => "configuring",
            Stage::KeepAlive => "waiting for keep alive",
            Stage::ClientSettings => "waiting for client settings",
            Stage::PluginMessage => "waiting for client brand",
            Stage::Transaction => "waiting for transaction",
            Stage::Teleport => "waiting for teleport",
            Stage::Position => "checking movement",
            Stage::MapCaptcha => "solving CAPTCHA",
            Stage::Success => "verified",
        }
    }
}

/// Output of a session, applied in order by the connection.
#[derive(Debug)]
pub enum Action {
    /// Encode with the clientbound table of the given state.
    Send(ConnectionState, Outgoing),
    /// Compress every frame written after this one.
    EnableCompression(i32),
    Flush,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Verified,
    Failed,
    /// Ended without a verdict, e.g. no CAPTCHA was ready.
    Closed,
}

#[derive(Debug, Default)]
struct ClientDetails {
    settings: bool,
    brand: bool,
}

impl ClientDetails {
    fn complete(&self) -> bool {
        self.settings && self.brand
    }

    fn started(&self) -> bool {
        self.settings || self.brand
    }
}

#[derive(Debug, Default)]
struct Movement {
    checking: bool,
    can_fall: bool,
    y: f64,
    delta: f64,
    movement_tick: u32,
    fall_tick: usize,
    client_tick: u32,
    /// 1.21.2+ clients move before confirming the teleport.
    buffered: Option<MovePlayerPosRot>,
}

#[derive(Debug)]
struct Captcha {
    answer: String,
    tries_left: u32,
    started: Instant,
    countdown: Option<usize>,
    keep_alive_streak: usize,
}

#[derive(Debug)]
pub struct VerificationSession {
    assets: Arc<PreparedAssets>,
    pool: Arc<CaptchaPool>,
    collaborators: Collaborators,
    ticket: Ticket,
    version: ProtocolVersion,
    stage: Stage,
    status: SessionStatus,
    inbound: ConnectionState,
    outbound: ConnectionState,
    started: Instant,
    packets: usize,
    outbox: Vec<Action>,

    keep_alive_id: Option<i64>,
    registries_sent: bool,
    transaction_id: i32,
    teleport_id: i32,
    details: ClientDetails,
    movement: Movement,
    force_captcha: bool,
    captcha: Option<Captcha>,
}

impl VerificationSession {
    /// Accept the login and queue everything up to the first challenge.
    pub fn start(
        assets: Arc<PreparedAssets>,
        pool: Arc<CaptchaPool>,
        collaborators: Collaborators,
        ticket: Ticket,
        compression: Option<i32>,
        now: Instant,
    ) -> Self {
        let version = ticket.version;
        let mut session = Self {
            assets,
            pool,
            collaborators,
            ticket,
            version,
            stage: Stage::LoginAck,
            status: SessionStatus::Active,
            inbound: ConnectionState::Login,
            outbound: ConnectionState::Login,
            started: now,
            packets: 0,
            outbox: Vec::new(),
            keep_alive_id: None,
            registries_sent: false,
            transaction_id: 0,
            teleport_id: 0,
            details: ClientDetails::default(),
            movement: Movement::default(),
            force_captcha: false,
            captcha: None,
        };

        if let Some(threshold) = compression.filter(|t| *t >= 0) {
            if version >= ProtocolVersion::V1_8 {
                session.send_packet(SetCompression { threshold });
                session.outbox.push(Action::EnableCompression(threshold));
            }
        }
        session.send_packet(LoginSuccess {
            uuid: session.ticket.profile.uuid,
            username: session.ticket.profile.name.clone(),
        });

        if !version.has_configuration() {
            session.switch_state(ConnectionState::Play);
            if version >= ProtocolVersion::V1_8 {
                session.send_keep_alive();
                session.stage = Stage::KeepAlive;
            } else {
                session.send_join();
            }
        }
        session.flush();
        debug!("{} started verification on {}", session.username(), version);
        session
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn username(&self) -> &str {
        &self.ticket.profile.name
    }

    /// Table the next inbound frame must be decoded with.
    pub fn inbound_state(&self) -> ConnectionState {
        self.inbound
    }

    pub fn assets(&self) -> &Arc<PreparedAssets> {
        &self.assets
    }

    #[cfg(test)]
    pub(crate) fn teleport_id(&self) -> i32 {
        self.teleport_id
    }

    /// Take the queued actions.
    pub fn drain(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.outbox)
    }

    pub fn receive(&mut self, packet: Packet) -> SessionStatus {
        self.receive_at(packet, Instant::now())
    }

    pub fn receive_at(&mut self, packet: Packet, now: Instant) -> SessionStatus {
        if self.status != SessionStatus::Active {
            return self.status;
        }
        if let Err(reason) = self.handle(packet, now) {
            self.fail(reason, now);
        }
        self.status
    }

    /// End the session because of an error outside the state machine, such as a bad frame.
    pub fn abort(&mut self, reason: FailReason, now: Instant) -> SessionStatus {
        if self.status == SessionStatus::Active {
            self.fail(reason, now);
        }
        self.status
    }

    // === Dispatch ===

    fn handle(&mut self, packet: Packet, now: Instant) -> Result<(), FailReason> {
        self.packets += 1;
        if self.packets > self.assets.max_packets {
            return Err(FailReason::TooManyPackets(self.packets));
        }
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed > Duration::from_millis(self.assets.settings.max_session_ms) {
            return Err(FailReason::TimeLimit(elapsed.as_millis()));
        }
        if let Some(captcha) = &self.captcha {
            let limit = Duration::from_millis(self.assets.settings.captcha.max_duration_ms);
            if now.saturating_duration_since(captcha.started) > limit {
                return Err(FailReason::CaptchaTimeout);
            }
        }

        match packet {
            Packet::ClientTickEnd(_) => {
                self.movement.client_tick += 1;
                Ok(())
            }
            Packet::LoginAcknowledged(_) => self.login_acknowledged(),
            Packet::KeepAlive(keep_alive) => self.keep_alive(keep_alive.id),
            Packet::ClientInformation(info) => self.client_information(info),
            Packet::PluginMessage(message) => self.plugin_message(message),
            Packet::FinishConfiguration(_) => self.finish_configuration(),
            Packet::Transaction(transaction) => self.transaction(transaction),
            Packet::ConfirmTeleportation(confirm) => self.confirm_teleport(confirm.teleport_id, now),
            Packet::MovePlayerPosRot(p) => {
                if self.stage == Stage::Teleport && self.version >= ProtocolVersion::V1_21_2 {
                    self.movement.buffered = Some(p);
                    return Ok(());
                }
                self.moved(p.x, p.y, p.z, p.on_ground, true, now)
            }
            Packet::MovePlayerPos(p) => self.moved(p.x, p.y, p.z, p.on_ground, false, now),
            Packet::MovePlayerRot(p) => self.ground_claim(p.on_ground),
            Packet::MovePlayerStatus(p) => self.ground_claim(p.on_ground),
            Packet::ChatMessage(chat) => self.chat(chat.message, now),
            other => Err(self.unexpected(other.kind())),
        }
    }

    fn unexpected(&self, kind: PacketKind) -> FailReason {
        FailReason::UnexpectedPacket {
            packet: kind.name(),
            state: self.stage.name(),
        }
    }

    // === Login and configuration ===

    fn login_acknowledged(&mut self) -> Result<(), FailReason> {
        if self.stage != Stage::LoginAck {
            return Err(self.unexpected(PacketKind::LoginAcknowledged));
        }
        self.switch_state(ConnectionState::Configuration);
        self.send_keep_alive();
        self.flush();
        self.stage = Stage::Configure;
        Ok(())
    }

    fn keep_alive(&mut self, id: i64) -> Result<(), FailReason> {
        match self.stage {
            Stage::Configure | Stage::KeepAlive => {
                let expected = self
                    .keep_alive_id
                    .take()
                    .ok_or_else(|| self.unexpected(PacketKind::KeepAlive))?;
                if id != expected {
                    return Err(FailReason::KeepAliveMismatch {
                        expected,
                        actual: id,
                    });
                }
                if self.stage == Stage::Configure {
                    self.send_registries();
                } else {
                    self.send_join();
                }
                self.flush();
                Ok(())
            }
            Stage::MapCaptcha if id == self.assets.captcha_keep_alive_id => Ok(()),
            Stage::MapCaptcha => Err(FailReason::KeepAliveMismatch {
                expected: self.assets.captcha_keep_alive_id,
                actual: id,
            }),
            _ => Err(self.unexpected(PacketKind::KeepAlive)),
        }
    }

    fn send_registries(&mut self) {
        let assets = Arc::clone(&self.assets);
        for registry in assets.registry_data(self.version) {
            self.send(registry);
        }
        self.send_packet(FinishConfiguration);
        self.registries_sent = true;
    }

    fn finish_configuration(&mut self) -> Result<(), FailReason> {
        if self.stage != Stage::Configure || !self.registries_sent {
            return Err(self.unexpected(PacketKind::FinishConfiguration));
        }
        if !self.details.settings {
            return Err(FailReason::MissingClientDetails("client settings"));
        }
        if !self.details.brand {
            return Err(FailReason::MissingClientDetails("client brand"));
        }
        self.switch_state(ConnectionState::Play);
        self.send_keep_alive();
        self.flush();
        self.stage = Stage::KeepAlive;
        Ok(())
    }

    // === Client details ===

    fn client_information(&mut self, info: ClientInformation) -> Result<(), FailReason> {
        if !self.assets.locale_regex.is_match(&info.locale) {
            return Err(FailReason::InvalidLocale(info.locale));
        }
        if info.view_distance < 2 {
            return Err(FailReason::ViewDistance(info.view_distance));
        }
        self.details.settings = true;
        self.advance_details();
        Ok(())
    }

    fn plugin_message(&mut self, message: PluginMessage) -> Result<(), FailReason> {
        let expected = if self.version >= ProtocolVersion::V1_13 {
            MODERN_BRAND_CHANNEL
        } else {
            LEGACY_BRAND_CHANNEL
        };
        if message.channel != expected {
            if message.channel == MODERN_BRAND_CHANNEL || message.channel == LEGACY_BRAND_CHANNEL {
                return Err(FailReason::InvalidBrand(format!(
                    "brand on channel {}",
                    message.channel
                )));
            }
            return Ok(());
        }

        if self.assets.settings.brand.enabled {
            if self.details.brand {
                return Err(FailReason::Duplicate("client brand"));
            }
            self.validate_brand(message.data)?;
        }
        self.details.brand = true;
        self.advance_details();
        Ok(())
    }

    fn validate_brand(&self, data: Vec<u8>) -> Result<(), FailReason> {
        let max_length = self.assets.settings.brand.max_length;
        if data.len() <= 1 {
            return Err(FailReason::InvalidBrand("too short".into()));
        }
        if data.len() >= max_length {
            return Err(FailReason::InvalidBrand(format!("{} bytes", data.len())));
        }

        let brand = if self.version >= ProtocolVersion::V1_8 {
            let mut buf = BytesMut::from(&data[..]);
            let brand = read_string(&mut buf, max_length)
                .map_err(|e| FailReason::InvalidBrand(e.to_string()))?;
            if !buf.is_empty() {
                return Err(FailReason::InvalidBrand("trailing data".into()));
            }
            brand
        } else {
            String::from_utf8(data).map_err(|e| FailReason::InvalidBrand(e.to_string()))?
        };

        if brand == SPOOFED_BRAND {
            return Err(FailReason::InvalidBrand(brand));
        }
        if !self.assets.brand_regex.is_match(&brand) {
            return Err(FailReason::InvalidBrand(brand));
        }
        Ok(())
    }

    /// Settings and brand arrive in either order; the transaction waits for both.
    fn advance_details(&mut self) {
        if !matches!(self.stage, Stage::ClientSettings | Stage::PluginMessage) {
            return;
        }
        if self.details.complete() {
            self.send_challenge();
            self.flush();
        } else if self.details.started() {
            self.stage = Stage::PluginMessage;
        }
    }

    // === World and challenges ===

    fn send_join(&mut self) {
        let assets = Arc::clone(&self.assets);
        self.send(&assets.join_game);
        if assets.needs_abilities() {
            self.send(&assets.creative_abilities);
        }
        if self.version >= ProtocolVersion::V1_19_3 {
            self.send(&assets.default_spawn);
        }
        if self.version >= ProtocolVersion::V1_20_3 {
            self.send(&assets.start_chunks);
        }
        self.send(&assets.empty_chunk);
        if assets.settings.gravity.check_collisions {
            self.send(&assets.platform);
        }
        if let Some(update_time) = &assets.update_time {
            self.send(update_time);
        }

        self.stage = Stage::ClientSettings;
        if self.details.complete() {
            self.send_challenge();
        } else if self.details.started() {
            self.stage = Stage::PluginMessage;
        }
    }

    /// Transaction plus the teleport to the drop height, in one batch.
    ///
    /// The client answers the transaction before it processes the teleport, so movement
    /// arriving before the answer predates the teleport and is ignored.
    fn send_challenge(&mut self) {
        let mut rng = rand::thread_rng();
        self.transaction_id = -rng.gen_range(1..i16::MAX as i32);
        self.teleport_id = rng.gen_range(1..i32::MAX);
        self.send_packet(Transaction::new(self.transaction_id));
        self.send_packet(PlayerPositionSync {
            x: SPAWN_X,
            y: self.assets.oracle.spawn_y() as f64,
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: 0.0,
            relative_flags: 0,
            teleport_id: self.teleport_id,
        });
        self.stage = Stage::Transaction;
    }

    fn transaction(&mut self, transaction: Transaction) -> Result<(), FailReason> {
        if self.stage != Stage::Transaction {
            return Err(self.unexpected(PacketKind::Transaction));
        }
        if transaction.window_id != 0 {
            return Err(FailReason::WrongWindow(transaction.window_id));
        }
        if !transaction.accepted {
            return Err(FailReason::TransactionRejected);
        }
        if transaction.id != self.transaction_id {
            return Err(FailReason::TransactionMismatch {
                expected: self.transaction_id,
                actual: transaction.id,
            });
        }
        // No teleport confirmation before 1.9; the first position confirms it.
        self.stage = if self.version >= ProtocolVersion::V1_9 {
            Stage::Teleport
        } else {
            Stage::Position
        };
        Ok(())
    }

    fn confirm_teleport(&mut self, id: i32, now: Instant) -> Result<(), FailReason> {
        match self.stage {
            Stage::Teleport => {
                if id != self.teleport_id {
                    return Err(FailReason::TeleportMismatch {
                        expected: self.teleport_id,
                        actual: id,
                    });
                }
                self.stage = Stage::Position;
                if self.version >= ProtocolVersion::V1_21_2 {
                    let p = self.movement.buffered.take().ok_or(FailReason::MovementOrder)?;
                    return self.moved(p.x, p.y, p.z, p.on_ground, true, now);
                }
                Ok(())
            }
            Stage::Position => Err(FailReason::Duplicate("teleport confirmation")),
            Stage::MapCaptcha if id == CAPTCHA_TELEPORT_ID => Ok(()),
            Stage::MapCaptcha => Err(FailReason::TeleportMismatch {
                expected: CAPTCHA_TELEPORT_ID,
                actual: id,
            }),
            _ => Err(self.unexpected(PacketKind::ConfirmTeleportation)),
        }
    }

    // === Movement ===

    fn moved(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
        rotated: bool,
        now: Instant,
    ) -> Result<(), FailReason> {
        match self.stage {
            // The client ticks while loading terrain; nothing to check until it has been moved.
            Stage::KeepAlive | Stage::ClientSettings | Stage::PluginMessage | Stage::Transaction => {
                Ok(())
            }
            Stage::Teleport => Err(FailReason::MovementOrder),
            Stage::Position => self.check_movement(x, y, z, on_ground, rotated, now),
            Stage::MapCaptcha => {
                self.captcha_tick(now);
                Ok(())
            }
            _ => Err(self.unexpected(if rotated {
                PacketKind::MovePlayerPosRot
            } else {
                PacketKind::MovePlayerPos
            })),
        }
    }

    /// A packet without a position may not report landing while the fall is being checked.
    fn ground_claim(&self, on_ground: bool) -> Result<(), FailReason> {
        if on_ground && self.stage == Stage::Position && self.movement.checking {
            return Err(FailReason::GroundWithoutPosition);
        }
        Ok(())
    }

    fn check_movement(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
        rotated: bool,
        now: Instant,
    ) -> Result<(), FailReason> {
        let assets = Arc::clone(&self.assets);
        let gravity = &assets.settings.gravity;
        let oracle = &assets.oracle;

        if !self.movement.checking {
            if !gravity.enabled && !gravity.check_collisions {
                self.movement_passed(now);
                return Ok(());
            }
            if !rotated {
                return Err(FailReason::MovementOrder);
            }
            if on_ground {
                return Err(FailReason::GroundOnTeleport);
            }
            if x != SPAWN_X || z != SPAWN_Z {
                return Err(FailReason::IllegalPosition { x, z });
            }
            self.movement.y = oracle.spawn_y() as f64;
            self.movement.checking = true;
            if let Some(welcome) = &assets.welcome {
                self.send(welcome);
                self.flush();
            }
            return Ok(());
        }

        self.movement.delta = y - self.movement.y;
        self.movement.y = y;
        let delta = self.movement.delta;

        if y < oracle.platform_y() as f64 {
            return Err(FailReason::FellThrough(y));
        }
        let width = PLATFORM_WIDTH as f64;
        if (x.abs() - width).abs() >= width || (z.abs() - width).abs() >= width {
            return Err(FailReason::IllegalPosition { x, z });
        }
        if self.version >= ProtocolVersion::V1_21_2
            && self.movement.client_tick < self.movement.movement_tick
        {
            return Err(FailReason::Ticking {
                client: self.movement.client_tick,
                movement: self.movement.movement_tick,
            });
        }

        if !on_ground {
            if delta == 0.0 {
                // First position after the teleport; falling starts with the next one.
                if !rotated {
                    return Err(FailReason::MovementOrder);
                }
                if self.movement.movement_tick != 0 {
                    return Err(FailReason::UnexpectedMotion(delta));
                }
                if self.version < ProtocolVersion::V1_8 {
                    self.movement.movement_tick += 1;
                }
                self.movement.can_fall = true;
                return Ok(());
            }
            if !self.movement.can_fall {
                return Err(FailReason::UnexpectedMotion(delta));
            }

            self.movement.movement_tick += 1;
            self.movement.fall_tick += 1;
            if gravity.enabled {
                let expected = oracle
                    .delta(self.movement.fall_tick)
                    .ok_or(FailReason::FellThrough(y))?;
                if (delta - expected).abs() > gravity.epsilon {
                    return Err(FailReason::Gravity {
                        expected,
                        actual: delta,
                        y,
                    });
                }
                if !gravity.check_collisions
                    && self.movement.movement_tick >= gravity.max_movement_ticks
                {
                    self.movement_passed(now);
                }
            }
            Ok(())
        } else if gravity.check_collisions {
            self.movement.movement_tick += 1;
            if gravity.enabled && self.movement.movement_tick < gravity.max_movement_ticks {
                return Err(FailReason::CollisionTick {
                    tick: self.movement.movement_tick,
                    required: gravity.max_movement_ticks,
                });
            }
            let offset = oracle.collide_y() as f64 - y;
            if offset.abs() > gravity.collision_tolerance {
                return Err(FailReason::CollisionOffset(offset));
            }
            self.movement_passed(now);
            Ok(())
        } else {
            Ok(())
        }
    }

    fn movement_passed(&mut self, now: Instant) {
        if self.force_captcha || self.assets.settings.captcha.timing == CaptchaTiming::Always {
            self.start_captcha(now);
        } else {
            self.succeed(now);
        }
    }

    // === CAPTCHA ===

    fn start_captcha(&mut self, now: Instant) {
        let Some(entry) = self.pool.take_random() else {
            debug!("No CAPTCHA ready for {}", self.username());
            let preparing = Arc::clone(&self.assets.currently_preparing);
            self.send(&preparing);
            self.close(SessionStatus::Closed);
            return;
        };

        let assets = Arc::clone(&self.assets);
        self.push(assets.captcha_slot(self.version));
        if self.version >= ProtocolVersion::V1_8 {
            self.send_packet(MapData::full(0, entry.image.to_vec()));
        } else {
            for column in MapData::legacy_columns(0, &entry.image) {
                self.send_packet(column);
            }
        }
        self.send(&assets.captcha_position);
        self.send(&assets.no_move_abilities);
        self.send(&assets.enter_code);
        self.flush();

        self.captcha = Some(Captcha {
            answer: entry.answer,
            tries_left: assets.settings.captcha.max_tries,
            started: now,
            countdown: None,
            keep_alive_streak: 0,
        });
        self.stage = Stage::MapCaptcha;
    }

    fn chat(&mut self, message: String, now: Instant) -> Result<(), FailReason> {
        if self.stage != Stage::MapCaptcha {
            return Err(self.unexpected(PacketKind::ChatMessage));
        }
        let Some(captcha) = self.captcha.as_mut() else {
            return Err(FailReason::Duplicate("CAPTCHA answer"));
        };
        if message == captcha.answer {
            self.succeed(now);
            return Ok(());
        }
        captcha.tries_left = captcha.tries_left.saturating_sub(1);
        if captcha.tries_left == 0 {
            return Err(FailReason::CaptchaAttempts);
        }
        let incorrect = Arc::clone(&self.assets.incorrect_code);
        self.send(&incorrect);
        self.flush();
        Ok(())
    }

    /// Countdown and keep-alive, driven by the roughly once-per-second idle position packets.
    fn captcha_tick(&mut self, now: Instant) {
        let assets = Arc::clone(&self.assets);
        let Some(captcha) = self.captcha.as_mut() else {
            return;
        };
        let mut queued: Vec<&Snapshot> = Vec::new();

        if assets.settings.game_mode.is_survival_or_adventure() {
            let elapsed = now.saturating_duration_since(captcha.started).as_millis() as u64;
            let remaining = assets.settings.captcha.max_duration_ms.saturating_sub(elapsed);
            let index = (remaining / 1000) as usize;
            if captcha.countdown != Some(index) {
                if let Some(step) = assets.xp_countdown.get(index) {
                    queued.push(step);
                }
            }
            captcha.countdown = Some(index);
        }

        captcha.keep_alive_streak += 1;
        if captcha.keep_alive_streak >= TICKS_PER_SECOND {
            captcha.keep_alive_streak = 0;
            queued.push(&assets.captcha_keep_alive);
        }

        if !queued.is_empty() {
            for snapshot in queued {
                self.send(snapshot);
            }
            self.flush();
        }
    }

    // === Outcomes ===

    fn succeed(&mut self, now: Instant) {
        if self.stage == Stage::Success {
            return;
        }
        self.stage = Stage::Success;
        let elapsed = now.saturating_duration_since(self.started);
        let player = VerifiedPlayer {
            address: self.ticket.address,
            username: self.ticket.profile.name.clone(),
            uuid: self.ticket.profile.uuid,
            verified_at: SystemTime::now(),
        };
        self.collaborators.verified.add(player.clone());
        self.collaborators.observer.on_success(&player, elapsed);
        info!(
            "{} has been verified successfully ({} ms)",
            player.username,
            elapsed.as_millis()
        );

        let assets = Arc::clone(&self.assets);
        match &assets.transfer {
            Some(transfer) if self.version >= ProtocolVersion::V1_20_5 => self.send(transfer),
            _ => self.send(&assets.success),
        }
        self.close(SessionStatus::Verified);
    }

    fn fail(&mut self, reason: FailReason, now: Instant) {
        if reason.is_gravity()
            && self.stage == Stage::Position
            && self.assets.settings.gravity.captcha_on_fail
        {
            debug!("{} failed movement, showing CAPTCHA: {}", self.username(), reason);
            self.force_captcha = true;
            self.start_captcha(now);
            return;
        }

        let address = self.ticket.address;
        info!(
            "{} ({}) has failed the verification on {}: {}",
            self.username(),
            address,
            self.version.name(),
            reason
        );
        self.collaborators
            .observer
            .on_failure(self.username(), address, &reason);
        if self.collaborators.blacklist.record_failure(address) {
            self.collaborators.observer.on_blacklisted(address);
            info!("{} ({}) has been blacklisted", self.username(), address);
        }

        let during_login = self.outbound == ConnectionState::Login;
        let disconnect = self.assets.failure(&reason.to_string(), during_login);
        self.send_packet(disconnect);
        self.close(SessionStatus::Failed);
    }

    // === Output ===

    fn switch_state(&mut self, state: ConnectionState) {
        self.inbound = state;
        self.outbound = state;
    }

    fn push(&mut self, outgoing: Outgoing) {
        self.outbox.push(Action::Send(self.outbound, outgoing));
    }

    fn send(&mut self, snapshot: &Snapshot) {
        self.push(Outgoing::from(Arc::clone(snapshot)));
    }

    fn send_packet(&mut self, packet: impl Into<Packet>) {
        self.push(Outgoing::packet(packet));
    }

    fn send_keep_alive(&mut self) {
        let id = rand::thread_rng().gen_range(1..i32::MAX) as i64;
        self.keep_alive_id = Some(id);
        self.send_packet(KeepAlive { id });
    }

    fn flush(&mut self) {
        self.outbox.push(Action::Flush);
    }

    fn close(&mut self, status: SessionStatus) {
        self.flush();
        self.outbox.push(Action::Close);
        self.status = status;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::captcha::{CaptchaError, CaptchaRenderer, IMAGE_LEN};
    use crate::collaborators::{
        Blacklist, MemoryBlacklist, MemoryVerifiedStore, VerificationStats, VerifiedStore,
    };
    use crate::login::{GateDecision, LoginGate};
    use crate::settings::{CaptchaSettings, FallbackSettings, TransferTarget};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 7));

    pub(crate) struct Flat;

    impl CaptchaRenderer for Flat {
        fn render(&self, _answer: &str) -> Result<Vec<u8>, CaptchaError> {
            Ok(vec![34; IMAGE_LEN])
        }
    }

    pub(crate) struct Harness {
        pub assets: Arc<PreparedAssets>,
        pub pool: Arc<CaptchaPool>,
        pub gate: LoginGate,
        pub verified: Arc<MemoryVerifiedStore>,
        pub stats: Arc<VerificationStats>,
        pub blacklist: Arc<MemoryBlacklist>,
        logins: AtomicUsize,
    }

    impl Harness {
        pub fn new(settings: FallbackSettings) -> Self {
            let mut settings = settings;
            settings.reconnect_delay_ms = 0;
            let mut collaborators = Collaborators::in_memory(&settings);
            let verified = Arc::new(MemoryVerifiedStore::default());
            let stats = Arc::new(VerificationStats::default());
            let blacklist = Arc::new(MemoryBlacklist::new(settings.blacklist_threshold));
            collaborators.verified = verified.clone();
            collaborators.observer = stats.clone();
            collaborators.blacklist = blacklist.clone();

            let pool = Arc::new(CaptchaPool::new(Arc::new(Flat)));
            pool.fill(&CaptchaSettings {
                precompute: 10,
                ..settings.captcha.clone()
            });
            Self {
                assets: Arc::new(PreparedAssets::build_with(settings, 70).unwrap()),
                pool,
                gate: LoginGate::new(collaborators),
                verified,
                stats,
                blacklist,
                logins: AtomicUsize::new(0),
            }
        }

        /// Admit a fresh username and start its session.
        pub fn session(&self, version: ProtocolVersion, now: Instant) -> VerificationSession {
            let username = format!("Tester{}", self.logins.fetch_add(1, Ordering::Relaxed));
            let ticket = match self.gate.check(&self.assets, ADDR, version, &username) {
                GateDecision::Verify(ticket) => ticket,
                other => panic!("not admitted: {:?}", other),
            };
            VerificationSession::start(
                Arc::clone(&self.assets),
                Arc::clone(&self.pool),
                self.gate.collaborators().clone(),
                ticket,
                None,
                now,
            )
        }
    }

    /// Packets a vanilla client sends, driven by what the session queued.
    pub(crate) struct Client {
        pub version: ProtocolVersion,
        keep_alive: Option<i64>,
        transaction: Option<i32>,
        teleport: Option<i32>,
    }

    impl Client {
        pub fn new(version: ProtocolVersion) -> Self {
            Self {
                version,
                keep_alive: None,
                transaction: None,
                teleport: None,
            }
        }

        /// Remember challenge tokens from queued packets.
        pub fn observe(&mut self, actions: &[Action]) {
            for action in actions {
                if let Action::Send(_, Outgoing::Packet(packet)) = action {
                    match packet {
                        Packet::KeepAlive(k) => self.keep_alive = Some(k.id),
                        Packet::Transaction(t) => self.transaction = Some(t.id),
                        Packet::PlayerPositionSync(p) => self.teleport = Some(p.teleport_id),
                        _ => {}
                    }
                }
            }
        }

        pub fn keep_alive(&mut self) -> Packet {
            KeepAlive {
                id: self.keep_alive.take().unwrap(),
            }
            .into()
        }

        pub fn transaction(&mut self) -> Packet {
            let mut transaction = Transaction::new(self.transaction.take().unwrap());
            transaction.accepted = true;
            transaction.into()
        }

        pub fn confirm(&mut self) -> Packet {
            ConfirmTeleportation {
                teleport_id: self.teleport.take().unwrap(),
            }
            .into()
        }

        /// Position packets of a legitimate fall onto the platform.
        pub fn fall(&self, assets: &PreparedAssets) -> Vec<Packet> {
            let oracle = &assets.oracle;
            let spawn = oracle.spawn_y() as f64;
            let collide = oracle.collide_y() as f64;
            let modern = self.version >= ProtocolVersion::V1_21_2;
            let mut packets = Vec::new();
            let mut push = |packet: Packet| {
                packets.push(packet);
                if modern {
                    packets.push(ClientTickEnd.into());
                }
            };

            if !modern {
                // Teleport response
                push(MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, false).into());
            }
            push(MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, false).into());
            for y in oracle.trajectory().skip(1) {
                if y <= collide {
                    break;
                }
                push(MovePlayerPos::new(SPAWN_X, y, SPAWN_Z, false).into());
            }
            push(MovePlayerPos::new(SPAWN_X, collide, SPAWN_Z, true).into());
            packets
        }

        /// 1.21.2+ sends its teleport response before the confirmation.
        pub fn buffered_response(&self, assets: &PreparedAssets) -> Packet {
            let spawn = assets.oracle.spawn_y() as f64;
            MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, false).into()
        }
    }

    pub(crate) fn settings() -> Packet {
        ClientInformation::vanilla("en_us", 10).into()
    }

    pub(crate) fn brand(version: ProtocolVersion) -> Packet {
        PluginMessage::brand(version, "vanilla").into()
    }

    fn feed(session: &mut VerificationSession, client: &mut Client, packet: Packet) -> SessionStatus {
        let status = session.receive(packet);
        let actions = session.drain();
        client.observe(&actions);
        status
    }

    /// Drive a session from login to the end of the movement check.
    pub(crate) fn run_to_movement(
        harness: &Harness,
        version: ProtocolVersion,
    ) -> (VerificationSession, Vec<Action>) {
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        let actions = session.drain();
        client.observe(&actions);

        if version.has_configuration() {
            assert_eq!(session.stage(), Stage::LoginAck);
            feed(&mut session, &mut client, LoginAcknowledged.into());
            assert_eq!(session.inbound_state(), ConnectionState::Configuration);
            feed(&mut session, &mut client, settings());
            feed(&mut session, &mut client, brand(version));
            let keep_alive = client.keep_alive();
            feed(&mut session, &mut client, keep_alive);
            feed(&mut session, &mut client, FinishConfiguration.into());
            assert_eq!(session.inbound_state(), ConnectionState::Play);
        }
        if version >= ProtocolVersion::V1_8 {
            assert_eq!(session.stage(), Stage::KeepAlive);
            let keep_alive = client.keep_alive();
            feed(&mut session, &mut client, keep_alive);
        }
        if !version.has_configuration() {
            assert_eq!(session.stage(), Stage::ClientSettings);
            feed(&mut session, &mut client, brand(version));
            assert_eq!(session.stage(), Stage::PluginMessage);
            feed(&mut session, &mut client, settings());
        }

        assert_eq!(session.stage(), Stage::Transaction);
        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        if version >= ProtocolVersion::V1_9 {
            assert_eq!(session.stage(), Stage::Teleport);
            if version >= ProtocolVersion::V1_21_2 {
                let response = client.buffered_response(&harness.assets);
                feed(&mut session, &mut client, response);
            }
            let confirm = client.confirm();
            feed(&mut session, &mut client, confirm);
        }
        assert_eq!(session.stage(), Stage::Position);

        let mut last = Vec::new();
        for packet in client.fall(&harness.assets) {
            let status = session.receive(packet);
            assert_ne!(status, SessionStatus::Failed, "failed on {}", version);
            last = session.drain();
            client.observe(&last);
        }
        (session, last)
    }

    fn sent_kinds(actions: &[Action]) -> Vec<PacketKind> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::Send(_, outgoing) => Some(outgoing.kind()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_version_verifies() {
        let harness = Harness::new(FallbackSettings::default());
        for &version in ProtocolVersion::ALL {
            let (session, _) = run_to_movement(&harness, version);
            assert_eq!(session.status(), SessionStatus::Verified, "on {}", version);
            assert_eq!(session.stage(), Stage::Success);
        }
        assert_eq!(
            harness.stats.successes.load(Ordering::Relaxed),
            ProtocolVersion::ALL.len() as u64
        );
        assert!(harness.verified.has(ADDR, "Tester0"));
        assert_eq!(harness.verified.len(), ProtocolVersion::ALL.len());
    }

    #[test]
    fn test_oldest_version_skips_configuration() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::OLDEST, Instant::now());
        assert_eq!(session.stage(), Stage::ClientSettings);
        assert_eq!(session.inbound_state(), ConnectionState::Play);
        let actions = session.drain();
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Send(ConnectionState::Play, Outgoing::Snapshot(s)) if s.kind() == PacketKind::JoinGame
        )));
        assert!(matches!(actions.last(), Some(Action::Flush)));
    }

    #[test]
    fn test_success_is_final() {
        let harness = Harness::new(FallbackSettings::default());
        let (mut session, _) = run_to_movement(&harness, ProtocolVersion::V1_20_5);
        assert_eq!(session.status(), SessionStatus::Verified);
        assert_eq!(
            session.receive(KeepAlive { id: 1 }.into()),
            SessionStatus::Verified
        );
        assert!(session.drain().is_empty());
        assert_eq!(harness.stats.successes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_success_kick_and_transfer() {
        let harness = Harness::new(FallbackSettings::default());
        let (_, last) = run_to_movement(&harness, ProtocolVersion::V1_21);
        assert_eq!(sent_kinds(&last), vec![PacketKind::Disconnect]);
        assert!(matches!(last.last(), Some(Action::Close)));

        let mut settings = FallbackSettings::default();
        settings.transfer = Some(TransferTarget {
            host: "lobby.example.net".into(),
            port: 25565,
        });
        let harness = Harness::new(settings);
        let (_, last) = run_to_movement(&harness, ProtocolVersion::V1_21);
        assert_eq!(sent_kinds(&last), vec![PacketKind::Transfer]);

        // No transfer packet before 1.20.5
        let (_, last) = run_to_movement(&harness, ProtocolVersion::V1_20_3);
        assert_eq!(sent_kinds(&last), vec![PacketKind::Disconnect]);
    }

    #[test]
    fn test_wrong_keep_alive_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_12_2, Instant::now());
        let mut client = Client::new(ProtocolVersion::V1_12_2);
        client.observe(&session.drain());
        let id = client.keep_alive.unwrap();
        let status = session.receive(KeepAlive { id: id + 1 }.into());
        assert_eq!(status, SessionStatus::Failed);
        let actions = session.drain();
        assert!(matches!(
            actions.first(),
            Some(Action::Send(ConnectionState::Play, Outgoing::Packet(Packet::Disconnect(_))))
        ));
        assert!(matches!(actions.last(), Some(Action::Close)));
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_failure_during_login_uses_login_disconnect() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_20_2, Instant::now());
        session.drain();
        let status = session.receive(FinishConfiguration.into());
        assert_eq!(status, SessionStatus::Failed);
        match session.drain().first() {
            Some(Action::Send(ConnectionState::Login, Outgoing::Packet(Packet::Disconnect(d)))) => {
                assert!(d.during_login)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_finish_configuration_requires_details() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_20_3, Instant::now());
        let mut client = Client::new(ProtocolVersion::V1_20_3);
        client.observe(&session.drain());
        feed(&mut session, &mut client, LoginAcknowledged.into());
        feed(&mut session, &mut client, settings());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        let status = feed(&mut session, &mut client, FinishConfiguration.into());
        assert_eq!(status, SessionStatus::Failed);
    }

    #[test]
    fn test_position_before_teleport_confirm_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_16_4;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        feed(&mut session, &mut client, settings());
        feed(&mut session, &mut client, brand(version));
        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        assert_eq!(session.stage(), Stage::Teleport);

        let spawn = harness.assets.oracle.spawn_y() as f64;
        let status = session.receive(MovePlayerPos::new(SPAWN_X, spawn, SPAWN_Z, false).into());
        assert_eq!(status, SessionStatus::Failed);
    }

    #[test]
    fn test_movement_before_challenge_is_ignored() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_8;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        let status = session.receive(MovePlayerPos::new(0.0, -3.0, 0.0, false).into());
        assert_eq!(status, SessionStatus::Active);
        assert_eq!(session.stage(), Stage::ClientSettings);
    }

    #[test]
    fn test_wrong_gravity_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_19_4;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        feed(&mut session, &mut client, settings());
        feed(&mut session, &mut client, brand(version));
        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        let confirm = client.confirm();
        feed(&mut session, &mut client, confirm);

        let mut fall = client.fall(&harness.assets).into_iter();
        feed(&mut session, &mut client, fall.next().unwrap());
        feed(&mut session, &mut client, fall.next().unwrap());
        // Falls at half speed
        let spawn = harness.assets.oracle.spawn_y() as f64;
        let slow = spawn + harness.assets.oracle.delta(1).unwrap() / 2.0;
        let status = session.receive(MovePlayerPos::new(SPAWN_X, slow, SPAWN_Z, false).into());
        assert_eq!(status, SessionStatus::Failed);
    }

    #[test]
    fn test_spoofed_ground_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_9;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        feed(&mut session, &mut client, settings());
        feed(&mut session, &mut client, brand(version));
        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        let confirm = client.confirm();
        feed(&mut session, &mut client, confirm);
        let spawn = harness.assets.oracle.spawn_y() as f64;
        let status = session.receive(
            MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, true).into(),
        );
        assert_eq!(status, SessionStatus::Failed);
    }

    #[test]
    fn test_gravity_failure_redirects_to_captcha() {
        let mut config = FallbackSettings::default();
        config.gravity.captcha_on_fail = true;
        let harness = Harness::new(config);
        let version = ProtocolVersion::V1_18_2;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        feed(&mut session, &mut client, settings());
        feed(&mut session, &mut client, brand(version));
        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        let confirm = client.confirm();
        feed(&mut session, &mut client, confirm);
        let mut fall = client.fall(&harness.assets).into_iter();
        feed(&mut session, &mut client, fall.next().unwrap());
        feed(&mut session, &mut client, fall.next().unwrap());

        // Lands immediately instead of falling
        let collide = harness.assets.oracle.collide_y() as f64;
        let status = session.receive(MovePlayerPos::new(SPAWN_X, collide, SPAWN_Z, true).into());
        assert_eq!(status, SessionStatus::Active);
        assert_eq!(session.stage(), Stage::MapCaptcha);
        let actions = session.drain();
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Send(_, Outgoing::Packet(Packet::MapData(_)))
        )));

        assert_eq!(session.receive(ChatMessage::new("nope").into()), SessionStatus::Active);
        let answer = session.captcha.as_ref().unwrap().answer.clone();
        assert_eq!(session.receive(ChatMessage::new(answer).into()), SessionStatus::Verified);
    }

    #[test]
    fn test_ground_claim_without_position_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_18_2;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        feed(&mut session, &mut client, settings());
        feed(&mut session, &mut client, brand(version));

        // Terrain loading: idle packets on the ground are fine
        let idle = MovePlayerStatus {
            on_ground: true,
            horizontal_collision: false,
        };
        assert_eq!(session.receive(idle.clone().into()), SessionStatus::Active);

        let transaction = client.transaction();
        feed(&mut session, &mut client, transaction);
        let confirm = client.confirm();
        feed(&mut session, &mut client, confirm);
        let mut fall = client.fall(&harness.assets).into_iter();
        feed(&mut session, &mut client, fall.next().unwrap());
        feed(&mut session, &mut client, fall.next().unwrap());

        let airborne = MovePlayerRot {
            yaw: 90.0,
            pitch: 0.0,
            on_ground: false,
            horizontal_collision: false,
        };
        assert_eq!(session.receive(airborne.into()), SessionStatus::Active);
        assert_eq!(session.receive(idle.into()), SessionStatus::Failed);
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_captcha_attempts_exhausted() {
        let mut settings = FallbackSettings::default();
        settings.captcha.timing = CaptchaTiming::Always;
        settings.captcha.max_tries = 2;
        let harness = Harness::new(settings);
        let (mut session, _) = run_to_movement(&harness, ProtocolVersion::V1_13_2);
        assert_eq!(session.stage(), Stage::MapCaptcha);

        assert_eq!(session.receive(ChatMessage::new("x").into()), SessionStatus::Active);
        assert_eq!(session.receive(ChatMessage::new("y").into()), SessionStatus::Failed);
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_captcha_answer_is_case_sensitive() {
        let mut settings = FallbackSettings::default();
        settings.captcha.timing = CaptchaTiming::Always;
        settings.captcha.alphabet = "ab".into();
        let harness = Harness::new(settings);
        let (mut session, _) = run_to_movement(&harness, ProtocolVersion::V1_7_6);
        let answer = session.captcha.as_ref().unwrap().answer.clone();
        session.drain();
        assert_eq!(
            session.receive(ChatMessage::new(answer.to_uppercase()).into()),
            SessionStatus::Active
        );
        assert_eq!(session.receive(ChatMessage::new(answer).into()), SessionStatus::Verified);
    }

    #[test]
    fn test_captcha_timeout() {
        let mut settings = FallbackSettings::default();
        settings.captcha.timing = CaptchaTiming::Always;
        let harness = Harness::new(settings);
        let (mut session, _) = run_to_movement(&harness, ProtocolVersion::V1_21_4);
        let started = session.captcha.as_ref().unwrap().started;
        let limit = Duration::from_millis(harness.assets.settings.captcha.max_duration_ms);

        let spawn = harness.assets.captcha_y as f64;
        let idle: Packet = MovePlayerPos::new(SPAWN_X, spawn, SPAWN_Z, false).into();
        assert_eq!(session.receive_at(idle.clone(), started + limit), SessionStatus::Active);
        assert_eq!(
            session.receive_at(idle, started + limit + Duration::from_millis(1)),
            SessionStatus::Failed
        );
    }

    #[test]
    fn test_captcha_countdown_and_keep_alive() {
        let mut settings = FallbackSettings::default();
        settings.captcha.timing = CaptchaTiming::Always;
        let harness = Harness::new(settings);
        let (mut session, _) = run_to_movement(&harness, ProtocolVersion::V1_20);
        session.drain();
        let started = session.captcha.as_ref().unwrap().started;
        let idle: Packet = MovePlayerPos::new(SPAWN_X, 1000.0, SPAWN_Z, false).into();

        let mut keep_alives = 0;
        let mut countdown = 0;
        for second in 0..TICKS_PER_SECOND as u64 {
            let at = started + Duration::from_millis(second * 1000 + 10);
            assert_eq!(session.receive_at(idle.clone(), at), SessionStatus::Active);
            for action in session.drain() {
                if let Action::Send(_, Outgoing::Snapshot(s)) = action {
                    match s.kind() {
                        PacketKind::KeepAlive => keep_alives += 1,
                        PacketKind::SetExperience => countdown += 1,
                        _ => {}
                    }
                }
            }
        }
        assert_eq!(keep_alives, 1);
        assert_eq!(countdown, TICKS_PER_SECOND);

        let id = harness.assets.captcha_keep_alive_id;
        assert_eq!(session.receive(KeepAlive { id }.into()), SessionStatus::Active);
        assert_eq!(
            session.receive(KeepAlive { id: id + 1 }.into()),
            SessionStatus::Failed
        );
    }

    #[test]
    fn test_no_captcha_ready_closes() {
        let mut settings = FallbackSettings::default();
        settings.captcha.timing = CaptchaTiming::Always;
        let mut harness = Harness::new(settings);
        harness.pool = Arc::new(CaptchaPool::new(Arc::new(Flat)));
        let (session, _) = run_to_movement(&harness, ProtocolVersion::V1_12);
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_spoofed_vanilla_brand() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_15_2;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);

        let other = PluginMessage {
            channel: "minecraft:register".into(),
            data: b"fabric:hello".to_vec(),
        };
        assert_eq!(session.receive(other.into()), SessionStatus::Active);
        let spoofed = PluginMessage::brand(version, SPOOFED_BRAND);
        assert_eq!(session.receive(spoofed.into()), SessionStatus::Failed);
    }

    #[test]
    fn test_duplicate_brand() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_10;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        assert_eq!(session.receive(brand(version)), SessionStatus::Active);
        assert_eq!(session.receive(brand(version)), SessionStatus::Failed);
    }

    #[test]
    fn test_legacy_channel_on_modern_version() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_14;
        let mut session = harness.session(version, Instant::now());
        let mut client = Client::new(version);
        client.observe(&session.drain());
        let keep_alive = client.keep_alive();
        feed(&mut session, &mut client, keep_alive);
        let legacy = PluginMessage::brand(ProtocolVersion::V1_12_2, "vanilla");
        assert_eq!(session.receive(legacy.into()), SessionStatus::Failed);
    }

    #[test]
    fn test_bad_locale_and_view_distance() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_8, Instant::now());
        session.drain();
        let info = ClientInformation::vanilla("en-US!", 10);
        assert_eq!(session.receive(info.into()), SessionStatus::Failed);

        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_8, Instant::now());
        session.drain();
        let info = ClientInformation::vanilla("en_us", 1);
        assert_eq!(session.receive(info.into()), SessionStatus::Failed);
    }

    #[test]
    fn test_packet_ceiling() {
        let harness = Harness::new(FallbackSettings::default());
        let mut session = harness.session(ProtocolVersion::V1_21_5, Instant::now());
        for _ in 0..harness.assets.max_packets {
            assert_eq!(session.receive(ClientTickEnd.into()), SessionStatus::Active);
        }
        assert_eq!(session.receive(ClientTickEnd.into()), SessionStatus::Failed);
    }

    #[test]
    fn test_time_ceiling() {
        let harness = Harness::new(FallbackSettings::default());
        let start = Instant::now();
        let mut session = harness.session(ProtocolVersion::V1_21_5, start);
        let limit = Duration::from_millis(harness.assets.settings.max_session_ms);
        assert_eq!(
            session.receive_at(ClientTickEnd.into(), start + limit),
            SessionStatus::Active
        );
        assert_eq!(
            session.receive_at(ClientTickEnd.into(), start + limit + Duration::from_millis(1)),
            SessionStatus::Failed
        );
    }

    #[test]
    fn test_repeated_failures_blacklist() {
        let harness = Harness::new(FallbackSettings::default());
        for _ in 0..2 {
            let mut session = harness.session(ProtocolVersion::V1_8, Instant::now());
            assert_eq!(session.receive(ChatMessage::new("hi").into()), SessionStatus::Failed);
        }
        assert!(harness.blacklist.contains(ADDR));
        assert_eq!(harness.stats.blacklisted.load(Ordering::Relaxed), 1);
        assert!(matches!(
            harness.gate.check(&harness.assets, ADDR, ProtocolVersion::V1_8, "Tester"),
            GateDecision::Reject(_)
        ));
    }

    #[test]
    fn test_quiet_failure_message() {
        let mut settings = FallbackSettings::default();
        settings.quiet_failures = true;
        let harness = Harness::new(settings);
        let mut session = harness.session(ProtocolVersion::V1_8, Instant::now());
        session.drain();
        session.receive(ChatMessage::new("hi").into());
        match session.drain().first() {
            Some(Action::Send(_, Outgoing::Packet(Packet::Disconnect(d)))) => {
                assert_eq!(d.reason.text, harness.assets.settings.messages.generic_failure)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
