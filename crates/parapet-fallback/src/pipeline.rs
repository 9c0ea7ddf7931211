//! Frame-level glue between a connection and a [`VerificationSession`].
//!
//! Frames in are `id` + body with framing and compression already removed; frames out are
//! the same, ready for a frame writer.

use crate::assets::PreparedAssets;
use crate::captcha::CaptchaPool;
use crate::failure::FailReason;
use crate::login::{GateDecision, LoginGate};
use crate::session::{Action, SessionStatus, VerificationSession};
use bytes::BytesMut;
use parapet_protocol::*;
use parapet_types::GameProfile;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("expected {expected}, got {actual}")]
    UnexpectedPacket {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("empty frame")]
    Empty,
}

/// What the connection writes next.
#[derive(Debug)]
pub enum Outbound {
    /// An encoded packet (`id` + body).
    Frame(BytesMut),
    EnableCompression(i32),
    Flush,
    Close,
}

/// Result of a login start.
#[derive(Debug)]
pub enum Admission {
    /// Write these and close.
    Reject(Vec<Outbound>),
    /// Already verified. Write these and close; the player reconnects to the real server.
    Bypass(GameProfile, Vec<Outbound>),
    Verify(Box<FallbackPipeline>),
}

fn encode_one(
    registry: &PacketRegistry,
    state: ConnectionState,
    version: ProtocolVersion,
    outgoing: &Outgoing,
) -> Result<BytesMut, PipelineError> {
    let encoder = PacketEncoder::new(registry.table(state, Direction::Clientbound, version)?);
    let mut buf = BytesMut::new();
    encoder.encode(outgoing, &mut buf)?;
    Ok(buf)
}

/// A single login-phase disconnect. Unknown versions get the newest encoding.
fn login_kick(
    registry: &PacketRegistry,
    version: ProtocolVersion,
    outgoing: Outgoing,
) -> Result<Vec<Outbound>, PipelineError> {
    let version = if version.is_unknown() {
        ProtocolVersion::LATEST
    } else {
        version
    };
    let frame = encode_one(registry, ConnectionState::Login, version, &outgoing)?;
    Ok(vec![Outbound::Frame(frame), Outbound::Flush, Outbound::Close])
}

/// Decode the first frame of a connection.
pub fn read_handshake(registry: &PacketRegistry, frame: BytesMut) -> Result<Handshake, PipelineError> {
    let table = registry.table(
        ConnectionState::Handshake,
        Direction::Serverbound,
        ProtocolVersion::LATEST,
    )?;
    match PacketDecoder::new(table, 1).decode(frame)? {
        Some(Packet::Handshake(handshake)) => Ok(handshake),
        Some(other) => Err(PipelineError::UnexpectedPacket {
            expected: PacketKind::Handshake.name(),
            actual: other.kind().name(),
        }),
        None => Err(PipelineError::Empty),
    }
}

/// Run the login gate on a login start frame and, if admitted, start the session.
#[allow(clippy::too_many_arguments)]
pub fn admit(
    assets: &Arc<PreparedAssets>,
    pool: &Arc<CaptchaPool>,
    gate: &LoginGate,
    address: IpAddr,
    version: ProtocolVersion,
    frame: BytesMut,
    compression: Option<i32>,
    now: Instant,
) -> Result<Admission, PipelineError> {
    let registry = &assets.registry;
    if version.is_unknown() {
        debug!("Rejected {}: unsupported protocol", address);
        let kick = Outgoing::from(Arc::clone(&assets.gate.unsupported_version));
        return Ok(Admission::Reject(login_kick(registry, version, kick)?));
    }

    let table = registry.table(ConnectionState::Login, Direction::Serverbound, version)?;
    let login = match PacketDecoder::new(table, 1).decode(frame)? {
        Some(Packet::LoginStart(login)) => login,
        Some(other) => {
            return Err(PipelineError::UnexpectedPacket {
                expected: PacketKind::LoginStart.name(),
                actual: other.kind().name(),
            })
        }
        None => return Err(PipelineError::Empty),
    };

    match gate.check(assets, address, version, &login.username) {
        GateDecision::Reject(message) => Ok(Admission::Reject(login_kick(
            registry,
            version,
            message.into(),
        )?)),
        GateDecision::Bypass(profile) => {
            let kick = Outgoing::from(Arc::clone(&assets.gate.verified));
            Ok(Admission::Bypass(profile, login_kick(registry, version, kick)?))
        }
        GateDecision::Verify(ticket) => {
            let session = VerificationSession::start(
                Arc::clone(assets),
                Arc::clone(pool),
                gate.collaborators().clone(),
                ticket,
                compression,
                now,
            );
            Ok(Admission::Verify(Box::new(FallbackPipeline::new(session)?)))
        }
    }
}

/// Decoder and encoder following the session's protocol state.
#[derive(Debug)]
pub struct FallbackPipeline {
    session: VerificationSession,
    decoder: PacketDecoder,
    encoder: PacketEncoder,
    decoding: ConnectionState,
    encoding: ConnectionState,
}

impl FallbackPipeline {
    pub fn new(session: VerificationSession) -> Result<Self, RegistryError> {
        let version = session.version();
        let assets = Arc::clone(session.assets());
        let registry = &assets.registry;
        let login = ConnectionState::Login;
        Ok(Self {
            decoder: PacketDecoder::new(
                registry.table(login, Direction::Serverbound, version)?,
                assets.max_frames,
            ),
            encoder: PacketEncoder::new(registry.table(login, Direction::Clientbound, version)?),
            decoding: login,
            encoding: login,
            session,
        })
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Frames queued when the session started.
    pub fn start(&mut self) -> Vec<Outbound> {
        self.drain()
    }

    pub fn handle_frame(&mut self, frame: BytesMut) -> Vec<Outbound> {
        self.handle_frame_at(frame, Instant::now())
    }

    pub fn handle_frame_at(&mut self, frame: BytesMut, now: Instant) -> Vec<Outbound> {
        if self.session.status() != SessionStatus::Active {
            return Vec::new();
        }
        match self.decoder.decode(frame) {
            Ok(Some(packet)) => {
                self.session.receive_at(packet, now);
            }
            Ok(None) => {}
            Err(e) => {
                self.session.abort(FailReason::Decode(e), now);
            }
        }
        self.drain()
    }

    /// End the session for something the transport saw, such as a frame that could not be split.
    pub fn abort(&mut self, reason: FailReason) -> Vec<Outbound> {
        if self.session.status() != SessionStatus::Active {
            return Vec::new();
        }
        self.session.abort(reason, Instant::now());
        self.drain()
    }

    /// Follow the session's inbound state so the next frame uses the right table.
    fn sync_decoder(&mut self) -> Result<(), RegistryError> {
        let inbound = self.session.inbound_state();
        if inbound != self.decoding {
            let table = self.table(inbound, Direction::Serverbound)?;
            self.decoder.update_registry(table);
            self.decoding = inbound;
        }
        Ok(())
    }

    fn table(
        &self,
        state: ConnectionState,
        direction: Direction,
    ) -> Result<Arc<ProtocolRegistry>, RegistryError> {
        self.session
            .assets()
            .registry
            .table(state, direction, self.session.version())
    }

    /// Encode everything the session queued. An encoding failure closes the connection.
    fn drain(&mut self) -> Vec<Outbound> {
        let actions = self.session.drain();
        let mut out = Vec::with_capacity(actions.len() + 1);
        let synced = self.sync_decoder();
        for action in actions {
            match action {
                Action::Send(state, outgoing) => match self.encode(state, &outgoing) {
                    Ok(frame) => out.push(Outbound::Frame(frame)),
                    Err(e) => {
                        warn!(
                            "Could not send {} to {}: {}",
                            outgoing.kind().name(),
                            self.session.username(),
                            e
                        );
                        out.push(Outbound::Close);
                        return out;
                    }
                },
                Action::EnableCompression(threshold) => {
                    out.push(Outbound::EnableCompression(threshold))
                }
                Action::Flush => out.push(Outbound::Flush),
                Action::Close => out.push(Outbound::Close),
            }
        }
        if let Err(e) = synced {
            warn!("No inbound table for {}: {}", self.session.version(), e);
            out.push(Outbound::Close);
        }
        out
    }

    fn encode(&mut self, state: ConnectionState, outgoing: &Outgoing) -> Result<BytesMut, PipelineError> {
        if state != self.encoding {
            let table = self.table(state, Direction::Clientbound)?;
            self.encoder.update_registry(table);
            self.encoding = state;
        }
        let mut buf = BytesMut::new();
        self.encoder.encode(outgoing, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{SPAWN_X, SPAWN_Z};
    use crate::collaborators::VerifiedPlayer;
    use crate::session::tests::{brand, settings, Harness, ADDR};
    use crate::session::Stage;
    use crate::settings::FallbackSettings;
    use std::sync::atomic::Ordering;
    use std::time::SystemTime;

    /// A client speaking the wire format, reacting to what the pipeline writes.
    struct WireClient {
        version: ProtocolVersion,
        state: ConnectionState,
        registry: Arc<PreparedAssets>,
        keep_alive: Option<i64>,
        transaction: Option<i32>,
        kinds: Vec<PacketKind>,
        closed: bool,
        compression: Option<i32>,
    }

    impl WireClient {
        fn new(version: ProtocolVersion, assets: &Arc<PreparedAssets>) -> Self {
            Self {
                version,
                state: ConnectionState::Login,
                registry: Arc::clone(assets),
                keep_alive: None,
                transaction: None,
                kinds: Vec::new(),
                closed: false,
                compression: None,
            }
        }

        fn frame(&mut self, packet: impl Into<Packet>) -> BytesMut {
            let packet = packet.into();
            let kind = packet.kind();
            let table = self
                .registry
                .registry
                .table(self.state, Direction::Serverbound, self.version)
                .unwrap();
            let mut buf = BytesMut::new();
            PacketEncoder::new(table)
                .encode(&Outgoing::Packet(packet), &mut buf)
                .unwrap();
            match kind {
                PacketKind::LoginAcknowledged => self.state = ConnectionState::Configuration,
                PacketKind::FinishConfiguration => self.state = ConnectionState::Play,
                _ => {}
            }
            buf
        }

        fn read(&mut self, outbound: Vec<Outbound>) {
            for out in outbound {
                match out {
                    Outbound::Frame(mut frame) => {
                        let table = self
                            .registry
                            .registry
                            .table(self.state, Direction::Clientbound, self.version)
                            .unwrap();
                        let id = read_varint(&mut frame).unwrap();
                        let kind = table.kind_of(id).unwrap();
                        self.kinds.push(kind);
                        match kind {
                            PacketKind::LoginSuccess if !self.version.has_configuration() => {
                                self.state = ConnectionState::Play
                            }
                            PacketKind::KeepAlive => {
                                let keep_alive = KeepAlive::decode(&mut frame, self.version).unwrap();
                                self.keep_alive = Some(keep_alive.id);
                            }
                            PacketKind::Transaction => {
                                let transaction =
                                    Transaction::decode(&mut frame, self.version).unwrap();
                                self.transaction = Some(transaction.id);
                            }
                            _ => {}
                        }
                    }
                    Outbound::EnableCompression(threshold) => self.compression = Some(threshold),
                    Outbound::Flush => {}
                    Outbound::Close => self.closed = true,
                }
            }
        }

        fn send(&mut self, pipeline: &mut FallbackPipeline, packet: impl Into<Packet>) {
            let frame = self.frame(packet);
            let out = pipeline.handle_frame(frame);
            self.read(out);
        }
    }

    fn admitted(harness: &Harness, version: ProtocolVersion, name: &str) -> Admission {
        let mut login = WireClient::new(version, &harness.assets);
        let frame = login.frame(LoginStart::new(name));
        admit(
            &harness.assets,
            &harness.pool,
            &harness.gate,
            ADDR,
            version,
            frame,
            Some(256),
            Instant::now(),
        )
        .unwrap()
    }

    fn verify_over_wire(version: ProtocolVersion) -> (FallbackPipeline, WireClient) {
        let harness = Harness::new(FallbackSettings::default());
        let mut pipeline = match admitted(&harness, version, "Wire") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());
        assert_eq!(client.kinds[0], PacketKind::SetCompression);

        if version.has_configuration() {
            client.send(&mut pipeline, LoginAcknowledged);
            client.send(&mut pipeline, settings());
            client.send(&mut pipeline, brand(version));
            let id = client.keep_alive.take().unwrap();
            client.send(&mut pipeline, KeepAlive { id });
            assert_eq!(client.kinds.last(), Some(&PacketKind::FinishConfiguration));
            client.send(&mut pipeline, FinishConfiguration);
        }
        if version >= ProtocolVersion::V1_8 {
            let id = client.keep_alive.take().unwrap();
            client.send(&mut pipeline, KeepAlive { id });
        }
        if !version.has_configuration() {
            client.send(&mut pipeline, settings());
            client.send(&mut pipeline, brand(version));
        }
        assert_eq!(pipeline.session().stage(), Stage::Transaction);
        assert!(client.kinds.contains(&PacketKind::JoinGame));

        let mut transaction = Transaction::new(client.transaction.take().unwrap());
        transaction.accepted = true;
        client.send(&mut pipeline, transaction);
        if version >= ProtocolVersion::V1_9 {
            let teleport_id = pipeline.session().teleport_id();
            client.send(&mut pipeline, ConfirmTeleportation { teleport_id });
        }

        let oracle = &harness.assets.oracle;
        let spawn = oracle.spawn_y() as f64;
        let collide = oracle.collide_y() as f64;
        client.send(&mut pipeline, MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, false));
        client.send(&mut pipeline, MovePlayerPosRot::new(SPAWN_X, spawn, SPAWN_Z, 0.0, 0.0, false));
        for y in oracle.trajectory().skip(1).take_while(|y| *y > collide) {
            client.send(&mut pipeline, MovePlayerPos::new(SPAWN_X, y, SPAWN_Z, false));
        }
        client.send(&mut pipeline, MovePlayerPos::new(SPAWN_X, collide, SPAWN_Z, true));
        (pipeline, client)
    }

    #[test]
    fn test_verifies_over_the_wire() {
        for version in [
            ProtocolVersion::V1_8,
            ProtocolVersion::V1_12_2,
            ProtocolVersion::V1_17,
            ProtocolVersion::V1_20_5,
            ProtocolVersion::V1_21,
        ] {
            let (pipeline, client) = verify_over_wire(version);
            assert_eq!(pipeline.status(), SessionStatus::Verified, "on {}", version);
            assert_eq!(client.kinds.last(), Some(&PacketKind::Disconnect));
            assert_eq!(client.compression, Some(256));
            assert!(client.closed);
        }
    }

    #[test]
    fn test_oldest_version_has_no_compression() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::OLDEST;
        let mut pipeline = match admitted(&harness, version, "Old") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());
        assert_eq!(client.kinds[0], PacketKind::LoginSuccess);
        assert_eq!(client.kinds[1], PacketKind::JoinGame);
        assert!(client.compression.is_none());
        assert_eq!(pipeline.session().inbound_state(), ConnectionState::Play);
    }

    #[test]
    fn test_out_of_order_packet_disconnects() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_16_4;
        let mut pipeline = match admitted(&harness, version, "Rushed") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());
        client.send(&mut pipeline, Transaction::new(-1));
        assert_eq!(pipeline.status(), SessionStatus::Failed);
        assert_eq!(client.kinds.last(), Some(&PacketKind::Disconnect));
        assert!(client.closed);

        // Nothing more is written once the session has ended
        let frame = client.frame(KeepAlive { id: 1 });
        assert!(pipeline.handle_frame(frame).is_empty());
    }

    #[test]
    fn test_frame_flood_disconnects() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_20;
        let mut pipeline = match admitted(&harness, version, "Flood") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());

        let mut unknown = BytesMut::new();
        write_varint(&mut unknown, 0x7F);
        for _ in 0..harness.assets.max_frames {
            client.read(pipeline.handle_frame(unknown.clone()));
        }
        assert_eq!(pipeline.status(), SessionStatus::Active);
        client.read(pipeline.handle_frame(unknown));
        assert_eq!(pipeline.status(), SessionStatus::Failed);
        assert!(client.closed);
    }

    #[test]
    fn test_malformed_frame_fails() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_12_2;
        let mut pipeline = match admitted(&harness, version, "Broken") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());
        let mut frame = client.frame(KeepAlive { id: 5 });
        frame.truncate(frame.len() - 1);
        client.read(pipeline.handle_frame(frame));
        assert_eq!(pipeline.status(), SessionStatus::Failed);
        assert!(client.closed);
    }

    #[test]
    fn test_transport_abort_counts_as_failure() {
        let harness = Harness::new(FallbackSettings::default());
        let version = ProtocolVersion::V1_20_5;
        let mut pipeline = match admitted(&harness, version, "Garbled") {
            Admission::Verify(pipeline) => *pipeline,
            other => panic!("not admitted: {:?}", other),
        };
        let mut client = WireClient::new(version, &harness.assets);
        client.read(pipeline.start());

        let reason = FailReason::from(MalformedFrame("Bad frame length: -1".into()));
        client.read(pipeline.abort(reason));
        assert_eq!(pipeline.status(), SessionStatus::Failed);
        assert_eq!(client.kinds.last(), Some(&PacketKind::Disconnect));
        assert!(client.closed);
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 1);

        // A second abort after the session ended writes nothing and counts nothing
        assert!(pipeline.abort(FailReason::TimeLimit(0)).is_empty());
        assert_eq!(harness.stats.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unknown_version_rejected_with_latest_encoding() {
        let harness = Harness::new(FallbackSettings::default());
        let admission = admit(
            &harness.assets,
            &harness.pool,
            &harness.gate,
            ADDR,
            ProtocolVersion::Unknown,
            BytesMut::new(),
            None,
            Instant::now(),
        )
        .unwrap();
        let Admission::Reject(out) = admission else {
            panic!("expected rejection");
        };
        let mut client = WireClient::new(ProtocolVersion::LATEST, &harness.assets);
        client.read(out);
        assert_eq!(client.kinds, vec![PacketKind::Disconnect]);
        assert!(client.closed);
    }

    #[test]
    fn test_bypass_for_verified_player() {
        let harness = Harness::new(FallbackSettings::default());
        harness.gate.collaborators().verified.add(VerifiedPlayer {
            address: ADDR,
            username: "Known".into(),
            uuid: GameProfile::offline("Known").uuid,
            verified_at: SystemTime::now(),
        });
        match admitted(&harness, ProtocolVersion::V1_8, "Known") {
            Admission::Bypass(profile, out) => {
                assert_eq!(profile.name, "Known");
                assert!(matches!(out.last(), Some(Outbound::Close)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_handshake() {
        let harness = Harness::new(FallbackSettings::default());
        let handshake = Handshake {
            protocol_version: ProtocolVersion::V1_20_5.protocol(),
            server_address: "play.example.net".into(),
            server_port: 25565,
            intent: 2,
        };
        let mut frame = BytesMut::new();
        write_varint(&mut frame, 0x00);
        handshake.encode(&mut frame, ProtocolVersion::LATEST).unwrap();
        let decoded = read_handshake(&harness.assets.registry, frame).unwrap();
        assert_eq!(decoded, handshake);

        assert!(matches!(
            read_handshake(&harness.assets.registry, BytesMut::new()),
            Err(PipelineError::Empty)
        ));
    }
}
