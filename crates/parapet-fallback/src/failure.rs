use parapet_protocol::{DecodeError, EncodeError, MalformedFrame};
use thiserror::Error;

/// Why a verification ended in failure. The display text is what gets logged.
#[derive(Debug, Error)]
pub enum FailReason {
    #[error("unexpected {packet} while {state}")]
    UnexpectedPacket {
        packet: &'static str,
        state: &'static str,
    },
    #[error("sent duplicate {0}")]
    Duplicate(&'static str),
    #[error("expected keep alive {expected}, got {actual}")]
    KeepAliveMismatch { expected: i64, actual: i64 },
    #[error("expected transaction {expected}, got {actual}")]
    TransactionMismatch { expected: i32, actual: i32 },
    #[error("transaction was not accepted")]
    TransactionRejected,
    #[error("wrong window id {0}")]
    WrongWindow(u8),
    #[error("expected teleport {expected}, got {actual}")]
    TeleportMismatch { expected: i32, actual: i32 },
    #[error("configuration finished without {0}")]
    MissingClientDetails(&'static str),
    #[error("invalid locale {0:?}")]
    InvalidLocale(String),
    #[error("view distance {0}")]
    ViewDistance(i8),
    #[error("invalid client brand: {0}")]
    InvalidBrand(String),

    #[error("illegal movement packet order")]
    MovementOrder,
    #[error("illegal ground state on teleport")]
    GroundOnTeleport,
    #[error("illegal position {x}/{z}")]
    IllegalPosition { x: f64, z: f64 },
    #[error("invalid ticking: {client}/{movement}")]
    Ticking { client: u32, movement: u32 },
    #[error("unexpected y motion: {0}")]
    UnexpectedMotion(f64),
    #[error("incorrect gravity: expected {expected}, got {actual} at y {y}")]
    Gravity { expected: f64, actual: f64, y: f64 },
    #[error("fell through blocks at y {0}")]
    FellThrough(f64),
    #[error("illegal collision tick {tick}/{required}")]
    CollisionTick { tick: u32, required: u32 },
    #[error("illegal collision offset {0}")]
    CollisionOffset(f64),
    #[error("reported ground without a position while falling")]
    GroundWithoutPosition,

    #[error("took too long to enter the CAPTCHA")]
    CaptchaTimeout,
    #[error("failed the CAPTCHA too often")]
    CaptchaAttempts,

    #[error("too many packets: {0}")]
    TooManyPackets(usize),
    #[error("time limit exceeded after {0} ms")]
    TimeLimit(u128),
    #[error(transparent)]
    Framing(#[from] MalformedFrame),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl FailReason {
    /// Checks whose failure may be redirected to the CAPTCHA instead.
    pub fn is_gravity(&self) -> bool {
        matches!(
            self,
            FailReason::Gravity { .. }
                | FailReason::FellThrough(_)
                | FailReason::CollisionTick { .. }
                | FailReason::CollisionOffset(_)
                | FailReason::GroundWithoutPosition
        )
    }
}
