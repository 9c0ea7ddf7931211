pub mod assets;
pub mod captcha;
pub mod collaborators;
pub mod engine;
pub mod failure;
pub mod gravity;
pub mod login;
pub mod pipeline;
pub mod session;
pub mod settings;

pub use assets::{AssetsError, PreparedAssets};
pub use captcha::{CaptchaEntry, CaptchaError, CaptchaPool, CaptchaRenderer};
pub use collaborators::*;
pub use engine::Fallback;
pub use failure::FailReason;
pub use gravity::GravityOracle;
pub use login::{GateDecision, LoginGate, Ticket};
pub use pipeline::{Admission, FallbackPipeline, Outbound, PipelineError};
pub use session::{Action, SessionStatus, Stage, VerificationSession};
pub use settings::*;
