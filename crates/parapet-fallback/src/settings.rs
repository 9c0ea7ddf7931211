use parapet_types::GameMode;
use serde::Deserialize;

/// Every knob the verification reads. Loaded as the `[fallback]` table of the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackSettings {
    #[serde(default = "default_game_mode")]
    pub game_mode: GameMode,
    /// World time sent after join. Negative leaves the client's default.
    #[serde(default = "default_time_of_day")]
    pub time_of_day: i64,
    #[serde(default = "default_name_regex")]
    pub valid_name_regex: String,
    #[serde(default = "default_locale_regex")]
    pub valid_locale_regex: String,
    #[serde(default)]
    pub brand: BrandSettings,
    #[serde(default)]
    pub gravity: GravitySettings,
    #[serde(default)]
    pub captcha: CaptchaSettings,
    /// Hard limit on a whole verification, in milliseconds.
    #[serde(default = "default_max_session_ms")]
    pub max_session_ms: u64,
    /// Packets allowed on top of what a legitimate client sends.
    #[serde(default = "default_packet_margin")]
    pub packet_margin: usize,
    /// Failures before an address is blacklisted. 0 disables the blacklist.
    #[serde(default = "default_blacklist_threshold")]
    pub blacklist_threshold: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default)]
    pub transfer: Option<TransferTarget>,
    /// Send the same failure message whatever check tripped.
    #[serde(default)]
    pub quiet_failures: bool,
    #[serde(default)]
    pub messages: Messages,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_brand_regex")]
    pub valid_regex: String,
    #[serde(default = "default_brand_max_length")]
    pub max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GravitySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub check_collisions: bool,
    /// Show the CAPTCHA instead of failing when the movement check fails.
    #[serde(default)]
    pub captcha_on_fail: bool,
    #[serde(default = "default_max_movement_ticks")]
    pub max_movement_ticks: u32,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub collision_tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaTiming {
    /// Every connection that passes the movement check also solves a CAPTCHA.
    Always,
    /// Only connections routed here by a failed movement check.
    Never,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaSettings {
    #[serde(default = "default_timing")]
    pub timing: CaptchaTiming,
    #[serde(default = "default_precompute")]
    pub precompute: usize,
    #[serde(default = "default_captcha_duration_ms")]
    pub max_duration_ms: u64,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferTarget {
    pub host: String,
    #[serde(default = "default_transfer_port")]
    pub port: i32,
}

/// User-visible text. `{reason}` in `verification_failed` is replaced by the check that tripped.
#[derive(Debug, Clone, Deserialize)]
pub struct Messages {
    #[serde(default = "default_welcome")]
    pub welcome: String,
    #[serde(default = "default_enter_code")]
    pub enter_code: String,
    #[serde(default = "default_incorrect_code")]
    pub incorrect_code: String,
    #[serde(default = "default_currently_preparing")]
    pub currently_preparing: String,
    #[serde(default = "default_verification_success")]
    pub verification_success: String,
    #[serde(default = "default_verification_failed")]
    pub verification_failed: String,
    #[serde(default = "default_generic_failure")]
    pub generic_failure: String,
    #[serde(default = "default_unsupported_version")]
    pub unsupported_version: String,
    #[serde(default = "default_already_verifying")]
    pub already_verifying: String,
    #[serde(default = "default_blacklisted")]
    pub blacklisted: String,
    #[serde(default = "default_too_fast_reconnect")]
    pub too_fast_reconnect: String,
    #[serde(default = "default_already_queued")]
    pub already_queued: String,
    #[serde(default = "default_invalid_username")]
    pub invalid_username: String,
}

fn default_true() -> bool {
    true
}

fn default_game_mode() -> GameMode {
    GameMode::Adventure
}

fn default_time_of_day() -> i64 {
    1000
}

fn default_name_regex() -> String {
    "^[a-zA-Z0-9_]+$".into()
}

fn default_locale_regex() -> String {
    "^[a-zA-Z_]+$".into()
}

fn default_brand_regex() -> String {
    "^[!-~ ]+$".into()
}

fn default_brand_max_length() -> usize {
    64
}

fn default_max_movement_ticks() -> u32 {
    8
}

fn default_epsilon() -> f64 {
    1e-7
}

fn default_timing() -> CaptchaTiming {
    CaptchaTiming::Never
}

fn default_precompute() -> usize {
    1000
}

fn default_captcha_duration_ms() -> u64 {
    45_000
}

fn default_max_tries() -> u32 {
    3
}

fn default_alphabet() -> String {
    "123456789".into()
}

fn default_min_length() -> usize {
    3
}

fn default_max_length() -> usize {
    4
}

fn default_max_session_ms() -> u64 {
    60_000
}

fn default_packet_margin() -> usize {
    150
}

fn default_blacklist_threshold() -> u32 {
    2
}

fn default_reconnect_delay_ms() -> u64 {
    8_000
}

fn default_transfer_port() -> i32 {
    25565
}

fn default_welcome() -> String {
    "Please wait a moment while we verify your connection...".into()
}

fn default_enter_code() -> String {
    "Please enter the code shown on the map in chat.".into()
}

fn default_incorrect_code() -> String {
    "You entered the wrong code. Please try again.".into()
}

fn default_currently_preparing() -> String {
    "The verification is still starting up. Please reconnect in a few seconds.".into()
}

fn default_verification_success() -> String {
    "Verification successful. Please reconnect to play.".into()
}

fn default_verification_failed() -> String {
    "Verification failed: {reason}".into()
}

fn default_generic_failure() -> String {
    "Verification failed. Please try again.".into()
}

fn default_unsupported_version() -> String {
    "Your client version is not supported.".into()
}

fn default_already_verifying() -> String {
    "You are already being verified.".into()
}

fn default_blacklisted() -> String {
    "You are temporarily blocked from joining.".into()
}

fn default_too_fast_reconnect() -> String {
    "You reconnected too fast. Please wait a moment.".into()
}

fn default_already_queued() -> String {
    "You are already queued for verification.".into()
}

fn default_invalid_username() -> String {
    "Your username contains invalid characters.".into()
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            game_mode: default_game_mode(),
            time_of_day: default_time_of_day(),
            valid_name_regex: default_name_regex(),
            valid_locale_regex: default_locale_regex(),
            brand: BrandSettings::default(),
            gravity: GravitySettings::default(),
            captcha: CaptchaSettings::default(),
            max_session_ms: default_max_session_ms(),
            packet_margin: default_packet_margin(),
            blacklist_threshold: default_blacklist_threshold(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            transfer: None,
            quiet_failures: false,
            messages: Messages::default(),
        }
    }
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            valid_regex: default_brand_regex(),
            max_length: default_brand_max_length(),
        }
    }
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            check_collisions: true,
            captcha_on_fail: false,
            max_movement_ticks: default_max_movement_ticks(),
            epsilon: default_epsilon(),
            collision_tolerance: 0.0,
        }
    }
}

impl Default for CaptchaSettings {
    fn default() -> Self {
        Self {
            timing: default_timing(),
            precompute: default_precompute(),
            max_duration_ms: default_captcha_duration_ms(),
            max_tries: default_max_tries(),
            alphabet: default_alphabet(),
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            welcome: default_welcome(),
            enter_code: default_enter_code(),
            incorrect_code: default_incorrect_code(),
            currently_preparing: default_currently_preparing(),
            verification_success: default_verification_success(),
            verification_failed: default_verification_failed(),
            generic_failure: default_generic_failure(),
            unsupported_version: default_unsupported_version(),
            already_verifying: default_already_verifying(),
            blacklisted: default_blacklisted(),
            too_fast_reconnect: default_too_fast_reconnect(),
            already_queued: default_already_queued(),
            invalid_username: default_invalid_username(),
        }
    }
}

impl FallbackSettings {
    /// Pull out-of-range values back into their supported range.
    pub fn clamp(mut self) -> Self {
        self.gravity.max_movement_ticks = self.gravity.max_movement_ticks.clamp(2, 100);
        self.gravity.epsilon = self.gravity.epsilon.abs();
        self.gravity.collision_tolerance = self.gravity.collision_tolerance.abs();
        self.brand.max_length = self.brand.max_length.clamp(2, 1024);

        let captcha = &mut self.captcha;
        captcha.precompute = captcha.precompute.clamp(10, 5000);
        captcha.max_duration_ms = captcha.max_duration_ms.clamp(5_000, 360_000);
        captcha.max_tries = captcha.max_tries.clamp(1, 100);
        captcha.min_length = captcha.min_length.clamp(1, 12);
        captcha.max_length = captcha.max_length.clamp(captcha.min_length, 12);
        if captcha.alphabet.is_empty() {
            captcha.alphabet = default_alphabet();
        }

        self.max_session_ms = self.max_session_ms.clamp(5_000, 600_000);
        self
    }

    /// Whether any connection can end up at the CAPTCHA.
    pub fn captcha_reachable(&self) -> bool {
        self.captcha.timing == CaptchaTiming::Always || self.gravity.captcha_on_fail
    }

    pub fn failure_message(&self, reason: &str) -> String {
        if self.quiet_failures {
            self.messages.generic_failure.clone()
        } else {
            self.messages.verification_failed.replace("{reason}", reason)
        }
    }
}
