//! Services the verification consults but does not own, with in-memory implementations.

use crate::failure::FailReason;
use crate::settings::FallbackSettings;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub trait AdmissionQueue: Send + Sync {
    /// `false` when the address is already waiting.
    fn try_enqueue(&self, address: IpAddr) -> bool;
    fn remove(&self, address: IpAddr);
}

pub trait RateLimiter: Send + Sync {
    /// Record a login attempt. `false` when the previous one was too recent.
    fn attempt(&self, address: IpAddr) -> bool;
}

pub trait Blacklist: Send + Sync {
    fn contains(&self, address: IpAddr) -> bool;
    /// Count a failed verification. Returns `true` if the address is now blacklisted.
    fn record_failure(&self, address: IpAddr) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPlayer {
    pub address: IpAddr,
    pub username: String,
    pub uuid: Uuid,
    pub verified_at: SystemTime,
}

pub trait VerifiedStore: Send + Sync {
    fn has(&self, address: IpAddr, username: &str) -> bool;
    fn add(&self, player: VerifiedPlayer);
}

/// Outcome hooks. Called once per finished session.
pub trait VerificationObserver: Send + Sync {
    fn on_success(&self, _player: &VerifiedPlayer, _elapsed: Duration) {}
    fn on_failure(&self, _username: &str, _address: IpAddr, _reason: &FailReason) {}
    fn on_blacklisted(&self, _address: IpAddr) {}
}

/// Everything the login gate and sessions talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub queue: Arc<dyn AdmissionQueue>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub blacklist: Arc<dyn Blacklist>,
    pub verified: Arc<dyn VerifiedStore>,
    pub observer: Arc<dyn VerificationObserver>,
}

impl Collaborators {
    pub fn in_memory(settings: &FallbackSettings) -> Self {
        Self {
            queue: Arc::new(MemoryQueue::default()),
            rate_limiter: Arc::new(MemoryRateLimiter::new(Duration::from_millis(
                settings.reconnect_delay_ms,
            ))),
            blacklist: Arc::new(MemoryBlacklist::new(settings.blacklist_threshold)),
            verified: Arc::new(MemoryVerifiedStore::default()),
            observer: Arc::new(VerificationStats::default()),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

// === In-memory implementations ===

#[derive(Debug, Default)]
pub struct MemoryQueue {
    queued: Mutex<HashSet<IpAddr>>,
}

impl AdmissionQueue for MemoryQueue {
    fn try_enqueue(&self, address: IpAddr) -> bool {
        lock(&self.queued).insert(address)
    }

    fn remove(&self, address: IpAddr) {
        lock(&self.queued).remove(&address);
    }
}

#[derive(Debug)]
pub struct MemoryRateLimiter {
    delay: Duration,
    attempts: Mutex<HashMap<IpAddr, Instant>>,
}

impl MemoryRateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            attempts: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn attempt(&self, address: IpAddr) -> bool {
        let now = Instant::now();
        let mut attempts = lock(&self.attempts);
        attempts.retain(|_, last| now.duration_since(*last) < self.delay);
        match attempts.insert(address, now) {
            Some(_) => false,
            None => true,
        }
    }
}

#[derive(Debug)]
pub struct MemoryBlacklist {
    threshold: u32,
    failures: Mutex<HashMap<IpAddr, u32>>,
}

impl MemoryBlacklist {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        lock(&self.failures).clear();
    }
}

impl Blacklist for MemoryBlacklist {
    fn contains(&self, address: IpAddr) -> bool {
        if self.threshold == 0 {
            return false;
        }
        lock(&self.failures)
            .get(&address)
            .is_some_and(|score| *score >= self.threshold)
    }

    fn record_failure(&self, address: IpAddr) -> bool {
        if self.threshold == 0 {
            return false;
        }
        let mut failures = lock(&self.failures);
        let score = failures.entry(address).or_insert(0);
        *score += 1;
        *score == self.threshold
    }
}

#[derive(Debug, Default)]
pub struct MemoryVerifiedStore {
    players: Mutex<HashMap<(IpAddr, String), VerifiedPlayer>>,
}

impl MemoryVerifiedStore {
    pub fn len(&self) -> usize {
        lock(&self.players).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VerifiedStore for MemoryVerifiedStore {
    fn has(&self, address: IpAddr, username: &str) -> bool {
        lock(&self.players).contains_key(&(address, username.to_owned()))
    }

    fn add(&self, player: VerifiedPlayer) {
        lock(&self.players).insert((player.address, player.username.clone()), player);
    }
}

/// Running totals of verification outcomes.
#[derive(Debug, Default)]
pub struct VerificationStats {
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    pub blacklisted: AtomicU64,
}

impl VerificationObserver for VerificationStats {
    fn on_success(&self, _player: &VerifiedPlayer, _elapsed: Duration) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn on_failure(&self, _username: &str, _address: IpAddr, _reason: &FailReason) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn on_blacklisted(&self, _address: IpAddr) {
        self.blacklisted.fetch_add(1, Ordering::Relaxed);
    }
}
