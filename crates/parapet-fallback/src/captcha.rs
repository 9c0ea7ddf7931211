//! Pre-rendered CAPTCHA images, filled in the background ahead of demand.

use crate::settings::CaptchaSettings;
use parapet_protocol::MAP_SIZE;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bytes in one rendered map image.
pub const IMAGE_LEN: usize = MAP_SIZE * MAP_SIZE;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("cannot draw {0:?}")]
    UnsupportedCharacter(char),
    #[error("rendered {0} bytes instead of a full map")]
    WrongSize(usize),
}

/// Draws an answer into a 128x128 buffer of map color ids.
pub trait CaptchaRenderer: Send + Sync {
    fn render(&self, answer: &str) -> Result<Vec<u8>, CaptchaError>;
}

#[derive(Debug, Clone)]
pub struct CaptchaEntry {
    pub answer: String,
    pub image: Arc<[u8]>,
}

/// Random answer drawn from the configured alphabet and length range.
pub fn random_answer(settings: &CaptchaSettings, rng: &mut impl Rng) -> String {
    let alphabet: Vec<char> = settings.alphabet.chars().collect();
    let max = settings.max_length.max(settings.min_length);
    let len = rng.gen_range(settings.min_length..=max);
    (0..len)
        .filter_map(|_| alphabet.choose(rng).copied())
        .collect()
}

pub struct CaptchaPool {
    renderer: Arc<dyn CaptchaRenderer>,
    entries: RwLock<Arc<[CaptchaEntry]>>,
    filling: AtomicBool,
    available: AtomicBool,
}

impl std::fmt::Debug for CaptchaPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaPool")
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

impl CaptchaPool {
    pub fn new(renderer: Arc<dyn CaptchaRenderer>) -> Self {
        Self {
            renderer,
            entries: RwLock::new(Arc::from(Vec::new())),
            filling: AtomicBool::new(false),
            available: AtomicBool::new(false),
        }
    }

    /// Start filling a new batch on the blocking pool.
    ///
    /// Returns `None` if a batch is already being filled. The previous batch stays
    /// readable until the new one is complete.
    pub fn prepare(self: &Arc<Self>, settings: &CaptchaSettings) -> Option<JoinHandle<usize>> {
        if self.filling.swap(true, Ordering::AcqRel) {
            debug!("CAPTCHA batch already being prepared");
            return None;
        }
        let pool = Arc::clone(self);
        let settings = settings.clone();
        Some(tokio::task::spawn_blocking(move || {
            let filled = pool.fill(&settings);
            pool.filling.store(false, Ordering::Release);
            filled
        }))
    }

    /// Render a whole batch on the current thread and publish it. Returns the number of entries.
    pub fn fill(&self, settings: &CaptchaSettings) -> usize {
        let mut rng = rand::thread_rng();
        let mut batch = Vec::with_capacity(settings.precompute);
        for _ in 0..settings.precompute {
            let answer = random_answer(settings, &mut rng);
            match self.renderer.render(&answer) {
                Ok(image) if image.len() == IMAGE_LEN => batch.push(CaptchaEntry {
                    answer,
                    image: image.into(),
                }),
                Ok(image) => warn!("Skipping CAPTCHA: {}", CaptchaError::WrongSize(image.len())),
                Err(e) => warn!("Skipping CAPTCHA {:?}: {}", answer, e),
            }
        }

        let filled = batch.len();
        if filled > 0 {
            *self.entries.write().unwrap_or_else(PoisonError::into_inner) = batch.into();
            self.available.store(true, Ordering::Release);
        }
        info!("Prepared {} CAPTCHA images", filled);
        filled
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn take_random(&self) -> Option<CaptchaEntry> {
        if !self.is_available() {
            return None;
        }
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        entries.choose(&mut rand::thread_rng()).cloned()
    }
}
