use crate::assets::{AssetsError, PreparedAssets};
use crate::captcha::{CaptchaPool, CaptchaRenderer};
use crate::collaborators::Collaborators;
use crate::login::LoginGate;
use crate::pipeline::{self, Admission, PipelineError};
use crate::settings::FallbackSettings;
use bytes::BytesMut;
use parapet_protocol::{Handshake, ProtocolVersion};
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared fallback state, one per listener. Every connection task holds an `Arc` to it.
pub struct Fallback {
    assets: RwLock<Arc<PreparedAssets>>,
    captchas: Arc<CaptchaPool>,
    gate: LoginGate,
}

impl std::fmt::Debug for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fallback")
            .field("captchas", &self.captchas)
            .field("verifying", &self.gate.verifying())
            .finish_non_exhaustive()
    }
}

impl Fallback {
    pub fn new(
        settings: FallbackSettings,
        renderer: Arc<dyn CaptchaRenderer>,
    ) -> Result<Self, AssetsError> {
        let collaborators = Collaborators::in_memory(&settings);
        Self::with_collaborators(settings, renderer, collaborators)
    }

    pub fn with_collaborators(
        settings: FallbackSettings,
        renderer: Arc<dyn CaptchaRenderer>,
        collaborators: Collaborators,
    ) -> Result<Self, AssetsError> {
        let assets = PreparedAssets::build(settings.clamp())?;
        Ok(Self {
            assets: RwLock::new(Arc::new(assets)),
            captchas: Arc::new(CaptchaPool::new(renderer)),
            gate: LoginGate::new(collaborators),
        })
    }

    /// The assets new sessions start with.
    pub fn assets(&self) -> Arc<PreparedAssets> {
        self.assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn captchas(&self) -> &Arc<CaptchaPool> {
        &self.captchas
    }

    pub fn gate(&self) -> &LoginGate {
        &self.gate
    }

    /// Rebuild the assets from new settings. Running sessions finish with the old ones.
    pub fn reload(&self, settings: FallbackSettings) -> Result<(), AssetsError> {
        let assets = Arc::new(PreparedAssets::build(settings.clamp())?);
        *self.assets.write().unwrap_or_else(PoisonError::into_inner) = assets;
        info!("Fallback settings reloaded");
        Ok(())
    }

    /// Start rendering a CAPTCHA batch if the current settings can ever show one.
    pub fn prepare_captchas(&self) -> Option<JoinHandle<usize>> {
        let assets = self.assets();
        if !assets.settings.captcha_reachable() {
            return None;
        }
        self.captchas.prepare(&assets.settings.captcha)
    }

    pub fn handshake(&self, frame: BytesMut) -> Result<Handshake, PipelineError> {
        pipeline::read_handshake(&self.assets().registry, frame)
    }

    pub fn login(
        &self,
        address: IpAddr,
        version: ProtocolVersion,
        frame: BytesMut,
        compression: Option<i32>,
    ) -> Result<Admission, PipelineError> {
        pipeline::admit(
            &self.assets(),
            &self.captchas,
            &self.gate,
            address,
            version,
            frame,
            compression,
            Instant::now(),
        )
    }
}
