//! Admission checks run on login start, before a session exists.

use crate::assets::{PreparedAssets, Snapshot};
use crate::collaborators::Collaborators;
use parapet_protocol::ProtocolVersion;
use parapet_types::GameProfile;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

type Verifying = Arc<Mutex<HashSet<String>>>;

/// Claim on a username while it is being verified. Released on drop.
#[derive(Debug)]
pub struct Ticket {
    pub profile: GameProfile,
    pub address: IpAddr,
    pub version: ProtocolVersion,
    verifying: Verifying,
    collaborators: Collaborators,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.verifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.profile.name);
        self.collaborators.queue.remove(self.address);
    }
}

#[derive(Debug)]
pub enum GateDecision {
    Verify(Ticket),
    /// Already verified from this address.
    Bypass(GameProfile),
    Reject(Snapshot),
}

#[derive(Debug)]
pub struct LoginGate {
    collaborators: Collaborators,
    verifying: Verifying,
}

impl LoginGate {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            verifying: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn verifying(&self) -> usize {
        self.verifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn check(
        &self,
        assets: &PreparedAssets,
        address: IpAddr,
        version: ProtocolVersion,
        username: &str,
    ) -> GateDecision {
        let gate = &assets.gate;
        let reject = |reason: &str, message: &Snapshot| {
            debug!("Rejected {} ({}): {}", username, address, reason);
            GateDecision::Reject(Arc::clone(message))
        };

        if version.is_unknown() {
            return reject("unsupported version", &gate.unsupported_version);
        }
        if self
            .verifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(username)
        {
            return reject("already verifying", &gate.already_verifying);
        }
        let collaborators = &self.collaborators;
        if collaborators.blacklist.contains(address) {
            return reject("blacklisted", &gate.blacklisted);
        }
        if !collaborators.rate_limiter.attempt(address) {
            return reject("reconnected too fast", &gate.too_fast_reconnect);
        }
        if !collaborators.queue.try_enqueue(address) {
            return reject("already queued", &gate.already_queued);
        }

        let inserted = self
            .verifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.to_owned());
        if !inserted {
            // Lost a race with another login of the same name
            collaborators.queue.remove(address);
            return reject("already verifying", &gate.already_verifying);
        }
        let ticket = Ticket {
            profile: GameProfile::offline(username),
            address,
            version,
            verifying: Arc::clone(&self.verifying),
            collaborators: collaborators.clone(),
        };

        if !assets.name_regex.is_match(username) {
            return reject("invalid username", &gate.invalid_username);
        }
        if collaborators.verified.has(address, username) {
            return GateDecision::Bypass(ticket.profile.clone());
        }
        GateDecision::Verify(ticket)
    }
}
