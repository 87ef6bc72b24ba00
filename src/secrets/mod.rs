//! Credentials brokering.
//!
//! The broker tracks exactly one outstanding secrets request per device.
//! The pending slot is an `Option`: it must be drained by a response or an
//! explicit cancel before a new request is issued, and `request` enforces
//! that by cancelling any live request first.

use std::collections::HashSet;

use bitflags::bitflags;
use tracing::{debug, error};

use crate::{event::EventSink, types::ConnectionProfile};

/// Setting name used for 802.1X credential requests.
pub const SETTING_8021X: &str = "802-1x";

bitflags! {
    /// Modifiers on a secrets request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SecretsFlags: u32 {
        /// The agent may prompt the user.
        const ALLOW_INTERACTION = 1 << 0;
        /// Cached secrets are stale; ask for fresh ones.
        const REQUEST_NEW = 1 << 1;
    }
}

/// Correlation id for one secrets request/response pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Credentials returned by a secret agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    /// Password/key for the setting that was asked for.
    pub password: String,
}

/// Outcome of a secrets request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretsResult {
    /// The request was cancelled; swallowed silently.
    Cancelled,
    /// The agent could not provide secrets.
    Error(String),
    /// Secrets are now available.
    Success(Secrets),
}

/// Capability surface of the pluggable secret agent.
///
/// `get_secrets` initiates and returns; the outcome arrives as a
/// `SecretsResponse` event through the sink, carrying the same request id.
pub trait SecretAgent: Send + Sync {
    /// Request secrets for one setting of the given profile.
    fn get_secrets(
        &self,
        profile: &ConnectionProfile,
        setting: &str,
        flags: SecretsFlags,
        request: RequestId,
        sink: &EventSink,
    );

    /// Cancel an in-flight request. The agent answers with
    /// [`SecretsResult::Cancelled`] (or not at all).
    fn cancel_secrets(&self, request: RequestId);
}

#[derive(Debug)]
struct PendingRequest {
    id: RequestId,
    setting: String,
    flags: SecretsFlags,
}

/// Per-device secrets request tracker.
#[derive(Debug, Default)]
pub(crate) struct SecretsBroker {
    next: u64,
    pending: Option<PendingRequest>,
    /// Requests cancelled while their response may still be in flight;
    /// late answers to these are swallowed without complaint.
    cancelled: HashSet<RequestId>,
}

impl SecretsBroker {
    /// Issue a request, cancelling any outstanding one first.
    pub(crate) fn request(
        &mut self,
        agent: &dyn SecretAgent,
        profile: &ConnectionProfile,
        setting: &str,
        flags: SecretsFlags,
        sink: &EventSink,
    ) -> RequestId {
        self.cancel(agent);
        self.next += 1;
        let id = RequestId(self.next);
        debug!(?id, setting, ?flags, "requesting secrets");
        agent.get_secrets(profile, setting, flags, id, sink);
        self.pending = Some(PendingRequest {
            id,
            setting: setting.to_owned(),
            flags,
        });
        id
    }

    /// Cancel the outstanding request, if any. No-op otherwise.
    pub(crate) fn cancel(&mut self, agent: &dyn SecretAgent) {
        if let Some(pending) = self.pending.take() {
            debug!(id = ?pending.id, "cancelling outstanding secrets request");
            agent.cancel_secrets(pending.id);
            self.cancelled.insert(pending.id);
        }
    }

    /// Match a response against the pending slot.
    ///
    /// Returns the flags of the answered request when the correlation id
    /// matches. A late answer to a cancelled request is swallowed silently.
    /// Any other id violates the strict request/response pairing and is a
    /// programming error; it is dropped (with a debug assertion) rather
    /// than aborting the control task.
    pub(crate) fn on_response(&mut self, id: RequestId) -> Option<SecretsFlags> {
        if self.cancelled.remove(&id) {
            debug!(?id, "secrets response for cancelled request dropped");
            return None;
        }
        match self.pending.take() {
            Some(pending) if pending.id == id => {
                debug!(?id, setting = %pending.setting, "secrets response received");
                Some(pending.flags)
            }
            Some(pending) => {
                debug_assert!(
                    false,
                    "secrets response {id:?} does not match outstanding {:?}",
                    pending.id
                );
                error!(
                    ?id,
                    outstanding = ?pending.id,
                    "secrets response correlation mismatch; dropping"
                );
                self.pending = Some(pending);
                None
            }
            None => {
                debug_assert!(false, "secrets response {id:?} with no request outstanding");
                error!(?id, "unsolicited secrets response dropped");
                None
            }
        }
    }

    /// Whether a request is outstanding.
    pub(crate) fn outstanding(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests;
