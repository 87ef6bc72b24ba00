//! Per-activation 802.1X supplicant session.
//!
//! The session owns the lifecycle of one supplicant interface handle:
//! create, associate, authenticate, ready or failed. Two watchdogs guard
//! the exchange — the device-configurable association timeout while the
//! supplicant associates, and the fixed authentication wait once it has
//! associated. At most one of the two is armed at any instant, and both are
//! cleared on teardown.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    AuthState, InterfaceState, SupplicantConfig, SupplicantDriver, SupplicantHandle,
    SupplicantManager,
};
use crate::{
    event::EventSink,
    timer::{EventId, TimedEvent, TimerHost},
    types::{FailureReason, Security8021x},
};

/// How long to wait for authentication to complete after association.
pub(crate) const AUTH_WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Phase of the supplicant session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// Interface creation requested, waiting for the handle.
    Starting,
    /// Association request submitted.
    Associating,
    /// Associated, authentication exchange pending.
    Associated,
    /// Authentication finished.
    Completed,
    /// Torn down or lost.
    Down,
}

/// What a session event means for the orchestrator.
///
/// Exactly one of `Ready` or `Failed` is signaled per session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionSignal {
    /// Nothing for the orchestrator to act on yet.
    Continue,
    /// The session is usable; stage 2 can be re-entered.
    Ready,
    /// The session failed terminally.
    Failed(FailureReason),
    /// Fresh credentials are needed; the orchestrator applies its
    /// ask-new-secrets-or-fail policy.
    NeedNewSecrets,
}

#[derive(Debug)]
pub(crate) struct SupplicantSession {
    state: SessionState,
    handle: Option<SupplicantHandle>,
    assoc_timeout: Option<EventId>,
    auth_wait: Option<EventId>,
    ready: bool,
    /// Optional-auth fallback engaged: the port is used unauthenticated
    /// while auth-state changes are still observed.
    tolerated: bool,
}

impl SupplicantSession {
    /// Request a supplicant interface and return the tracking session.
    pub(crate) fn start(
        ifindex: u32,
        driver: SupplicantDriver,
        manager: &dyn SupplicantManager,
        sink: &EventSink,
    ) -> Self {
        debug!(ifindex, ?driver, "creating supplicant interface");
        manager.create_interface(ifindex, driver, sink);
        Self {
            state: SessionState::Starting,
            handle: None,
            assoc_timeout: None,
            auth_wait: None,
            ready: false,
            tolerated: false,
        }
    }

    pub(crate) fn ready(&self) -> bool {
        self.ready
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn armed_timers(&self) -> (Option<EventId>, Option<EventId>) {
        (self.assoc_timeout, self.auth_wait)
    }

    /// The interface handle arrived; submit the association request and arm
    /// the association watchdog.
    pub(crate) fn on_interface_ready(
        &mut self,
        handle: SupplicantHandle,
        manager: &dyn SupplicantManager,
        timers: &dyn TimerHost,
        security: &Security8021x,
        assoc_timeout: Duration,
    ) -> Result<(), FailureReason> {
        let config = SupplicantConfig::from_security(security).map_err(|err| {
            warn!(%err, "could not build supplicant configuration");
            FailureReason::SupplicantConfigFailed
        })?;
        manager.associate(handle, &config).map_err(|err| {
            warn!(%err, "association request rejected");
            FailureReason::SupplicantConfigFailed
        })?;

        self.handle = Some(handle);
        self.state = SessionState::Associating;
        debug_assert!(self.auth_wait.is_none());
        self.assoc_timeout = Some(timers.arm(assoc_timeout, TimedEvent::SupplicantAssoc));
        Ok(())
    }

    /// Process an interface state transition.
    pub(crate) fn on_state_changed(
        &mut self,
        state: InterfaceState,
        manager: &dyn SupplicantManager,
        timers: &dyn TimerHost,
    ) -> SessionSignal {
        match state {
            InterfaceState::Associated => {
                if let Some(id) = self.assoc_timeout.take() {
                    timers.disarm(id);
                }
                self.state = SessionState::Associated;
                // The interface may have raced straight through the
                // authentication exchange.
                let completed = self
                    .handle
                    .is_some_and(|h| manager.state(h) == InterfaceState::Completed);
                if completed {
                    self.complete(timers);
                    return SessionSignal::Ready;
                }
                debug_assert!(self.assoc_timeout.is_none());
                self.auth_wait = Some(timers.arm(AUTH_WAIT_TIMEOUT, TimedEvent::SupplicantAuthWait));
                SessionSignal::Continue
            }
            InterfaceState::Completed => {
                self.complete(timers);
                SessionSignal::Ready
            }
            InterfaceState::Down => {
                self.clear_timers(timers);
                self.state = SessionState::Down;
                SessionSignal::Failed(FailureReason::SupplicantFailed)
            }
            InterfaceState::Disconnected => {
                if self.state == SessionState::Completed {
                    // Post-completion disconnect: give the authenticator one
                    // link-timeout window to come back before failing.
                    debug!("supplicant disconnected after completion; arming link timeout");
                    self.state = SessionState::Associated;
                    debug_assert!(self.assoc_timeout.is_none());
                    if self.auth_wait.is_none() {
                        self.auth_wait =
                            Some(timers.arm(AUTH_WAIT_TIMEOUT, TimedEvent::SupplicantAuthWait));
                    }
                } else {
                    // The association watchdog decides whether this is fatal.
                    debug!("supplicant interface disconnected");
                }
                SessionSignal::Continue
            }
            InterfaceState::Initializing | InterfaceState::Ready | InterfaceState::Associating => {
                SessionSignal::Continue
            }
        }
    }

    /// Whether `id` is the armed association watchdog; consumes the slot
    /// when it matches.
    pub(crate) fn claim_assoc_timeout(&mut self, id: EventId) -> bool {
        if self.assoc_timeout == Some(id) {
            self.assoc_timeout = None;
            return true;
        }
        false
    }

    /// Whether `id` is the armed authentication wait; consumes the slot
    /// when it matches.
    pub(crate) fn claim_auth_wait(&mut self, id: EventId) -> bool {
        if self.auth_wait == Some(id) {
            self.auth_wait = None;
            return true;
        }
        false
    }

    /// The association watchdog fired before the exchange completed.
    ///
    /// A profile that has authenticated successfully before fails silently
    /// so the caller may retry with the cached secrets; one that never has
    /// is asked for fresh credentials.
    pub(crate) fn on_assoc_timeout(&mut self, seen_before: bool) -> SessionSignal {
        if self.state == SessionState::Completed {
            return SessionSignal::Continue;
        }
        warn!(seen_before, "supplicant association timed out");
        if seen_before {
            SessionSignal::Failed(FailureReason::SupplicantDisconnect)
        } else {
            SessionSignal::NeedNewSecrets
        }
    }

    /// The authentication wait fired after association.
    pub(crate) fn on_auth_wait_timeout(
        &mut self,
        device_activated: bool,
        optional: bool,
    ) -> SessionSignal {
        if self.state == SessionState::Completed {
            return SessionSignal::Continue;
        }
        if device_activated {
            // Post-activation disconnect: the link was up and authentication
            // stopped answering.
            return SessionSignal::Failed(FailureReason::SupplicantTimeout);
        }
        if optional {
            info!("802.1X authenticator did not answer; proceeding unauthenticated");
            self.tolerated = true;
            self.ready = true;
            return SessionSignal::Ready;
        }
        SessionSignal::NeedNewSecrets
    }

    /// Observe an authentication state change.
    ///
    /// In the optional-auth fallback this is the late success path; the
    /// session is already marked ready, so a success only upgrades the
    /// recorded state.
    pub(crate) fn on_auth_changed(&mut self, auth: AuthState) {
        match auth {
            AuthState::Success if self.tolerated && self.state != SessionState::Completed => {
                info!("802.1X authentication completed after fallback");
                self.state = SessionState::Completed;
            }
            AuthState::Failure => {
                debug!("802.1X authentication attempt failed");
            }
            _ => {}
        }
    }

    /// Release the interface handle and clear both watchdogs.
    pub(crate) fn teardown(&mut self, manager: &dyn SupplicantManager, timers: &dyn TimerHost) {
        self.clear_timers(timers);
        if let Some(handle) = self.handle.take() {
            manager.disconnect(handle);
        }
        self.state = SessionState::Down;
        self.ready = false;
    }

    fn complete(&mut self, timers: &dyn TimerHost) {
        self.clear_timers(timers);
        self.state = SessionState::Completed;
        self.ready = true;
    }

    fn clear_timers(&mut self, timers: &dyn TimerHost) {
        if let Some(id) = self.assoc_timeout.take() {
            timers.disarm(id);
        }
        if let Some(id) = self.auth_wait.take() {
            timers.disarm(id);
        }
    }
}
