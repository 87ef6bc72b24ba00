//! Per-device activation context.

use tracing::{info, warn};

use crate::{
    common::Property,
    dcb::DcbSequencer,
    ppp::PppSessionId,
    pppoe::ReconnectGovernor,
    secrets::SecretsBroker,
    supplicant::SupplicantSession,
    types::{ActivationState, ConnectionProfile, FailureReason},
};

use super::DeviceKind;

/// All state owned by one interface's activation attempt.
///
/// Sub-phase components live in `Option` slots (or carry their own idle
/// state): they exist exactly while their phase is underway, so "is a
/// session active" is answered by the type, not by a flag convention.
#[derive(Debug)]
pub(crate) struct DeviceContext {
    /// Interface name; immutable for the context's lifetime.
    pub(crate) iface: String,
    /// Kernel interface index; `0` until the link is realized.
    pub(crate) ifindex: u32,
    /// What kind of device this context drives.
    pub(crate) kind: DeviceKind,
    /// Externally observable lifecycle state.
    pub(crate) state: Property<ActivationState>,
    /// Failure reason; set only on entry to `Failed`, cleared on exit.
    pub(crate) failure: Option<FailureReason>,
    /// The connection profile being applied; replaced wholesale, never
    /// mutated in place (except for delivered secrets).
    pub(crate) request: Option<ConnectionProfile>,
    /// Last observed carrier state.
    pub(crate) carrier: bool,
    /// Live supplicant session, while 802.1X negotiation is underway.
    pub(crate) supplicant: Option<SupplicantSession>,
    /// Stage 2 deferred the supplicant start until carrier-up.
    pub(crate) awaiting_auth_carrier: bool,
    /// DCB carrier-wait sub-state machine.
    pub(crate) dcb: DcbSequencer,
    /// DCB sequence finished for this attempt.
    pub(crate) dcb_ready: bool,
    /// Wake-on-LAN has been applied for this attempt.
    pub(crate) wol_applied: bool,
    /// Secrets request tracker (at most one outstanding).
    pub(crate) secrets: SecretsBroker,
    /// Remaining secrets re-prompts before failing with `NoSecrets`.
    pub(crate) auth_retries: u32,
    /// PPPoE reconnect throttle.
    pub(crate) pppoe: ReconnectGovernor,
    /// Live PPP session, for PPPoE profiles.
    pub(crate) ppp_session: Option<PppSessionId>,
    /// The PPP session reached `Running` at least once.
    pub(crate) ppp_ran: bool,
}

impl DeviceContext {
    pub(crate) fn new(iface: String, ifindex: u32, kind: DeviceKind, carrier: bool) -> Self {
        Self {
            iface,
            ifindex,
            kind,
            state: Property::new(ActivationState::Disconnected),
            failure: None,
            request: None,
            carrier,
            supplicant: None,
            awaiting_auth_carrier: false,
            dcb: DcbSequencer::default(),
            dcb_ready: false,
            wol_applied: false,
            secrets: SecretsBroker::default(),
            auth_retries: 0,
            pppoe: ReconnectGovernor::default(),
            ppp_session: None,
            ppp_ran: false,
        }
    }

    pub(crate) fn state(&self) -> ActivationState {
        self.state.get()
    }

    /// Transition the lifecycle state, enforcing the forward-only rule.
    pub(crate) fn set_state(&mut self, next: ActivationState) {
        let current = self.state.get();
        if current == next {
            return;
        }
        if !current.allows_transition_to(next) {
            debug_assert!(false, "illegal transition {current:?} -> {next:?}");
            warn!(
                iface = %self.iface,
                ?current,
                ?next,
                "refusing illegal state transition"
            );
            return;
        }
        info!(iface = %self.iface, from = ?current, to = ?next, "device state changed");
        self.state.set(next);
    }
}
