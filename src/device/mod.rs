//! Device activation orchestrator.
//!
//! The orchestrator drives the per-interface activation sequence
//! (stage 1 prepare -> stage 2 link configuration -> stage 3 IP
//! configuration -> activated), sequencing the supplicant session, the DCB
//! carrier synchronizer, the secrets broker, and the PPPoE reconnect
//! governor. Sub-components report typed outcomes; only the orchestrator
//! moves the device between lifecycle states or records a failure reason.
//!
//! Stage 2 is a priority-ordered list of independently resumable sub-goals
//! (PPP session, 802.1X, wake-on-LAN, DCB). Each sub-goal persists its
//! completion state in the context, so re-entering the stage after a
//! `Postpone` never repeats a side effect that already happened.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

/// Per-device activation state container.
mod context;

use context::DeviceContext;

use crate::{
    common::Property,
    config::ActivationConfig,
    dcb::{DcbProgress, DcbTool},
    error::ActivationError,
    event::{DeviceEvent, EventSink},
    platform::{LinkPort, LinkProperties},
    ppp::{IpFamily, PppConfig, PppManager, PppState},
    secrets::{SETTING_8021X, SecretAgent, SecretsFlags, SecretsResult},
    supplicant::{
        AuthState, InterfaceState, SessionSignal, SupplicantDriver, SupplicantHandle,
        SupplicantManager, SupplicantSession,
    },
    timer::{EventId, TimedEvent, TimerHost},
    types::{
        ActivationState, ConnectionKind, ConnectionProfile, FailureReason, Security8021x,
        StageOutcome,
    },
};

/// The kind of link a device context drives.
///
/// The activation protocol is shared; the kind only selects which stage 2
/// sub-goals can apply and which supplicant driver to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Physical Ethernet.
    Ethernet,
    /// Virtual Ethernet pair.
    Veth,
    /// MACsec link; activation always authenticates.
    Macsec,
}

impl DeviceKind {
    /// Whether a profile of the given connection kind can activate this
    /// device.
    pub fn supports(self, kind: ConnectionKind) -> bool {
        match self {
            DeviceKind::Ethernet => matches!(kind, ConnectionKind::Wired | ConnectionKind::Pppoe),
            DeviceKind::Veth => matches!(kind, ConnectionKind::Wired | ConnectionKind::Veth),
            DeviceKind::Macsec => kind == ConnectionKind::Macsec,
        }
    }

    pub(crate) fn supplicant_driver(self) -> SupplicantDriver {
        match self {
            DeviceKind::Macsec => SupplicantDriver::Macsec,
            DeviceKind::Ethernet | DeviceKind::Veth => SupplicantDriver::Wired,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Ethernet => "ethernet",
            DeviceKind::Veth => "veth",
            DeviceKind::Macsec => "macsec",
        };
        write!(f, "{name}")
    }
}

/// External capabilities injected into a device at construction.
///
/// The supplicant manager is one-per-process and shared across devices;
/// everything else may be shared or per-device as the embedder prefers.
pub struct Ports {
    /// Platform link operations.
    pub link: Arc<dyn LinkPort>,
    /// Shared supplicant manager.
    pub supplicant: Arc<dyn SupplicantManager>,
    /// Pluggable secret agent.
    pub secrets: Arc<dyn SecretAgent>,
    /// External DCB configuration tool.
    pub dcb: Arc<dyn DcbTool>,
    /// PPP process manager.
    pub ppp: Arc<dyn PppManager>,
    /// Timer host delivering fires into this device's inbox.
    pub timers: Arc<dyn TimerHost>,
}

/// One interface's activation state machine.
///
/// All methods run on the owning control task; events posted by ports are
/// fed through [`handle_event`](Self::handle_event) in enqueue order.
pub struct Device {
    ctx: DeviceContext,
    ports: Ports,
    events: EventSink,
    config: ActivationConfig,
}

impl Device {
    /// Create a device context in the `Disconnected` state.
    pub fn new(
        iface: impl Into<String>,
        ifindex: u32,
        kind: DeviceKind,
        config: ActivationConfig,
        ports: Ports,
        events: EventSink,
    ) -> Self {
        let carrier = ports.link.carrier();
        Self {
            ctx: DeviceContext::new(iface.into(), ifindex, kind, carrier),
            ports,
            events,
            config,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivationState {
        self.ctx.state()
    }

    /// Shareable handle on the lifecycle state for `get`/`watch`.
    pub fn state_property(&self) -> Property<ActivationState> {
        self.ctx.state.clone()
    }

    /// Failure reason of the last attempt, while the device is `Failed`.
    pub fn failure(&self) -> Option<FailureReason> {
        self.ctx.failure
    }

    /// Process one event from the device inbox.
    pub fn handle_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Activate(profile) => {
                if let Err(err) = self.activate(*profile) {
                    warn!(iface = %self.ctx.iface, %err, "activation request rejected");
                }
            }
            DeviceEvent::Deactivate | DeviceEvent::Shutdown => self.deactivate(),
            DeviceEvent::CarrierChanged(carrier) => self.on_carrier_changed(carrier),
            DeviceEvent::LinkChanged(props) => self.on_link_changed(props),
            DeviceEvent::Timer(id, timed) => self.on_timer(id, timed),
            DeviceEvent::SupplicantInterfaceReady(handle) => {
                self.on_supplicant_interface_ready(handle);
            }
            DeviceEvent::SupplicantInterfaceFailure(reason) => {
                self.on_supplicant_interface_failure(&reason);
            }
            DeviceEvent::SupplicantStateChanged(state) => self.on_supplicant_state(state),
            DeviceEvent::SupplicantAuthChanged(auth) => self.on_supplicant_auth(auth),
            DeviceEvent::SecretsResponse { request, result } => {
                self.on_secrets_response(request, result);
            }
            DeviceEvent::PppStateChanged(state) => self.on_ppp_state(state),
        }
    }

    /// Begin a new activation attempt.
    ///
    /// # Errors
    /// Returns [`ActivationError::InvalidState`] unless the device is
    /// `Disconnected` or `Failed`, and profile-validation errors when the
    /// profile cannot apply to this device.
    pub fn activate(&mut self, profile: ConnectionProfile) -> Result<(), ActivationError> {
        let state = self.ctx.state();
        if !matches!(
            state,
            ActivationState::Disconnected | ActivationState::Failed
        ) {
            return Err(ActivationError::InvalidState { state });
        }
        if !self.ctx.kind.supports(profile.kind) {
            return Err(ActivationError::ProfileMismatch {
                profile: profile.id.clone(),
                kind: format!("{:?}", profile.kind),
                device_kind: self.ctx.kind.to_string(),
            });
        }
        if profile.kind == ConnectionKind::Pppoe && profile.pppoe.is_none() {
            return Err(ActivationError::IncompleteProfile {
                profile: profile.id.clone(),
                reason: "PPPoE profile without pppoe settings".into(),
            });
        }
        if self.ctx.kind == DeviceKind::Macsec && profile.security.is_none() {
            return Err(ActivationError::IncompleteProfile {
                profile: profile.id.clone(),
                reason: "MACsec profile without 802.1X settings".into(),
            });
        }

        info!(iface = %self.ctx.iface, profile = %profile.id, "starting activation");
        if state == ActivationState::Failed {
            self.ctx.failure = None;
            self.ctx.set_state(ActivationState::Disconnected);
        }
        self.ctx.request = Some(profile);
        self.ctx.wol_applied = false;
        self.ctx.dcb_ready = false;
        self.ctx.awaiting_auth_carrier = false;
        self.ctx.auth_retries = self.config.auth_retries;
        self.ctx.carrier = self.ports.link.carrier();
        self.ctx.set_state(ActivationState::Prepare);
        self.stage1_prepare();
        Ok(())
    }

    /// Tear down the current activation unconditionally.
    ///
    /// Cancels every timer and in-flight request owned by the context; no
    /// further callback will be delivered once this returns. Idempotent.
    pub fn deactivate(&mut self) {
        let state = self.ctx.state();
        info!(iface = %self.ctx.iface, ?state, "deactivating");
        if !matches!(
            state,
            ActivationState::Disconnected | ActivationState::Failed | ActivationState::Deactivating
        ) {
            self.ctx.set_state(ActivationState::Deactivating);
        }
        self.teardown();
        self.ctx.request = None;
        self.ctx.set_state(ActivationState::Disconnected);
        self.ctx.failure = None;
    }

    /// Link-layer carrier changed.
    ///
    /// Advances a DCB carrier wait or a deferred 802.1X start; otherwise
    /// only records the new state.
    pub fn on_carrier_changed(&mut self, carrier: bool) {
        if self.ctx.carrier == carrier {
            return;
        }
        debug!(iface = %self.ctx.iface, carrier, "carrier changed");
        self.ctx.carrier = carrier;

        if self.ctx.dcb.in_progress() {
            let Some(settings) = self.dcb_settings() else {
                return;
            };
            let iface = self.ctx.iface.clone();
            let progress = self.ctx.dcb.on_carrier(
                carrier,
                &iface,
                &settings,
                self.ports.dcb.as_ref(),
                self.ports.timers.as_ref(),
            );
            self.handle_dcb_progress(progress);
            return;
        }

        if carrier
            && self.ctx.awaiting_auth_carrier
            && self.ctx.state() == ActivationState::Config
        {
            debug!(iface = %self.ctx.iface, "carrier up; starting deferred 802.1X");
            self.ctx.awaiting_auth_carrier = false;
            self.advance_stage2();
        }
    }

    /// Link properties changed (ifindex assignment, carrier, speed).
    pub fn on_link_changed(&mut self, props: LinkProperties) {
        debug!(iface = %self.ctx.iface, ?props, "link properties changed");
        if self.ctx.ifindex == 0 && props.ifindex != 0 {
            self.ctx.ifindex = props.ifindex;
            if self.ctx.state() == ActivationState::Config {
                // A PPPoE stage 2 may be waiting for the index.
                self.advance_stage2();
            }
        }
        if props.carrier != self.ctx.carrier {
            self.on_carrier_changed(props.carrier);
        }
    }

    // ---- stage drivers -------------------------------------------------

    fn stage1_prepare(&mut self) {
        if self.ctx.state() != ActivationState::Prepare {
            debug!(iface = %self.ctx.iface, "stage 1 entered outside Prepare; ignoring");
            return;
        }
        let Some(profile) = self.ctx.request.clone() else {
            self.fail(FailureReason::ConfigFailed);
            return;
        };

        if profile.kind == ConnectionKind::Pppoe {
            match self.ctx.pppoe.check(self.ports.timers.as_ref()) {
                StageOutcome::Postpone => {
                    debug!(iface = %self.ctx.iface, "stage 1 postponed for PPPoE reconnect delay");
                    return;
                }
                StageOutcome::Success | StageOutcome::Failure(_) => {}
            }
        }

        if let Some(negotiation) = profile.link {
            if let Err(err) = self.ports.link.set_link_negotiation(&negotiation) {
                warn!(iface = %self.ctx.iface, %err, "link negotiation failed");
                self.fail(FailureReason::ConfigFailed);
                return;
            }
        }

        self.ctx.set_state(ActivationState::Config);
        self.advance_stage2();
    }

    /// Re-enter stage 2 after a gating event fired.
    fn advance_stage2(&mut self) {
        if self.ctx.state() != ActivationState::Config {
            debug!(
                iface = %self.ctx.iface,
                state = ?self.ctx.state(),
                "stage 2 advance outside Config; ignoring"
            );
            return;
        }
        match self.stage2_subgoals() {
            StageOutcome::Success => {
                self.ctx.set_state(ActivationState::IpConfig);
                self.stage3_ip_config();
            }
            StageOutcome::Postpone => debug!(iface = %self.ctx.iface, "stage 2 postponed"),
            StageOutcome::Failure(reason) => self.fail(reason),
        }
    }

    fn stage2_subgoals(&mut self) -> StageOutcome {
        let Some(profile) = self.ctx.request.clone() else {
            return StageOutcome::Failure(FailureReason::ConfigFailed);
        };

        if profile.kind == ConnectionKind::Pppoe {
            match self.ppp_subgoal(&profile) {
                StageOutcome::Success => {}
                other => return other,
            }
        }

        if profile.kind != ConnectionKind::Pppoe {
            if let Some(security) = &profile.security {
                match self.auth_subgoal(security) {
                    StageOutcome::Success => {}
                    other => return other,
                }
            }
        }

        if profile.kind != ConnectionKind::Pppoe && !self.ctx.wol_applied {
            if let Some(wol) = &profile.wake_on_lan {
                if let Err(err) = self
                    .ports
                    .link
                    .set_wake_on_lan(wol.options, wol.password.as_deref())
                {
                    warn!(iface = %self.ctx.iface, %err, "wake-on-LAN configuration failed; continuing");
                }
            }
            self.ctx.wol_applied = true;
        }

        if !self.ctx.dcb_ready {
            if let Some(settings) = &profile.dcb {
                if self.ctx.dcb.in_progress() {
                    return StageOutcome::Postpone;
                }
                let iface = self.ctx.iface.clone();
                let progress = self.ctx.dcb.begin(
                    self.ctx.carrier,
                    &iface,
                    settings,
                    self.ports.dcb.as_ref(),
                    self.ports.timers.as_ref(),
                );
                match progress {
                    DcbProgress::Ready => self.ctx.dcb_ready = true,
                    DcbProgress::Waiting => return StageOutcome::Postpone,
                    DcbProgress::Failed => {
                        return StageOutcome::Failure(FailureReason::DcbFcoeFailed);
                    }
                }
            }
        }

        StageOutcome::Success
    }

    fn ppp_subgoal(&mut self, profile: &ConnectionProfile) -> StageOutcome {
        if let Some(session) = self.ctx.ppp_session {
            return match self.ports.ppp.state(session) {
                PppState::Running => StageOutcome::Success,
                PppState::Starting => StageOutcome::Postpone,
                PppState::Dead => StageOutcome::Failure(FailureReason::PppStartFailed),
            };
        }

        if self.ctx.ifindex == 0 {
            debug!(iface = %self.ctx.iface, "PPPoE start deferred until the link is realized");
            return StageOutcome::Postpone;
        }
        let Some(pppoe) = &profile.pppoe else {
            return StageOutcome::Failure(FailureReason::ConfigFailed);
        };
        let config = PppConfig {
            parent: self.ctx.iface.clone(),
            service: pppoe.service.clone(),
            username: pppoe.username.clone(),
        };
        match self.ports.ppp.start(&config, &self.events) {
            Ok(session) => {
                debug!(iface = %self.ctx.iface, ?session, "PPP session starting");
                self.ctx.ppp_session = Some(session);
                match self.ports.ppp.state(session) {
                    PppState::Running => StageOutcome::Success,
                    _ => StageOutcome::Postpone,
                }
            }
            Err(err) => {
                warn!(iface = %self.ctx.iface, %err, "PPP session start failed");
                StageOutcome::Failure(FailureReason::PppStartFailed)
            }
        }
    }

    fn auth_subgoal(&mut self, security: &Security8021x) -> StageOutcome {
        match &self.ctx.supplicant {
            Some(session) if session.ready() => StageOutcome::Success,
            Some(_) => StageOutcome::Postpone,
            None => {
                if !self.ctx.carrier {
                    debug!(iface = %self.ctx.iface, "802.1X start deferred until carrier-up");
                    self.ctx.awaiting_auth_carrier = true;
                    return StageOutcome::Postpone;
                }
                if security.password.is_none() {
                    self.request_secrets(SecretsFlags::ALLOW_INTERACTION);
                    return StageOutcome::Postpone;
                }
                let driver = self.ctx.kind.supplicant_driver();
                let session = SupplicantSession::start(
                    self.ctx.ifindex,
                    driver,
                    self.ports.supplicant.as_ref(),
                    &self.events,
                );
                self.ctx.supplicant = Some(session);
                StageOutcome::Postpone
            }
        }
    }

    fn stage3_ip_config(&mut self) {
        let Some(profile) = self.ctx.request.clone() else {
            self.fail(FailureReason::ConfigFailed);
            return;
        };

        if let Some(mtu) = profile.mtu {
            if let Err(err) = self.ports.link.set_mtu(mtu) {
                warn!(iface = %self.ctx.iface, %err, "MTU could not be applied; continuing");
            }
        }

        if profile.kind == ConnectionKind::Pppoe {
            if let Some(session) = self.ctx.ppp_session {
                match self.ports.ppp.ip_data(session, IpFamily::V4) {
                    Some(ip) => debug!(
                        iface = %self.ctx.iface,
                        address = %ip.address,
                        prefix = ip.prefix,
                        "PPP IPv4 configuration received"
                    ),
                    None => warn!(iface = %self.ctx.iface, "PPP session has no IPv4 configuration yet"),
                }
            }
        }

        self.ctx.set_state(ActivationState::IpCheck);
        self.ctx.set_state(ActivationState::Secondaries);
        self.ctx.set_state(ActivationState::Activated);
        info!(iface = %self.ctx.iface, "activation complete");
    }

    // ---- secrets flow --------------------------------------------------

    fn request_secrets(&mut self, flags: SecretsFlags) {
        let Some(profile) = self.ctx.request.clone() else {
            return;
        };
        self.ctx.set_state(ActivationState::NeedAuth);
        self.ctx.secrets.request(
            self.ports.secrets.as_ref(),
            &profile,
            SETTING_8021X,
            flags,
            &self.events,
        );
    }

    /// Shared policy for a failed or timed-out authentication: re-prompt
    /// for fresh secrets while retries remain, fail with `NoSecrets` once
    /// they are exhausted.
    fn ask_new_secrets_or_fail(&mut self) {
        if self.ctx.auth_retries == 0 {
            self.fail(FailureReason::NoSecrets);
            return;
        }
        self.ctx.auth_retries -= 1;
        self.teardown_supplicant();
        if let Some(profile) = &mut self.ctx.request {
            if let Some(security) = &mut profile.security {
                security.password = None;
            }
        }
        self.request_secrets(SecretsFlags::ALLOW_INTERACTION | SecretsFlags::REQUEST_NEW);
    }

    fn on_secrets_response(&mut self, request: crate::secrets::RequestId, result: SecretsResult) {
        let Some(_flags) = self.ctx.secrets.on_response(request) else {
            return;
        };
        match result {
            SecretsResult::Cancelled => {
                debug!(iface = %self.ctx.iface, "secrets request cancelled");
            }
            SecretsResult::Error(reason) => {
                warn!(iface = %self.ctx.iface, %reason, "secret agent could not provide secrets");
                self.ask_new_secrets_or_fail();
            }
            SecretsResult::Success(secrets) => {
                if let Some(profile) = &mut self.ctx.request {
                    if let Some(security) = &mut profile.security {
                        security.password = Some(secrets.password);
                    }
                }
                if self.ctx.state() == ActivationState::NeedAuth {
                    self.ctx.set_state(ActivationState::Config);
                    self.advance_stage2();
                }
            }
        }
    }

    // ---- supplicant flow -----------------------------------------------

    fn on_supplicant_interface_ready(&mut self, handle: SupplicantHandle) {
        let Some(security) = self
            .ctx
            .request
            .as_ref()
            .and_then(|profile| profile.security.clone())
        else {
            // Torn down since the request went out; release the handle.
            self.ports.supplicant.disconnect(handle);
            return;
        };
        let timeout = self.config.supplicant_timeout();
        let Some(session) = self.ctx.supplicant.as_mut() else {
            debug!(iface = %self.ctx.iface, "supplicant interface for torn-down session; releasing");
            self.ports.supplicant.disconnect(handle);
            return;
        };
        let result = session.on_interface_ready(
            handle,
            self.ports.supplicant.as_ref(),
            self.ports.timers.as_ref(),
            &security,
            timeout,
        );
        match result {
            Ok(()) => debug!(iface = %self.ctx.iface, "supplicant associating"),
            Err(reason) => {
                self.teardown_supplicant();
                self.fail(reason);
            }
        }
    }

    fn on_supplicant_interface_failure(&mut self, reason: &str) {
        if self.ctx.supplicant.is_none() {
            debug!(iface = %self.ctx.iface, "stale supplicant interface failure ignored");
            return;
        }
        warn!(iface = %self.ctx.iface, reason, "supplicant interface creation failed");
        self.teardown_supplicant();
        self.fail(FailureReason::SupplicantFailed);
    }

    fn on_supplicant_state(&mut self, state: InterfaceState) {
        let signal = match self.ctx.supplicant.as_mut() {
            Some(session) => session.on_state_changed(
                state,
                self.ports.supplicant.as_ref(),
                self.ports.timers.as_ref(),
            ),
            None => {
                debug!(iface = %self.ctx.iface, ?state, "stale supplicant state change ignored");
                return;
            }
        };
        self.handle_session_signal(signal);
    }

    fn on_supplicant_auth(&mut self, auth: AuthState) {
        if let Some(session) = self.ctx.supplicant.as_mut() {
            session.on_auth_changed(auth);
        }
    }

    fn handle_session_signal(&mut self, signal: SessionSignal) {
        match signal {
            SessionSignal::Continue => {}
            SessionSignal::Ready => {
                if self.ctx.state() == ActivationState::Config {
                    self.advance_stage2();
                }
            }
            SessionSignal::Failed(reason) => {
                self.teardown_supplicant();
                self.fail(reason);
            }
            SessionSignal::NeedNewSecrets => self.ask_new_secrets_or_fail(),
        }
    }

    fn teardown_supplicant(&mut self) {
        if let Some(mut session) = self.ctx.supplicant.take() {
            session.teardown(self.ports.supplicant.as_ref(), self.ports.timers.as_ref());
        }
    }

    // ---- ppp flow ------------------------------------------------------

    fn on_ppp_state(&mut self, state: PppState) {
        if self.ctx.ppp_session.is_none() {
            debug!(iface = %self.ctx.iface, ?state, "stale PPP state change ignored");
            return;
        }
        match state {
            PppState::Starting => {}
            PppState::Running => {
                self.ctx.ppp_ran = true;
                if self.ctx.state() == ActivationState::Config {
                    self.advance_stage2();
                }
            }
            PppState::Dead => {
                let device_state = self.ctx.state();
                if device_state == ActivationState::Activated {
                    self.fail(FailureReason::PppDisconnect);
                } else if device_state.is_activating() {
                    if self.ctx.ppp_ran {
                        self.fail(FailureReason::PppFailed);
                    } else {
                        self.fail(FailureReason::PppStartFailed);
                    }
                } else {
                    debug!(iface = %self.ctx.iface, "PPP session died outside activation");
                }
            }
        }
    }

    // ---- timers --------------------------------------------------------

    fn on_timer(&mut self, id: EventId, timed: TimedEvent) {
        match timed {
            TimedEvent::SupplicantAssoc => {
                let seen_before = self
                    .ctx
                    .request
                    .as_ref()
                    .is_some_and(ConnectionProfile::seen_before);
                let signal = match self.ctx.supplicant.as_mut() {
                    Some(session) => {
                        if session.claim_assoc_timeout(id) {
                            session.on_assoc_timeout(seen_before)
                        } else {
                            debug!(?id, "stale association timeout ignored");
                            return;
                        }
                    }
                    None => {
                        debug!(?id, "stale association timeout ignored");
                        return;
                    }
                };
                self.handle_session_signal(signal);
            }
            TimedEvent::SupplicantAuthWait => {
                let activated = self.ctx.state() == ActivationState::Activated;
                let optional = self
                    .ctx
                    .request
                    .as_ref()
                    .and_then(|profile| profile.security.as_ref())
                    .is_some_and(|security| security.optional);
                let signal = match self.ctx.supplicant.as_mut() {
                    Some(session) => {
                        if session.claim_auth_wait(id) {
                            session.on_auth_wait_timeout(activated, optional)
                        } else {
                            debug!(?id, "stale auth-wait timeout ignored");
                            return;
                        }
                    }
                    None => {
                        debug!(?id, "stale auth-wait timeout ignored");
                        return;
                    }
                };
                self.handle_session_signal(signal);
            }
            TimedEvent::DcbCarrierWait => {
                let Some(settings) = self.dcb_settings() else {
                    return;
                };
                let iface = self.ctx.iface.clone();
                let progress = self.ctx.dcb.on_timeout(
                    id,
                    self.ctx.carrier,
                    &iface,
                    &settings,
                    self.ports.dcb.as_ref(),
                    self.ports.timers.as_ref(),
                );
                self.handle_dcb_progress(progress);
            }
            TimedEvent::PppoeReconnect => {
                if self.ctx.pppoe.on_timer(id) && self.ctx.state() == ActivationState::Prepare {
                    self.stage1_prepare();
                }
            }
        }
    }

    // ---- dcb flow ------------------------------------------------------

    fn dcb_settings(&self) -> Option<crate::types::DcbSettings> {
        self.ctx
            .request
            .as_ref()
            .and_then(|profile| profile.dcb.clone())
    }

    fn handle_dcb_progress(&mut self, progress: DcbProgress) {
        match progress {
            DcbProgress::Waiting => {}
            DcbProgress::Ready => {
                self.ctx.dcb_ready = true;
                if self.ctx.state() == ActivationState::Config {
                    self.advance_stage2();
                }
            }
            DcbProgress::Failed => self.fail(FailureReason::DcbFcoeFailed),
        }
    }

    // ---- failure and teardown ------------------------------------------

    /// Record a failure reason and enter `Failed`.
    ///
    /// The sole path into `Failed`; a second failure during the same
    /// attempt keeps the original reason.
    fn fail(&mut self, reason: FailureReason) {
        if self.ctx.state() == ActivationState::Failed {
            warn!(iface = %self.ctx.iface, ?reason, "already failed; keeping original reason");
            return;
        }
        warn!(iface = %self.ctx.iface, ?reason, "activation failed");
        self.teardown();
        self.ctx.failure = Some(reason);
        self.ctx.set_state(ActivationState::Failed);
    }

    /// Release every sub-component and cancel every outstanding timer and
    /// request owned by the context.
    fn teardown(&mut self) {
        self.teardown_supplicant();
        self.ctx.awaiting_auth_carrier = false;
        self.ctx.secrets.cancel(self.ports.secrets.as_ref());

        self.ctx.dcb.clear(self.ports.timers.as_ref());
        if self.ctx.dcb.enabled() {
            if let Err(err) = self.ports.dcb.cleanup(&self.ctx.iface) {
                warn!(iface = %self.ctx.iface, %err, "DCB cleanup failed");
            }
            self.ctx.dcb.reset();
        }

        if let Some(session) = self.ctx.ppp_session.take() {
            self.ports.ppp.destroy(session);
        }
        self.ctx.ppp_ran = false;

        if self
            .ctx
            .request
            .as_ref()
            .is_some_and(|profile| profile.kind == ConnectionKind::Pppoe)
        {
            self.ctx.pppoe.note_teardown(self.ports.timers.now());
        }
        self.ctx.pppoe.clear_timer(self.ports.timers.as_ref());

        self.ctx.wol_applied = false;
        self.ctx.dcb_ready = false;
    }
}
