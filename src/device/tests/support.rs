//! Recording mock ports and a deterministic harness for orchestrator tests.

#![allow(clippy::unwrap_used)]

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    config::ActivationConfig,
    dcb::{DcbError, DcbTool},
    device::{Device, DeviceKind, Ports},
    event::{DeviceEvent, EventSink},
    platform::{LinkPort, PlatformError, WolOptions},
    ppp::{IpFamily, PppConfig, PppError, PppIpData, PppManager, PppSessionId, PppState},
    secrets::{RequestId, SecretAgent, SecretsFlags},
    supplicant::{
        AuthState, InterfaceState, SupplicantConfig, SupplicantDriver, SupplicantError,
        SupplicantHandle, SupplicantManager,
    },
    timer::ManualTimers,
    types::{ConnectionProfile, LinkNegotiation},
};

#[derive(Default)]
pub(super) struct MockLink {
    pub(super) carrier: AtomicBool,
    pub(super) fail_negotiation: AtomicBool,
    pub(super) negotiations: AtomicUsize,
    pub(super) wol_calls: AtomicUsize,
    pub(super) mtu_calls: AtomicUsize,
}

impl LinkPort for MockLink {
    fn carrier(&self) -> bool {
        self.carrier.load(Ordering::SeqCst)
    }

    fn set_mtu(&self, _mtu: u32) -> Result<(), PlatformError> {
        self.mtu_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_link_negotiation(&self, _negotiation: &LinkNegotiation) -> Result<(), PlatformError> {
        self.negotiations.fetch_add(1, Ordering::SeqCst);
        if self.fail_negotiation.load(Ordering::SeqCst) {
            return Err(PlatformError::OperationFailed {
                operation: "set-link",
                reason: "ethtool refused".into(),
            });
        }
        Ok(())
    }

    fn set_wake_on_lan(
        &self,
        _options: WolOptions,
        _password: Option<&str>,
    ) -> Result<(), PlatformError> {
        self.wol_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct MockSupplicant {
    pub(super) created: Mutex<Vec<(u32, SupplicantDriver)>>,
    pub(super) associated: Mutex<Vec<SupplicantConfig>>,
    pub(super) disconnected: Mutex<Vec<SupplicantHandle>>,
    pub(super) state: Mutex<InterfaceState>,
}

impl Default for MockSupplicant {
    fn default() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            associated: Mutex::new(Vec::new()),
            disconnected: Mutex::new(Vec::new()),
            state: Mutex::new(InterfaceState::Ready),
        }
    }
}

impl MockSupplicant {
    pub(super) fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(super) fn associated_count(&self) -> usize {
        self.associated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(super) fn disconnected_count(&self) -> usize {
        self.disconnected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SupplicantManager for MockSupplicant {
    fn create_interface(&self, ifindex: u32, driver: SupplicantDriver, _sink: &EventSink) {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((ifindex, driver));
    }

    fn associate(
        &self,
        _handle: SupplicantHandle,
        config: &SupplicantConfig,
    ) -> Result<(), SupplicantError> {
        self.associated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config.clone());
        Ok(())
    }

    fn disconnect(&self, handle: SupplicantHandle) {
        self.disconnected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    fn state(&self, _handle: SupplicantHandle) -> InterfaceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn auth_state(&self, _handle: SupplicantHandle) -> AuthState {
        AuthState::Unknown
    }
}

#[derive(Default)]
pub(super) struct MockAgent {
    pub(super) requests: Mutex<Vec<(SecretsFlags, RequestId)>>,
    pub(super) cancelled: Mutex<Vec<RequestId>>,
}

impl MockAgent {
    pub(super) fn requests(&self) -> Vec<(SecretsFlags, RequestId)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn cancelled_count(&self) -> usize {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SecretAgent for MockAgent {
    fn get_secrets(
        &self,
        _profile: &ConnectionProfile,
        _setting: &str,
        flags: SecretsFlags,
        request: RequestId,
        _sink: &EventSink,
    ) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((flags, request));
    }

    fn cancel_secrets(&self, request: RequestId) {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

#[derive(Default)]
pub(super) struct MockDcb {
    pub(super) enables: AtomicUsize,
    pub(super) setups: AtomicUsize,
    pub(super) cleanups: AtomicUsize,
    pub(super) fail_enable: AtomicBool,
}

impl DcbTool for MockDcb {
    fn enable(&self, iface: &str, _enable: bool) -> Result<(), DcbError> {
        self.enables.fetch_add(1, Ordering::SeqCst);
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(DcbError::Command {
                operation: "enable",
                iface: iface.to_owned(),
                reason: "dcbtool exited 1".into(),
            });
        }
        Ok(())
    }

    fn setup(
        &self,
        _iface: &str,
        _settings: &crate::types::DcbSettings,
    ) -> Result<(), DcbError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cleanup(&self, _iface: &str) -> Result<(), DcbError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct MockPpp {
    next: AtomicU64,
    pub(super) started: Mutex<Vec<PppConfig>>,
    pub(super) destroyed: Mutex<Vec<PppSessionId>>,
    pub(super) state: Mutex<PppState>,
    pub(super) fail_start: AtomicBool,
}

impl Default for MockPpp {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            started: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            state: Mutex::new(PppState::Starting),
            fail_start: AtomicBool::new(false),
        }
    }
}

impl MockPpp {
    pub(super) fn started_count(&self) -> usize {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(super) fn destroyed_count(&self) -> usize {
        self.destroyed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(super) fn set_state(&self, state: PppState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl PppManager for MockPpp {
    fn start(&self, config: &PppConfig, _sink: &EventSink) -> Result<PppSessionId, PppError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(PppError::StartFailed("pppd missing".into()));
        }
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config.clone());
        Ok(PppSessionId(self.next.fetch_add(1, Ordering::SeqCst)))
    }

    fn destroy(&self, session: PppSessionId) {
        self.destroyed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }

    fn state(&self, _session: PppSessionId) -> PppState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ip_data(&self, _session: PppSessionId, _family: IpFamily) -> Option<PppIpData> {
        Some(PppIpData {
            address: IpAddr::V4(Ipv4Addr::new(10, 64, 0, 2)),
            prefix: 32,
            gateway: Some(IpAddr::V4(Ipv4Addr::new(10, 64, 0, 1))),
            mtu: Some(1492),
        })
    }
}

/// A device wired to recording mocks and manual timers, plus the receiving
/// half of its mailbox so tests can pump port-posted events through it.
pub(super) struct Harness {
    pub(super) device: Device,
    pub(super) rx: UnboundedReceiver<DeviceEvent>,
    pub(super) timers: Arc<ManualTimers>,
    pub(super) link: Arc<MockLink>,
    pub(super) supplicant: Arc<MockSupplicant>,
    pub(super) agent: Arc<MockAgent>,
    pub(super) dcb: Arc<MockDcb>,
    pub(super) ppp: Arc<MockPpp>,
}

impl Harness {
    pub(super) fn new(kind: DeviceKind, carrier: bool) -> Self {
        Self::with_config(kind, carrier, ActivationConfig::default())
    }

    pub(super) fn with_config(kind: DeviceKind, carrier: bool, config: ActivationConfig) -> Self {
        let (sink, rx) = EventSink::channel();
        let timers = Arc::new(ManualTimers::new());
        let link = Arc::new(MockLink::default());
        link.carrier.store(carrier, Ordering::SeqCst);
        let supplicant = Arc::new(MockSupplicant::default());
        let agent = Arc::new(MockAgent::default());
        let dcb = Arc::new(MockDcb::default());
        let ppp = Arc::new(MockPpp::default());

        let ports = Ports {
            link: link.clone(),
            supplicant: supplicant.clone(),
            secrets: agent.clone(),
            dcb: dcb.clone(),
            ppp: ppp.clone(),
            timers: timers.clone(),
        };
        let device = Device::new("eth0", 3, kind, config, ports, sink);

        Self {
            device,
            rx,
            timers,
            link,
            supplicant,
            agent,
            dcb,
            ppp,
        }
    }

    /// Drain mailbox events into the device.
    pub(super) fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.device.handle_event(event);
        }
    }

    /// Advance manual time, delivering every timer that fires.
    pub(super) fn advance(&mut self, by: Duration) {
        for (id, event) in self.timers.advance(by) {
            self.device.handle_event(DeviceEvent::Timer(id, event));
        }
        self.pump();
    }
}
