//! PPP manager contract.
//!
//! pppd process supervision is an external collaborator; the engine starts a
//! session, watches its state through the event inbox, and queries IP data
//! once the session runs.

use std::net::IpAddr;

use crate::event::EventSink;

/// Opaque identity of one PPP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PppSessionId(pub u64);

/// Lifecycle state of a PPP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PppState {
    /// pppd spawned, LCP/authentication still negotiating.
    Starting,
    /// The session is established and usable.
    Running,
    /// The session terminated.
    Dead,
}

/// Address family selector for [`PppManager::ip_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

/// IP configuration negotiated by a PPP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PppIpData {
    /// Local address.
    pub address: IpAddr,
    /// Prefix length.
    pub prefix: u8,
    /// Peer/gateway address, when negotiated.
    pub gateway: Option<IpAddr>,
    /// MTU reported by the peer, when any.
    pub mtu: Option<u32>,
}

/// Parameters for starting a PPPoE session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PppConfig {
    /// Parent Ethernet interface to encapsulate over.
    pub parent: String,
    /// Access concentrator service name, if required.
    pub service: Option<String>,
    /// PAP/CHAP username.
    pub username: String,
}

/// Errors reported by the PPP manager.
#[derive(thiserror::Error, Debug)]
pub enum PppError {
    /// pppd could not be spawned.
    #[error("failed to start PPP session: {0}")]
    StartFailed(String),
}

/// Capability surface the orchestrator consumes from the PPP manager.
///
/// `start` initiates and returns; subsequent state transitions arrive as
/// [`DeviceEvent::PppStateChanged`](crate::event::DeviceEvent::PppStateChanged)
/// through the sink.
pub trait PppManager: Send + Sync {
    /// Spawn a PPP session.
    ///
    /// # Errors
    /// Returns [`PppError`] when the process cannot be spawned at all.
    fn start(&self, config: &PppConfig, sink: &EventSink) -> Result<PppSessionId, PppError>;

    /// Destroy a session, terminating the underlying process. Idempotent.
    fn destroy(&self, session: PppSessionId);

    /// Current state of a session.
    fn state(&self, session: PppSessionId) -> PppState;

    /// IP configuration negotiated by a running session, when available.
    fn ip_data(&self, session: PppSessionId, family: IpFamily) -> Option<PppIpData>;
}
