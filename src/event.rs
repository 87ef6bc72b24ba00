//! Typed per-device event inbox.
//!
//! Every asynchronous completion — timers, supplicant signals, secrets
//! responses, PPP state changes, link events — is delivered as a
//! [`DeviceEvent`] into the owning device's mailbox and processed by the
//! single state-transition entry point
//! [`Device::handle_event`](crate::device::Device::handle_event). Events for
//! one device are processed in the order they were enqueued.

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    platform::LinkProperties,
    ppp::PppState,
    secrets::{RequestId, SecretsResult},
    supplicant::{AuthState, InterfaceState, SupplicantHandle},
    timer::{EventId, TimedEvent},
    types::ConnectionProfile,
};

/// An event delivered to one device activation context.
#[derive(Debug)]
pub enum DeviceEvent {
    /// Begin or resume activation with the given profile.
    Activate(Box<ConnectionProfile>),
    /// Tear down the current activation.
    Deactivate,
    /// Link-layer carrier changed.
    CarrierChanged(bool),
    /// Link properties changed (ifindex assignment, carrier, speed).
    LinkChanged(LinkProperties),
    /// An armed timer fired.
    Timer(EventId, TimedEvent),
    /// The supplicant manager finished creating an interface handle.
    SupplicantInterfaceReady(SupplicantHandle),
    /// The supplicant manager failed to create an interface handle.
    SupplicantInterfaceFailure(String),
    /// The supplicant interface changed state.
    SupplicantStateChanged(InterfaceState),
    /// The supplicant reported an authentication state change.
    SupplicantAuthChanged(AuthState),
    /// A secrets request completed.
    SecretsResponse {
        /// Correlation id of the request this response answers.
        request: RequestId,
        /// The outcome.
        result: SecretsResult,
    },
    /// The PPP session changed state.
    PppStateChanged(PppState),
    /// Stop the device's control task after tearing down.
    Shutdown,
}

/// Clonable sender half of a device mailbox.
///
/// Ports hold a sink and post completions through it. Once the device's
/// control task has shut down, sends are dropped silently; identity
/// invalidation in the state machines makes any event already enqueued a
/// no-op.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl EventSink {
    /// Create a mailbox, returning the sink and the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post an event. Dropped silently when the device is gone.
    pub fn send(&self, event: DeviceEvent) {
        if self.tx.send(event).is_err() {
            debug!("event dropped, device mailbox closed");
        }
    }
}
