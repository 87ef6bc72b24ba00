//! Platform link capability contract.
//!
//! The netlink layer itself is an external collaborator; the activation
//! engine only consumes the narrow capability surface below.

use bitflags::bitflags;

use crate::types::LinkNegotiation;

bitflags! {
    /// Wake-on-LAN trigger mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct WolOptions: u32 {
        /// Wake on PHY activity.
        const PHY = 1 << 0;
        /// Wake on unicast messages.
        const UNICAST = 1 << 1;
        /// Wake on multicast messages.
        const MULTICAST = 1 << 2;
        /// Wake on broadcast messages.
        const BROADCAST = 1 << 3;
        /// Wake on ARP.
        const ARP = 1 << 4;
        /// Wake on magic packet.
        const MAGIC = 1 << 5;
    }
}

/// Link-layer properties reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkProperties {
    /// Kernel interface index; `0` while the link is not yet realized.
    pub ifindex: u32,
    /// Whether the link reports carrier.
    pub carrier: bool,
    /// Current link speed in megabits per second, `0` when unknown.
    pub speed_mbps: u32,
}

/// Errors reported by the platform link layer.
#[derive(thiserror::Error, Debug)]
pub enum PlatformError {
    /// A netlink/ethtool operation failed.
    #[error("platform operation {operation} failed: {reason}")]
    OperationFailed {
        /// The operation that failed.
        operation: &'static str,
        /// The reason the operation failed.
        reason: String,
    },

    /// The hardware does not support the requested attribute.
    #[error("link attribute {0} not supported by this device")]
    Unsupported(&'static str),
}

/// Capability surface the orchestrator consumes from the platform.
///
/// Implementations must initiate and return without blocking the control
/// task; these calls are all synchronous kernel round-trips in practice.
pub trait LinkPort: Send + Sync {
    /// Current carrier state of the link.
    fn carrier(&self) -> bool;

    /// Set the interface MTU.
    ///
    /// # Errors
    /// Returns [`PlatformError`] when the kernel rejects the value. Treated
    /// as best-effort by the orchestrator.
    fn set_mtu(&self, mtu: u32) -> Result<(), PlatformError>;

    /// Apply explicit link negotiation settings.
    ///
    /// # Errors
    /// Returns [`PlatformError`] on failure; the orchestrator aborts the
    /// activation with `ConfigFailed`.
    fn set_link_negotiation(&self, negotiation: &LinkNegotiation) -> Result<(), PlatformError>;

    /// Configure wake-on-LAN triggers.
    ///
    /// # Errors
    /// Returns [`PlatformError`] on failure. Treated as best-effort by the
    /// orchestrator.
    fn set_wake_on_lan(&self, options: WolOptions, password: Option<&str>)
    -> Result<(), PlatformError>;
}
