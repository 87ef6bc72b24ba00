//! 802.1X/MACsec supplicant integration.

/// Supplicant manager contract and wire-level enums.
mod manager;
/// Per-activation session state machine.
mod session;

pub use manager::{
    AuthState, InterfaceState, SupplicantConfig, SupplicantDriver, SupplicantError,
    SupplicantHandle, SupplicantManager,
};
pub(crate) use session::{SessionSignal, SupplicantSession};
