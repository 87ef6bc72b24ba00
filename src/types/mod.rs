//! Data model shared across the activation engine.

/// Connection profile and settings structs.
pub mod profile;
/// Lifecycle states, failure reasons, and stage outcomes.
pub mod states;

pub use profile::{
    ConnectionKind, ConnectionProfile, DcbSettings, Duplex, EapMethod, FcoeMode, LinkNegotiation,
    PppoeSettings, Security8021x, WolConfig,
};
pub use states::{ActivationState, FailureReason, StageOutcome};
