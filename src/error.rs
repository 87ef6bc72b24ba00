use crate::types::ActivationState;

/// Activation engine errors surfaced through the public API.
#[derive(thiserror::Error, Debug)]
pub enum ActivationError {
    /// `activate` was called while the device was not in a state that
    /// accepts a new activation attempt.
    #[error("activation not allowed in state {state:?}; device must be Disconnected or Failed")]
    InvalidState {
        /// State the device was in when the call arrived.
        state: ActivationState,
    },

    /// The profile's connection type cannot be applied to this device.
    #[error("profile '{profile}' of kind {kind} cannot activate a {device_kind} device")]
    ProfileMismatch {
        /// Profile identifier.
        profile: String,
        /// Connection kind the profile carries.
        kind: String,
        /// Kind of the target device.
        device_kind: String,
    },

    /// The profile is missing a setting its connection type requires.
    #[error("profile '{profile}' is incomplete: {reason}")]
    IncompleteProfile {
        /// Profile identifier.
        profile: String,
        /// What is missing.
        reason: String,
    },

    /// No device with the given interface name is registered.
    #[error("device {0} not found")]
    DeviceNotFound(String),

    /// The device's control task has terminated and no longer accepts
    /// requests.
    #[error("device {0} is shut down")]
    DeviceShutDown(String),
}
