//! Activation lifecycle state types.

/// Lifecycle states of a device activation context.
///
/// Exactly one state is active at a time. Transitions move forward through
/// the activation sequence, with two sanctioned exceptions: a reset to
/// [`Disconnected`](Self::Disconnected) or [`Failed`](Self::Failed) from any
/// state, and the `NeedAuth` -> `Config` re-entry after secrets arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActivationState {
    /// The device is recognized but not managed by this engine.
    Unmanaged = 10,
    /// The device is managed but cannot be activated (no carrier, missing
    /// firmware, supplicant unavailable, etc).
    Unavailable = 20,
    /// The device can be activated and is currently idle.
    Disconnected = 30,
    /// The device is preparing the connection: link negotiation, PPPoE
    /// reconnect throttling, and anything else required before the link
    /// layer can be configured.
    Prepare = 40,
    /// The device is configuring the link layer: 802.1X authentication,
    /// wake-on-LAN, DCB/FCoE, PPP session establishment.
    Config = 50,
    /// The device requires credentials to continue; a secrets request is
    /// outstanding.
    NeedAuth = 60,
    /// The link layer is up and IP configuration is being applied.
    IpConfig = 70,
    /// IP configuration is done and post-configuration checks are running.
    IpCheck = 80,
    /// Waiting for dependent secondary connections.
    Secondaries = 90,
    /// The device has a network connection.
    Activated = 100,
    /// A disconnect was requested and owned resources are being released.
    Deactivating = 110,
    /// The activation attempt failed; the failure reason is recorded on the
    /// context until the next activation clears it.
    Failed = 120,
}

impl ActivationState {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Forward transitions are always legal. Resets to `Disconnected` or
    /// `Failed` are legal from any state, as is the `NeedAuth` -> `Config`
    /// re-entry once credentials have been delivered.
    pub fn allows_transition_to(self, next: ActivationState) -> bool {
        if next == ActivationState::Disconnected || next == ActivationState::Failed {
            return true;
        }
        if self == ActivationState::NeedAuth && next == ActivationState::Config {
            return true;
        }
        if self == ActivationState::Failed {
            // Out of Failed only via the Disconnected reset above.
            return false;
        }
        (next as u32) > (self as u32)
    }

    /// Whether the device is partway through an activation attempt.
    pub fn is_activating(self) -> bool {
        matches!(
            self,
            ActivationState::Prepare
                | ActivationState::Config
                | ActivationState::NeedAuth
                | ActivationState::IpConfig
                | ActivationState::IpCheck
                | ActivationState::Secondaries
        )
    }
}

/// Reason codes recorded when an activation attempt fails.
///
/// Sub-components report these through [`StageOutcome::Failure`]; only the
/// orchestrator transitions the device to `Failed` and records the reason,
/// so exactly one reason is recorded per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Local misconfiguration: missing required setting or an invalid
    /// applied connection.
    ConfigFailed,
    /// The 802.1X supplicant failed or the interface went down.
    SupplicantFailed,
    /// The supplicant rejected the association configuration.
    SupplicantConfigFailed,
    /// The supplicant took too long to authenticate.
    SupplicantTimeout,
    /// The supplicant disconnected during association.
    SupplicantDisconnect,
    /// Secrets were required but could not be obtained.
    NoSecrets,
    /// A DCB/FCoE enable or setup command failed.
    DcbFcoeFailed,
    /// The PPP session could not be started.
    PppStartFailed,
    /// The PPP session died while the connection was being established.
    PppFailed,
    /// The PPP session disconnected after activation completed.
    PppDisconnect,
}

/// Outcome of a single activation stage or sub-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage completed; the orchestrator advances to the next one.
    Success,
    /// The stage suspended pending an asynchronous event and will be
    /// re-entered when that event fires.
    Postpone,
    /// The stage failed; the orchestrator fails the activation with the
    /// given reason.
    Failure(FailureReason),
}
