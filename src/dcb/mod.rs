//! DCB/FCoE carrier-synchronized configuration.
//!
//! Enabling DCB bounces the link, and the external configuration commands
//! only stick once the carrier has settled. The sequencer below waits for
//! the expected carrier transitions at each point of the
//! enable -> configure flow, with a timeout fallback at every step so the
//! sequence always makes forward progress even on hardware whose carrier
//! never toggles.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    timer::{EventId, TimedEvent, TimerHost},
    types::DcbSettings,
};

/// Carrier wait before enabling DCB.
const PREENABLE_UP_TIMEOUT: Duration = Duration::from_secs(4);
/// Carrier-down wait after an enable/setup command.
const CARRIER_DOWN_TIMEOUT: Duration = Duration::from_secs(3);
/// Carrier-up wait after the link bounced.
const CARRIER_UP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors reported by the external DCB tool.
#[derive(thiserror::Error, Debug)]
pub enum DcbError {
    /// A dcbtool/fcoeadm invocation failed.
    #[error("DCB {operation} failed on {iface}: {reason}")]
    Command {
        /// The operation that failed.
        operation: &'static str,
        /// Interface the command ran against.
        iface: String,
        /// Failure detail.
        reason: String,
    },
}

/// Capability surface of the external DCB configuration tool.
pub trait DcbTool: Send + Sync {
    /// Enable or disable DCB on an interface.
    ///
    /// # Errors
    /// Returns [`DcbError`] when the external command fails.
    fn enable(&self, iface: &str, enable: bool) -> Result<(), DcbError>;

    /// Apply priority-flow-control/FCoE settings.
    ///
    /// # Errors
    /// Returns [`DcbError`] when the external command fails.
    fn setup(&self, iface: &str, settings: &DcbSettings) -> Result<(), DcbError>;

    /// Remove DCB configuration from an interface.
    ///
    /// # Errors
    /// Returns [`DcbError`] when the external command fails.
    fn cleanup(&self, iface: &str) -> Result<(), DcbError>;
}

/// Carrier transition the sequencer is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DcbWait {
    /// No wait in progress.
    #[default]
    None,
    /// Waiting for carrier before enabling DCB.
    CarrierPreenableUp,
    /// Waiting for the link to bounce down after the enable command.
    CarrierPreconfigDown,
    /// Waiting for the link to come back before applying configuration.
    CarrierPreconfigUp,
    /// Waiting for the link to bounce down after the setup command.
    CarrierPostconfigDown,
    /// Waiting for the link to come back after configuration.
    CarrierPostconfigUp,
}

/// Progress report handed back to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DcbProgress {
    /// Still waiting on a carrier transition or timeout.
    Waiting,
    /// The sequence finished; stage 2 may complete.
    Ready,
    /// An external command failed.
    Failed,
}

/// The nested carrier-wait state machine for one device.
#[derive(Debug, Default)]
pub(crate) struct DcbSequencer {
    wait: DcbWait,
    timeout: Option<EventId>,
    enabled: bool,
}

impl DcbSequencer {
    /// Current wait state.
    pub(crate) fn wait(&self) -> DcbWait {
        self.wait
    }

    /// Whether a sequence is underway.
    pub(crate) fn in_progress(&self) -> bool {
        self.wait != DcbWait::None
    }

    /// Whether the enable command has been issued, meaning deactivation
    /// should run the cleanup command.
    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    /// Start the enable -> configure sequence.
    pub(crate) fn begin(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        debug_assert!(!self.in_progress());
        if carrier {
            self.enable_step(carrier, iface, settings, tool, timers)
        } else {
            self.enter_wait(DcbWait::CarrierPreenableUp, PREENABLE_UP_TIMEOUT, timers);
            DcbProgress::Waiting
        }
    }

    /// A carrier transition arrived; advance if it is the one being waited
    /// for.
    pub(crate) fn on_carrier(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        match (self.wait, carrier) {
            (DcbWait::CarrierPreenableUp, true) => {
                self.clear_timeout(timers);
                self.enable_step(carrier, iface, settings, tool, timers)
            }
            (DcbWait::CarrierPreconfigDown, false) => {
                self.clear_timeout(timers);
                self.enter_preconfig_up(carrier, iface, settings, tool, timers)
            }
            (DcbWait::CarrierPreconfigUp, true) => {
                self.clear_timeout(timers);
                self.setup_step(carrier, iface, settings, tool, timers)
            }
            (DcbWait::CarrierPostconfigDown, false) => {
                self.clear_timeout(timers);
                self.enter_postconfig_up(carrier, timers)
            }
            (DcbWait::CarrierPostconfigUp, true) => {
                self.clear_timeout(timers);
                self.finish()
            }
            _ => {
                debug!(wait = ?self.wait, carrier, "carrier change not awaited; ignoring");
                DcbProgress::Waiting
            }
        }
    }

    /// The wait timeout fired; proceed as if the carrier had cooperated.
    ///
    /// A timeout is success-with-warning, never a failure: only explicit
    /// external-command failures abort the sequence.
    pub(crate) fn on_timeout(
        &mut self,
        id: EventId,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        if self.timeout != Some(id) {
            debug!(?id, "stale DCB timeout ignored");
            return DcbProgress::Waiting;
        }
        self.timeout = None;
        warn!(wait = ?self.wait, "carrier did not settle in time; continuing DCB sequence");
        match self.wait {
            DcbWait::CarrierPreenableUp => self.enable_step(carrier, iface, settings, tool, timers),
            DcbWait::CarrierPreconfigDown => {
                self.enter_preconfig_up(carrier, iface, settings, tool, timers)
            }
            DcbWait::CarrierPreconfigUp => self.setup_step(carrier, iface, settings, tool, timers),
            DcbWait::CarrierPostconfigDown => self.enter_postconfig_up(carrier, timers),
            DcbWait::CarrierPostconfigUp => self.finish(),
            DcbWait::None => DcbProgress::Waiting,
        }
    }

    /// Abort any wait in progress, disarming the pending timeout.
    ///
    /// The `enabled` flag survives so deactivation knows to run cleanup.
    pub(crate) fn clear(&mut self, timers: &dyn TimerHost) {
        self.clear_timeout(timers);
        self.wait = DcbWait::None;
    }

    /// Forget that DCB was enabled, after cleanup has run.
    pub(crate) fn reset(&mut self) {
        self.enabled = false;
    }

    fn enable_step(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        if let Err(err) = tool.enable(iface, true) {
            warn!(%err, "DCB enable failed");
            self.wait = DcbWait::None;
            return DcbProgress::Failed;
        }
        self.enabled = true;
        self.enter_preconfig_down(carrier, iface, settings, tool, timers)
    }

    fn setup_step(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        if let Err(err) = tool.setup(iface, settings) {
            warn!(%err, "DCB setup failed");
            self.wait = DcbWait::None;
            return DcbProgress::Failed;
        }
        self.enter_postconfig_down(carrier, timers)
    }

    fn enter_preconfig_down(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        if !carrier {
            // Link already bounced; fall through to the up-wait.
            return self.enter_preconfig_up(carrier, iface, settings, tool, timers);
        }
        self.enter_wait(DcbWait::CarrierPreconfigDown, CARRIER_DOWN_TIMEOUT, timers);
        DcbProgress::Waiting
    }

    fn enter_preconfig_up(
        &mut self,
        carrier: bool,
        iface: &str,
        settings: &DcbSettings,
        tool: &dyn DcbTool,
        timers: &dyn TimerHost,
    ) -> DcbProgress {
        if carrier {
            return self.setup_step(carrier, iface, settings, tool, timers);
        }
        self.enter_wait(DcbWait::CarrierPreconfigUp, CARRIER_UP_TIMEOUT, timers);
        DcbProgress::Waiting
    }

    fn enter_postconfig_down(&mut self, carrier: bool, timers: &dyn TimerHost) -> DcbProgress {
        if !carrier {
            return self.enter_postconfig_up(carrier, timers);
        }
        self.enter_wait(DcbWait::CarrierPostconfigDown, CARRIER_DOWN_TIMEOUT, timers);
        DcbProgress::Waiting
    }

    fn enter_postconfig_up(&mut self, carrier: bool, timers: &dyn TimerHost) -> DcbProgress {
        if carrier {
            return self.finish();
        }
        self.enter_wait(DcbWait::CarrierPostconfigUp, CARRIER_UP_TIMEOUT, timers);
        DcbProgress::Waiting
    }

    fn finish(&mut self) -> DcbProgress {
        self.wait = DcbWait::None;
        debug!("DCB carrier sequence complete");
        DcbProgress::Ready
    }

    fn enter_wait(&mut self, wait: DcbWait, timeout: Duration, timers: &dyn TimerHost) {
        self.clear_timeout(timers);
        self.wait = wait;
        self.timeout = Some(timers.arm(timeout, TimedEvent::DcbCarrierWait));
    }

    fn clear_timeout(&mut self, timers: &dyn TimerHost) {
        if let Some(id) = self.timeout.take() {
            timers.disarm(id);
        }
    }
}
