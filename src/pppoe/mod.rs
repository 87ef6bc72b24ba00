//! PPPoE reconnect throttling.
//!
//! Tearing down a PPPoE session and immediately re-establishing it confuses
//! some access concentrators, which still consider the old session live.
//! The governor records when the last session was torn down and delays the
//! next stage 1 prepare until a minimum idle period has passed.

use std::time::Instant;

use tracing::debug;

use crate::{
    timer::{EventId, TimedEvent, TimerHost},
    types::StageOutcome,
};

/// Minimum idle period between PPPoE teardown and re-establishment.
pub(crate) const RECONNECT_DELAY_MS: u64 = 7000;

/// Tracks the last PPPoE teardown and the delay timer for the next attempt.
#[derive(Debug, Default)]
pub(crate) struct ReconnectGovernor {
    last_teardown: Option<Instant>,
    timer: Option<EventId>,
}

impl ReconnectGovernor {
    /// Record that a PPPoE session was just torn down.
    pub(crate) fn note_teardown(&mut self, now: Instant) {
        self.last_teardown = Some(now);
    }

    /// Gate stage 1 prepare.
    ///
    /// Returns `Success` when enough idle time has passed (clearing the
    /// record), or `Postpone` with a timer armed for the remaining delay.
    /// Re-entrant: while the timer is outstanding no second timer is armed.
    pub(crate) fn check(&mut self, timers: &dyn TimerHost) -> StageOutcome {
        if self.timer.is_some() {
            return StageOutcome::Postpone;
        }
        let Some(torn_down) = self.last_teardown else {
            return StageOutcome::Success;
        };

        let delay = std::time::Duration::from_millis(RECONNECT_DELAY_MS);
        let elapsed = timers.now().saturating_duration_since(torn_down);
        if elapsed >= delay {
            self.last_teardown = None;
            return StageOutcome::Success;
        }

        let remaining = delay - elapsed;
        debug!(?remaining, "delaying PPPoE re-establishment");
        self.timer = Some(timers.arm(remaining, TimedEvent::PppoeReconnect));
        StageOutcome::Postpone
    }

    /// The delay timer fired. Returns whether stage 1 should be re-entered.
    pub(crate) fn on_timer(&mut self, id: EventId) -> bool {
        if self.timer == Some(id) {
            self.timer = None;
            self.last_teardown = None;
            return true;
        }
        debug!(?id, "stale PPPoE reconnect timer ignored");
        false
    }

    /// Disarm the delay timer, keeping the teardown record.
    pub(crate) fn clear_timer(&mut self, timers: &dyn TimerHost) {
        if let Some(id) = self.timer.take() {
            timers.disarm(id);
        }
    }
}

#[cfg(test)]
mod tests;
