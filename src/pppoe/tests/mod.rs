//! Unit tests for the PPPoE reconnect governor.
//! Driven entirely through the manual timer host; no real time involved.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::time::Duration;

use crate::{
    pppoe::{RECONNECT_DELAY_MS, ReconnectGovernor},
    timer::{ManualTimers, TimedEvent, TimerHost},
    types::StageOutcome,
};

#[test]
fn no_teardown_recorded_passes_immediately() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    assert_eq!(governor.check(&timers), StageOutcome::Success);
    assert!(timers.pending().is_empty());
}

#[test]
fn recent_teardown_postpones_for_exact_remainder() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    timers.advance(Duration::from_millis(3000));

    assert_eq!(governor.check(&timers), StageOutcome::Postpone);

    let pending = timers.pending();
    assert_eq!(pending.len(), 1);
    let (_, remaining, event) = pending[0];
    assert_eq!(event, TimedEvent::PppoeReconnect);
    assert_eq!(remaining, Duration::from_millis(RECONNECT_DELAY_MS - 3000));
}

#[test]
fn reentrant_check_arms_no_second_timer() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);

    assert_eq!(timers.pending().len(), 1);
}

#[test]
fn timer_fire_clears_record() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    timers.advance(Duration::from_millis(3000));
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);

    let fired = timers.advance(Duration::from_millis(4000));
    assert_eq!(fired.len(), 1);
    let (id, event) = fired[0];
    assert_eq!(event, TimedEvent::PppoeReconnect);

    assert!(governor.on_timer(id));
    assert_eq!(governor.check(&timers), StageOutcome::Success);
}

#[test]
fn elapsed_delay_passes_without_timer() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    timers.advance(Duration::from_millis(RECONNECT_DELAY_MS));

    assert_eq!(governor.check(&timers), StageOutcome::Success);
    assert!(timers.pending().is_empty());
    // The record is cleared as well.
    assert_eq!(governor.check(&timers), StageOutcome::Success);
}

#[test]
fn stale_timer_id_is_ignored() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
    let stale = timers.arm(Duration::from_secs(1), TimedEvent::PppoeReconnect);

    assert!(!governor.on_timer(stale));
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
}

#[test]
fn clear_timer_keeps_teardown_record() {
    let timers = ManualTimers::new();
    let mut governor = ReconnectGovernor::default();

    governor.note_teardown(timers.now());
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
    governor.clear_timer(&timers);
    assert!(timers.pending().is_empty());

    // The delay still applies to the next attempt.
    assert_eq!(governor.check(&timers), StageOutcome::Postpone);
    assert_eq!(timers.pending().len(), 1);
}
