//! Cancelable single-shot timers.
//!
//! Every timer armed by the activation engine is identified by an
//! [`EventId`]. A fired timer is delivered back into the owning device's
//! event inbox as [`DeviceEvent::Timer`](crate::event::DeviceEvent::Timer);
//! the state machine that armed it compares the id against the slot it keeps
//! and drops stale fires. Disarming removes the id from the live set, so a
//! canceled timer can never resolve to a callback.

use std::{
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::debug;

use crate::event::{DeviceEvent, EventSink};

/// Identity of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// What an armed timer is watching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    /// Supplicant association/connection timeout.
    SupplicantAssoc,
    /// Supplicant post-association authentication wait.
    SupplicantAuthWait,
    /// DCB carrier-wait phase timeout.
    DcbCarrierWait,
    /// PPPoE reconnect delay elapsed.
    PppoeReconnect,
}

/// Timer capability injected into each device.
pub trait TimerHost: Send + Sync {
    /// Arm a single-shot timer. The returned id is delivered with the fire
    /// event and must be kept by the caller to recognize it.
    fn arm(&self, delay: Duration, event: TimedEvent) -> EventId;

    /// Disarm a previously armed timer. Safe to call with an id that has
    /// already fired.
    fn disarm(&self, id: EventId);

    /// Current monotonic time, as seen by this host.
    fn now(&self) -> Instant;
}

/// Production timer host: one aborted-on-disarm tokio sleep task per timer.
pub struct TokioTimers {
    sink: EventSink,
    next: AtomicU64,
    tasks: Mutex<HashMap<EventId, tokio::task::JoinHandle<()>>>,
}

impl TokioTimers {
    /// Create a timer host posting fires into the given device inbox.
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            next: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn prune(tasks: &mut HashMap<EventId, tokio::task::JoinHandle<()>>) {
        tasks.retain(|_, handle| !handle.is_finished());
    }
}

impl TimerHost for TokioTimers {
    fn arm(&self, delay: Duration, event: TimedEvent) -> EventId {
        let id = EventId(self.next.fetch_add(1, Ordering::Relaxed));
        let sink = self.sink.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.send(DeviceEvent::Timer(id, event));
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        Self::prune(&mut tasks);
        tasks.insert(id, handle);
        id
    }

    fn disarm(&self, id: EventId) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = tasks.remove(&id) {
            handle.abort();
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in tasks.values() {
            handle.abort();
        }
    }
}

struct ArmedTimer {
    id: EventId,
    due: Instant,
    event: TimedEvent,
}

struct ManualInner {
    next: u64,
    now: Instant,
    armed: Vec<ArmedTimer>,
}

/// Deterministic timer host for tests and simulations.
///
/// Nothing fires on its own; the owner inspects [`pending`](Self::pending)
/// and advances simulated time with [`advance`](Self::advance), feeding the
/// returned fires into the device under test.
pub struct ManualTimers {
    inner: Mutex<ManualInner>,
}

impl ManualTimers {
    /// Create a manual timer host with simulated time starting now.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualInner {
                next: 1,
                now: Instant::now(),
                armed: Vec::new(),
            }),
        }
    }

    /// Snapshot of currently armed timers as `(id, remaining, event)`.
    pub fn pending(&self) -> Vec<(EventId, Duration, TimedEvent)> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .armed
            .iter()
            .map(|t| (t.id, t.due.saturating_duration_since(inner.now), t.event))
            .collect()
    }

    /// Advance simulated time, returning every timer that came due, in
    /// firing order. The caller delivers them to the device as
    /// `DeviceEvent::Timer` events.
    pub fn advance(&self, by: Duration) -> Vec<(EventId, TimedEvent)> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.now += by;
        let now = inner.now;
        let mut due: Vec<ArmedTimer> = Vec::new();
        inner.armed.retain_mut(|t| {
            if t.due <= now {
                due.push(ArmedTimer {
                    id: t.id,
                    due: t.due,
                    event: t.event,
                });
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.due);
        due.into_iter().map(|t| (t.id, t.event)).collect()
    }
}

impl Default for ManualTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHost for ManualTimers {
    fn arm(&self, delay: Duration, event: TimedEvent) -> EventId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = EventId(inner.next);
        inner.next += 1;
        let due = inner.now + delay;
        inner.armed.push(ArmedTimer { id, due, event });
        id
    }

    fn disarm(&self, id: EventId) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.armed.len();
        inner.armed.retain(|t| t.id != id);
        if inner.armed.len() == before {
            debug!(?id, "disarm of already-fired timer ignored");
        }
    }

    fn now(&self) -> Instant {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now
    }
}
