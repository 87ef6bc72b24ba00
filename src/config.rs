//! Device-configurable activation knobs.
//!
//! Fixed protocol constants (the 15 s auth wait, DCB carrier waits, PPPoE
//! reconnect delay) live next to the state machines that use them; this
//! module only carries the values an administrator may tune per device.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable activation parameters for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Overall supplicant connection timeout, in seconds. Armed while the
    /// supplicant is associating.
    pub supplicant_timeout_secs: u64,
    /// How many times to re-prompt for secrets before failing an
    /// authentication with `NoSecrets`.
    pub auth_retries: u32,
}

impl ActivationConfig {
    /// The supplicant connection timeout as a [`Duration`].
    pub fn supplicant_timeout(&self) -> Duration {
        Duration::from_secs(self.supplicant_timeout_secs)
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            supplicant_timeout_secs: 25,
            auth_retries: 3,
        }
    }
}
