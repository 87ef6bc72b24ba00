//! Uplink - per-interface network device activation engine.
//!
//! Uplink coordinates the asynchronous pieces of bringing a network
//! interface up - link-layer carrier events, an external 802.1X supplicant,
//! DCB/FCoE configuration tools, PPP subprocesses, and secret-agent round
//! trips - into one deterministic, resumable activation state machine per
//! device. The main features include:
//!
//! - A staged activation orchestrator (prepare, link configuration, IP
//!   configuration) with idempotent re-entry into each stage
//! - Strict timeout and cancellation discipline: every armed timer and
//!   in-flight request is owned by the device context and dies with it
//! - Capability ports for the platform, supplicant, secret agent, DCB tool,
//!   and PPP manager, injectable with mocks for testing
//! - A tokio actor shell with one control task per device and a watchable
//!   lifecycle state
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use uplink::{ActivationService, DeviceDescriptor, DeviceKind};
//!
//! let service = ActivationService::new();
//! // Devices are registered with their injected capability ports:
//! // let handle = service.add_device(descriptor, config, |sink| ports(sink));
//! // handle.activate(profile)?;
//! # let _ = service.device("eth0");
//! ```

/// Common utilities and reactive primitives.
pub mod common;

/// Device-configurable activation parameters.
pub mod config;

/// DCB/FCoE carrier-synchronized configuration.
pub mod dcb;

/// Device activation orchestrator.
pub mod device;

/// Activation engine errors.
pub mod error;

/// Typed per-device event inbox.
pub mod event;

/// Platform link capability contract.
pub mod platform;

/// PPP manager contract.
pub mod ppp;

/// PPPoE reconnect throttling.
pub mod pppoe;

/// Credentials brokering.
pub mod secrets;

/// Actor shell hosting the per-device state machines.
pub mod service;

/// 802.1X/MACsec supplicant integration.
pub mod supplicant;

/// Cancelable single-shot timers.
pub mod timer;

/// Tracing subscriber setup.
pub mod tracing_config;

/// Data model shared across the engine.
pub mod types;

pub use device::{Device, DeviceKind, Ports};
pub use error::ActivationError;
pub use service::{ActivationService, DeviceDescriptor, DeviceHandle};
pub use types::{ActivationState, ConnectionProfile, FailureReason};
