//! Actor shell hosting one activation state machine per interface.
//!
//! Each registered device runs on its own tokio task, draining a mailbox of
//! [`DeviceEvent`]s into the synchronous state machine. All handlers for one
//! device therefore run strictly sequentially, in enqueue order; nothing in
//! the engine blocks that task.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use futures::Stream;
use tracing::{debug, instrument, warn};

use crate::{
    common::Property,
    config::ActivationConfig,
    device::{Device, DeviceKind, Ports},
    error::ActivationError,
    event::{DeviceEvent, EventSink},
    platform::LinkProperties,
    types::{ActivationState, ConnectionProfile},
};

/// Identity of a device being registered.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Interface name.
    pub iface: String,
    /// Kernel interface index; `0` while the link is not yet realized.
    pub ifindex: u32,
    /// Device kind.
    pub kind: DeviceKind,
}

/// Handle on one hosted device.
///
/// Requests are posted into the device's mailbox and processed in order;
/// the lifecycle state is observable through [`state`](Self::state) and
/// [`watch_state`](Self::watch_state).
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    iface: String,
    sink: EventSink,
    state: Property<ActivationState>,
}

impl DeviceHandle {
    /// Begin activating the given profile.
    ///
    /// # Errors
    /// Returns [`ActivationError::InvalidState`] when the device is not
    /// currently eligible for a new attempt. The authoritative check runs
    /// on the control task; a request that races past this check is
    /// rejected there and logged.
    pub fn activate(&self, profile: ConnectionProfile) -> Result<(), ActivationError> {
        let state = self.state.get();
        if !matches!(
            state,
            ActivationState::Disconnected | ActivationState::Failed
        ) {
            return Err(ActivationError::InvalidState { state });
        }
        self.sink.send(DeviceEvent::Activate(Box::new(profile)));
        Ok(())
    }

    /// Tear down the current activation. Idempotent.
    pub fn deactivate(&self) {
        self.sink.send(DeviceEvent::Deactivate);
    }

    /// Deliver a carrier change.
    pub fn carrier_changed(&self, carrier: bool) {
        self.sink.send(DeviceEvent::CarrierChanged(carrier));
    }

    /// Deliver a link properties change.
    pub fn link_changed(&self, props: LinkProperties) {
        self.sink.send(DeviceEvent::LinkChanged(props));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivationState {
        self.state.get()
    }

    /// Stream of lifecycle states, starting with the current one.
    pub fn watch_state(&self) -> impl Stream<Item = ActivationState> + Send {
        self.state.watch()
    }

    /// Interface name this handle controls.
    pub fn iface(&self) -> &str {
        &self.iface
    }
}

/// Registry of hosted devices.
#[derive(Default)]
pub struct ActivationService {
    devices: Mutex<HashMap<String, DeviceHandle>>,
}

impl ActivationService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and spawn its control task.
    ///
    /// The returned sink must be handed to the port implementations so
    /// their completions reach this device; the same sink is already wired
    /// into the spawned [`Device`].
    #[instrument(skip(self, config, make_ports))]
    pub fn add_device<F>(
        &self,
        descriptor: DeviceDescriptor,
        config: ActivationConfig,
        make_ports: F,
    ) -> DeviceHandle
    where
        F: FnOnce(&EventSink) -> Ports,
    {
        let (sink, mut rx) = EventSink::channel();
        let ports = make_ports(&sink);
        let mut device = Device::new(
            descriptor.iface.clone(),
            descriptor.ifindex,
            descriptor.kind,
            config,
            ports,
            sink.clone(),
        );
        let state = device.state_property();

        let iface = descriptor.iface.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let shutdown = matches!(event, DeviceEvent::Shutdown);
                device.handle_event(event);
                if shutdown {
                    break;
                }
            }
            debug!(iface = %iface, "device control task stopped");
        });

        let handle = DeviceHandle {
            iface: descriptor.iface.clone(),
            sink,
            state,
        };
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = devices.insert(descriptor.iface, handle.clone()) {
            warn!(iface = %previous.iface, "replacing existing device registration");
            previous.sink.send(DeviceEvent::Shutdown);
        }
        handle
    }

    /// Look up a registered device.
    pub fn device(&self, iface: &str) -> Option<DeviceHandle> {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        devices.get(iface).cloned()
    }

    /// Deregister a device, tearing down any activation in progress and
    /// stopping its control task.
    ///
    /// # Errors
    /// Returns [`ActivationError::DeviceNotFound`] when no device with the
    /// given interface name is registered.
    pub fn remove_device(&self, iface: &str) -> Result<(), ActivationError> {
        let handle = {
            let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
            devices
                .remove(iface)
                .ok_or_else(|| ActivationError::DeviceNotFound(iface.to_owned()))?
        };
        handle.sink.send(DeviceEvent::Shutdown);
        Ok(())
    }
}
