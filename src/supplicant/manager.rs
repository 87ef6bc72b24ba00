//! Supplicant manager contract.

use crate::{
    event::EventSink,
    types::{EapMethod, Security8021x},
};

/// Opaque identity of one supplicant interface handle.
///
/// One manager instance is shared per process; each device acquires at most
/// one handle and releases it with [`SupplicantManager::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SupplicantHandle(pub u64);

/// Driver the supplicant should bind the interface with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplicantDriver {
    /// Plain wired 802.1X.
    Wired,
    /// MACsec key agreement.
    Macsec,
}

/// States reported for a supplicant interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceState {
    /// The interface object is being set up.
    Initializing,
    /// Ready to accept an association request.
    Ready,
    /// Association in progress.
    Associating,
    /// Associated, authentication exchange running.
    Associated,
    /// Authentication completed successfully.
    Completed,
    /// Association lost.
    Disconnected,
    /// The interface went away.
    Down,
}

/// Authentication sub-state reported alongside the interface state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No authentication attempt observed yet.
    Unknown,
    /// EAP exchange started.
    Started,
    /// EAP exchange succeeded.
    Success,
    /// EAP exchange failed.
    Failure,
}

/// Errors reported by the supplicant manager.
#[derive(thiserror::Error, Debug)]
pub enum SupplicantError {
    /// The interface object could not be created.
    #[error("supplicant interface creation failed: {0}")]
    InterfaceCreation(String),

    /// The association request was rejected.
    #[error("association request rejected: {0}")]
    Association(String),

    /// The 802.1X settings do not form a usable supplicant configuration.
    #[error("supplicant configuration invalid: {0}")]
    Config(String),
}

/// Association configuration handed to the supplicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplicantConfig {
    /// EAP method.
    pub eap: EapMethod,
    /// Identity presented to the authenticator.
    pub identity: String,
    /// Password secret.
    pub password: String,
    /// Use the system CA store for server validation.
    pub system_ca_certs: bool,
}

impl SupplicantConfig {
    /// Build an association configuration from 802.1X settings.
    ///
    /// # Errors
    /// Returns [`SupplicantError::Config`] when the identity is empty or the
    /// password secret has not been obtained.
    pub fn from_security(security: &Security8021x) -> Result<Self, SupplicantError> {
        if security.identity.is_empty() {
            return Err(SupplicantError::Config("802.1X identity is empty".into()));
        }
        let password = security
            .password
            .clone()
            .ok_or_else(|| SupplicantError::Config("802.1X password secret missing".into()))?;
        Ok(Self {
            eap: security.eap,
            identity: security.identity.clone(),
            password,
            system_ca_certs: security.system_ca_certs,
        })
    }
}

/// Capability surface the engine consumes from the external supplicant
/// daemon.
///
/// `create_interface` initiates and returns; the result arrives as a
/// `SupplicantInterfaceReady`/`SupplicantInterfaceFailure` event through the
/// sink, and later interface/auth transitions as
/// `SupplicantStateChanged`/`SupplicantAuthChanged`.
pub trait SupplicantManager: Send + Sync {
    /// Request creation of a supplicant interface for the given link.
    fn create_interface(&self, ifindex: u32, driver: SupplicantDriver, sink: &EventSink);

    /// Submit an association request on an interface handle.
    ///
    /// # Errors
    /// Returns [`SupplicantError`] when the request is rejected outright.
    fn associate(
        &self,
        handle: SupplicantHandle,
        config: &SupplicantConfig,
    ) -> Result<(), SupplicantError>;

    /// Release an interface handle, disconnecting the supplicant interface.
    fn disconnect(&self, handle: SupplicantHandle);

    /// Current interface state.
    fn state(&self, handle: SupplicantHandle) -> InterfaceState;

    /// Current authentication sub-state.
    fn auth_state(&self, handle: SupplicantHandle) -> AuthState;
}
