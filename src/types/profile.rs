//! Connection profile data model.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::platform::WolOptions;

/// The connection type a profile applies to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionKind {
    /// Plain wired Ethernet.
    Wired,
    /// Virtual Ethernet pair.
    Veth,
    /// MACsec-encapsulated link (always authenticated).
    Macsec,
    /// PPP over Ethernet.
    Pppoe,
}

/// Duplex mode requested by explicit link negotiation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Duplex {
    /// Half duplex.
    Half,
    /// Full duplex.
    Full,
}

/// Explicit link negotiation settings.
///
/// When `autoneg` is set, `speed_mbps` and `duplex` advertise the preferred
/// mode; otherwise they force it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkNegotiation {
    /// Enable IEEE 802.3 auto-negotiation.
    pub autoneg: bool,
    /// Link speed in megabits per second.
    pub speed_mbps: u32,
    /// Duplex mode.
    pub duplex: Duplex,
}

/// EAP method used for 802.1X authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EapMethod {
    /// EAP-MD5.
    Md5,
    /// EAP-TLS.
    Tls,
    /// Protected EAP.
    Peap,
    /// Tunneled TLS.
    Ttls,
}

/// 802.1X port authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security8021x {
    /// EAP method to negotiate.
    pub eap: EapMethod,
    /// Identity presented to the authenticator.
    pub identity: String,
    /// Password secret. `None` means the secret has not been obtained yet
    /// (or was cleared for a fresh prompt).
    pub password: Option<String>,
    /// Tolerate authentication failure: when the authenticator never
    /// answers, the port is used unauthenticated instead of failing the
    /// activation.
    #[serde(default)]
    pub optional: bool,
    /// Use the system CA certificate store for server validation.
    #[serde(default)]
    pub system_ca_certs: bool,
}

/// FCoE operating mode carried in the DCB settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FcoeMode {
    /// Fabric mode (switch-attached).
    Fabric,
    /// VN2VN point-to-point mode.
    Vn2Vn,
}

/// Data Center Bridging settings applied during stage 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcbSettings {
    /// FCoE application mode, when the FCoE app TLV is enabled.
    pub fcoe_mode: Option<FcoeMode>,
    /// Per-priority flow control enablement, one flag per 802.1p priority.
    #[serde(default)]
    pub priority_flow_control: [bool; 8],
}

/// Wake-on-LAN settings applied best-effort during stage 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WolConfig {
    /// Wake trigger mask.
    pub options: WolOptions,
    /// Password for SecureOn magic packets.
    pub password: Option<String>,
}

/// PPPoE encapsulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PppoeSettings {
    /// Access concentrator service name, if the ISP requires one.
    pub service: Option<String>,
    /// PAP/CHAP username.
    pub username: String,
    /// PAP/CHAP password secret.
    pub password: Option<String>,
}

/// The connection profile being applied to a device.
///
/// Owned exclusively by the activation context for the duration of an
/// attempt; replaced wholesale on reapply, never mutated in place (with the
/// single exception of secrets delivered by the secrets broker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Human-readable profile identifier.
    pub id: String,
    /// The connection type.
    pub kind: ConnectionKind,
    /// 802.1X authentication, when the link requires it.
    pub security: Option<Security8021x>,
    /// DCB/FCoE configuration, when present.
    pub dcb: Option<DcbSettings>,
    /// Wake-on-LAN configuration, when present.
    pub wake_on_lan: Option<WolConfig>,
    /// Explicit link negotiation, when present.
    pub link: Option<LinkNegotiation>,
    /// Interface MTU to apply during IP configuration.
    pub mtu: Option<u32>,
    /// PPPoE settings; required when `kind` is [`ConnectionKind::Pppoe`].
    pub pppoe: Option<PppoeSettings>,
    /// When this profile last activated successfully. Consulted by the
    /// supplicant timeout policy to decide between a silent retry and a
    /// fresh secrets prompt.
    pub last_success: Option<SystemTime>,
}

impl ConnectionProfile {
    /// Minimal wired profile with the given id; used as a building block by
    /// callers and tests.
    pub fn wired(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ConnectionKind::Wired,
            security: None,
            dcb: None,
            wake_on_lan: None,
            link: None,
            mtu: None,
            pppoe: None,
            last_success: None,
        }
    }

    /// Whether this profile has ever activated successfully.
    pub fn seen_before(&self) -> bool {
        self.last_success.is_some()
    }
}
