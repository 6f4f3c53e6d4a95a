use crate::constants::*;
use crate::error::PionError;
use crate::frame::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

/// Identifies which side of a conversation is the monitored device.
///
/// The variant is chosen once, before any frame is read, and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Device connected through the BLE bridge, which forwards its traffic as
    /// loopback UDP on [`UDP_PORT_BLE`].
    BleBridge,
    /// Device running as a WiFi access point at [`IP_DEVICE_AP`].
    AccessPoint,
    /// Device running as a WiFi station. Anything NDN-shaped that does not
    /// belong to `ap` (normally the access point's MAC) is the device.
    Station { ap: MacAddr },
}

impl Matcher {
    /// Build the matcher from the three mutually exclusive selections.
    pub fn from_selection(ble: bool, ap: bool, sta: Option<MacAddr>) -> Result<Self, PionError> {
        let mut selected = Vec::with_capacity(1);
        if ble {
            selected.push(Matcher::BleBridge);
        }
        if ap {
            selected.push(Matcher::AccessPoint);
        }
        if let Some(ap) = sta {
            selected.push(Matcher::Station { ap });
        }

        match selected.as_slice() {
            [matcher] => Ok(*matcher),
            _ => Err(PionError::MatcherSelection(format!(
                "exactly one of --ble --ap --sta is required, got {}",
                selected.len()
            ))),
        }
    }

    /// Whether `(mac, ip, port)` is the device's end of a conversation.
    ///
    /// `ip` is `None` for NDN frames carried directly over Ethernet; those are
    /// checked with `port` 0.
    pub fn is_device(&self, mac: MacAddr, ip: Option<Ipv4Addr>, port: u16) -> bool {
        match self {
            Matcher::BleBridge => ip.is_some_and(|ip| ip.is_loopback()) && port == UDP_PORT_BLE,
            Matcher::AccessPoint => ip == Some(IP_DEVICE_AP) && port == UDP_PORT_NDN,
            // no port exists on the Ethernet-only path, so a missing IP stands in for it
            Matcher::Station { ap } => (ip.is_none() || port == UDP_PORT_NDN) && mac != *ap,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::BleBridge => write!(f, "BLE bridge (loopback:{})", UDP_PORT_BLE),
            Matcher::AccessPoint => write!(f, "WiFi AP ({}:{})", IP_DEVICE_AP, UDP_PORT_NDN),
            Matcher::Station { ap } => write!(f, "WiFi STA (excluding {})", ap),
        }
    }
}
