use crate::frame::{DecodedFrame, MacAddr};
use crate::matcher::Matcher;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use strum_macros::Display;
use tracing::trace;

/// Direction of a frame relative to the monitored device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Not device traffic
    #[default]
    #[strum(to_string = "?")]
    None,
    #[strum(to_string = "<")]
    FromDevice,
    #[strum(to_string = ">")]
    ToDevice,
}

/// Outcome of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub direction: Direction,
    /// Ethernet payload length for NDN-over-Ethernet, UDP payload length otherwise.
    pub length: usize,
}

impl Classification {
    pub const NONE: Classification = Classification {
        direction: Direction::None,
        length: 0,
    };

    pub fn is_match(&self) -> bool {
        self.direction != Direction::None
    }
}

struct Endpoint {
    mac: MacAddr,
    ip: Option<Ipv4Addr>,
    port: u16,
}

/// Classifies decoded frames with a fixed [`Matcher`]. Holds no per-frame state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    matcher: Matcher,
}

impl Classifier {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    /// Decode `data` and classify it.
    pub fn classify_bytes(&self, data: &[u8]) -> Classification {
        self.classify(&DecodedFrame::decode(data))
    }

    /// Classify a decoded frame.
    ///
    /// NDN-over-Ethernet is checked before UDP. Within each layer the source is
    /// checked first, so a frame whose both ends match is `FromDevice`.
    pub fn classify(&self, frame: &DecodedFrame<'_>) -> Classification {
        let Some(ethernet) = frame.ethernet() else {
            return Classification::NONE;
        };

        if let Some(payload) = ethernet.ndn_payload() {
            let src = Endpoint {
                mac: ethernet.src_mac,
                ip: None,
                port: 0,
            };
            let dst = Endpoint {
                mac: ethernet.dst_mac,
                ip: None,
                port: 0,
            };
            let direction = self.direction(&src, &dst);
            if direction != Direction::None {
                trace!(%direction, length = payload.len(), "NDN over Ethernet");
                return Classification {
                    direction,
                    length: payload.len(),
                };
            }
        }

        if let (Some(ipv4), Some(udp)) = (frame.ipv4(), frame.udp()) {
            let src = Endpoint {
                mac: ethernet.src_mac,
                ip: Some(ipv4.src_ip),
                port: udp.src_port,
            };
            let dst = Endpoint {
                mac: ethernet.dst_mac,
                ip: Some(ipv4.dst_ip),
                port: udp.dst_port,
            };
            let direction = self.direction(&src, &dst);
            if direction != Direction::None {
                trace!(%direction, length = udp.payload.len(), "UDP");
                return Classification {
                    direction,
                    length: udp.payload.len(),
                };
            }
        }

        Classification::NONE
    }

    fn direction(&self, src: &Endpoint, dst: &Endpoint) -> Direction {
        if self.matcher.is_device(src.mac, src.ip, src.port) {
            Direction::FromDevice
        } else if self.matcher.is_device(dst.mac, dst.ip, dst.port) {
            Direction::ToDevice
        } else {
            Direction::None
        }
    }
}
