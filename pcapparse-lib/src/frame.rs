//! Layered decoding of captured Ethernet frames.
//!
//! Decoding follows strict layering: Ethernet II first, then IPv4 when the
//! EtherType says so, then UDP when the IPv4 protocol says so. A layer that is
//! missing, truncated or malformed is simply absent from the [`DecodedFrame`];
//! decoding never fails and never looks past the first layer it rejects.

use crate::constants::*;
use crate::error::PionError;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use strum_macros::Display;
use tracing::trace;
use zerocopy::byteorder::network_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// A 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", octet)?;
        }
        Ok(())
    }
}

/// Parses six two-digit hex octets separated by `:` or `-`.
impl FromStr for MacAddr {
    type Err = PionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PionError::InvalidMac(s.to_string());
        let separator = if s.contains('-') { '-' } else { ':' };

        let mut octets = [0u8; 6];
        let mut parts = s.split(separator);
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            hex::decode_to_slice(part, std::slice::from_mut(octet)).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddr(octets))
    }
}

/// EtherType values the decoder cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Ndn = 0x8624,
    Ipv6 = 0x86DD,

    #[num_enum(catch_all)]
    Unknown(u16),
}

/// IP protocol numbers the decoder cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Protocol layers a [`DecodedFrame`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LayerType {
    Ethernet,
    #[strum(to_string = "IPv4")]
    Ipv4,
    #[strum(to_string = "UDP")]
    Udp,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct EthernetHeaderRaw {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub ether_type: U16,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct Ipv4HeaderRaw {
    pub version_ihl: u8,
    pub dscp_ecn: u8,
    pub total_length: U16,
    pub identification: U16,
    pub flags_fragment: U16, // 3 flag bits, 13 offset bits
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: U16,
    pub src_addr: [u8; 4],
    pub dst_addr: [u8; 4],
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct UdpHeaderRaw {
    pub src_port: U16,
    pub dst_port: U16,
    pub length: U16,
    pub checksum: U16,
}

/// First byte of an IPv4 header. Bitfields fill from the least significant bit.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VersionIhl {
    pub ihl: B4,
    pub version: B4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetLayer<'a> {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ether_type: EtherType,
    /// Everything after the 14-byte header, trailing padding included.
    pub payload: &'a [u8],
}

impl<'a> EthernetLayer<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let Ok((header, payload)) = EthernetHeaderRaw::ref_from_prefix(data) else {
            trace!(len = data.len(), "frame shorter than an Ethernet header");
            return None;
        };
        Some(Self {
            src_mac: MacAddr(header.src_mac),
            dst_mac: MacAddr(header.dst_mac),
            ether_type: EtherType::from_primitive(header.ether_type.get()),
            payload,
        })
    }

    /// The Ethernet payload, present only for NDN-over-Ethernet frames.
    pub fn ndn_payload(&self) -> Option<&'a [u8]> {
        (u16::from(self.ether_type) == ETHER_TYPE_NDN).then_some(self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Layer<'a> {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub protocol: IpProtocol,
    pub flags_fragment: u16,
    /// Bounded by the total-length field, so Ethernet padding is excluded.
    pub payload: &'a [u8],
}

impl<'a> Ipv4Layer<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let Ok((header, _)) = Ipv4HeaderRaw::ref_from_prefix(data) else {
            trace!(len = data.len(), "IPv4 header truncated");
            return None;
        };

        let version_ihl = VersionIhl::from_bytes([header.version_ihl]);
        if version_ihl.version() != 4 {
            trace!(version = version_ihl.version(), "not an IPv4 header");
            return None;
        }
        let header_len = usize::from(version_ihl.ihl()) * 4;
        if header_len < IPV4_MIN_HEADER_SIZE || header_len > data.len() {
            trace!(header_len, len = data.len(), "invalid IPv4 header length");
            return None;
        }

        // total length 0 shows up in captures taken with segmentation offload
        let end = match usize::from(header.total_length.get()) {
            0 => data.len(),
            n if n < header_len => {
                trace!(total_length = n, header_len, "IPv4 total length below header length");
                return None;
            }
            n => n.min(data.len()),
        };

        Some(Self {
            src_ip: Ipv4Addr::from(header.src_addr),
            dst_ip: Ipv4Addr::from(header.dst_addr),
            protocol: IpProtocol::from_primitive(header.protocol),
            flags_fragment: header.flags_fragment.get(),
            payload: &data[header_len..end],
        })
    }

    /// True for any piece of a fragmented datagram, including the first.
    pub fn is_fragment(&self) -> bool {
        self.flags_fragment & IPV4_FLAG_MORE_FRAGMENTS != 0 || self.flags_fragment & IPV4_FRAGMENT_OFFSET_MASK != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpLayer<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

impl<'a> UdpLayer<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let Ok((header, _)) = UdpHeaderRaw::ref_from_prefix(data) else {
            trace!(len = data.len(), "UDP header truncated");
            return None;
        };

        // length 0 is used by jumbograms: the payload runs to the end of the datagram
        let end = match usize::from(header.length.get()) {
            0 => data.len(),
            n if n < UDP_HEADER_SIZE => {
                trace!(length = n, "UDP length below header size");
                return None;
            }
            n => n.min(data.len()),
        };

        Some(Self {
            src_port: header.src_port.get(),
            dst_port: header.dst_port.get(),
            payload: &data[UDP_HEADER_SIZE..end],
        })
    }
}

/// A view over one captured frame, borrowing from the raw bytes.
///
/// An inner layer is only ever present together with its enclosing layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    ethernet: Option<EthernetLayer<'a>>,
    ipv4: Option<Ipv4Layer<'a>>,
    udp: Option<UdpLayer<'a>>,
}

impl<'a> DecodedFrame<'a> {
    /// Decode as many layers of `data` as possible.
    pub fn decode(data: &'a [u8]) -> Self {
        let mut frame = DecodedFrame::default();

        let Some(ethernet) = EthernetLayer::parse(data) else {
            return frame;
        };
        frame.ethernet = Some(ethernet);
        if u16::from(ethernet.ether_type) != ETHER_TYPE_IPV4 {
            return frame;
        }

        let Some(ipv4) = Ipv4Layer::parse(ethernet.payload) else {
            return frame;
        };
        frame.ipv4 = Some(ipv4);
        if u8::from(ipv4.protocol) != IP_PROTOCOL_UDP {
            return frame;
        }
        if ipv4.is_fragment() {
            trace!(flags_fragment = ipv4.flags_fragment, "fragmented datagram, UDP not decoded");
            return frame;
        }

        frame.udp = UdpLayer::parse(ipv4.payload);
        frame
    }

    pub fn ethernet(&self) -> Option<&EthernetLayer<'a>> {
        self.ethernet.as_ref()
    }

    pub fn ipv4(&self) -> Option<&Ipv4Layer<'a>> {
        self.ipv4.as_ref()
    }

    pub fn udp(&self) -> Option<&UdpLayer<'a>> {
        self.udp.as_ref()
    }

    /// Layers that were decoded, outermost first.
    pub fn layers(&self) -> Vec<LayerType> {
        let mut layers = Vec::with_capacity(3);
        if self.ethernet.is_some() {
            layers.push(LayerType::Ethernet);
        }
        if self.ipv4.is_some() {
            layers.push(LayerType::Ipv4);
        }
        if self.udp.is_some() {
            layers.push(LayerType::Udp);
        }
        layers
    }
}
