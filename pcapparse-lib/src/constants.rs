// Wire constants for PION experiment captures

use std::net::Ipv4Addr;

/// EtherType of NDN packets carried directly over Ethernet
pub const ETHER_TYPE_NDN: u16 = 0x8624;

/// EtherType of IPv4
pub const ETHER_TYPE_IPV4: u16 = 0x0800;

/// IP protocol number of UDP
pub const IP_PROTOCOL_UDP: u8 = 17;

/// UDP port of NDN traffic
pub const UDP_PORT_NDN: u16 = 6363;

/// UDP port the BLE bridge forwards device traffic to on loopback
pub const UDP_PORT_BLE: u16 = 6362;

/// Address of the device when it runs in WiFi AP mode
pub const IP_DEVICE_AP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Size of an Ethernet II header (14 bytes)
pub const ETHERNET_HEADER_SIZE: usize = 14;

/// Size of an IPv4 header without options (20 bytes)
pub const IPV4_MIN_HEADER_SIZE: usize = 20;

/// Size of a UDP header (8 bytes)
pub const UDP_HEADER_SIZE: usize = 8;

/// IPv4 "more fragments" flag, within the flags/fragment-offset word
pub const IPV4_FLAG_MORE_FRAGMENTS: u16 = 0x2000;

/// Mask for the IPv4 fragment offset, within the flags/fragment-offset word
pub const IPV4_FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

/// Nanoseconds per millisecond, used to derive record timestamps
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Nanoseconds per second
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Buffer capacity handed to the pcap reader, large enough for one block at
/// the common 262144-byte snaplen
pub const CAPTURE_BUFFER_SIZE: usize = 1 << 20;

/// Classic pcap magic for nanosecond timestamps, as read in either byte order
pub const PCAP_MAGIC_NANOS: u32 = 0xa1b2_3c4d;
pub const PCAP_MAGIC_NANOS_SWAPPED: u32 = 0x4d3c_b2a1;
