//! Common test utilities: frame and capture-file builders

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use pcapparse_lib::classify::{Classification, Classifier, Direction};
#[allow(unused_imports)]
pub use pcapparse_lib::constants::*;
#[allow(unused_imports)]
pub use pcapparse_lib::error::PionError;
#[allow(unused_imports)]
pub use pcapparse_lib::frame::{DecodedFrame, EtherType, IpProtocol, LayerType, MacAddr};
#[allow(unused_imports)]
pub use pcapparse_lib::matcher::Matcher;
#[allow(unused_imports)]
pub use std::net::Ipv4Addr;

#[allow(dead_code)]
pub const DEVICE_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
#[allow(dead_code)]
pub const AP_MAC: MacAddr = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
#[allow(dead_code)]
pub const HOST_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
#[allow(dead_code)]
pub const HOST_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

#[allow(dead_code)]
pub fn ethernet_frame(src: MacAddr, dst: MacAddr, ether_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ETHERNET_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&dst.0);
    frame.extend_from_slice(&src.0);
    frame.extend_from_slice(&ether_type.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// IPv4 header without options (checksum left at zero) followed by `payload`.
#[allow(dead_code)]
pub fn ipv4_packet(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload: &[u8]) -> Vec<u8> {
    let total_length = (IPV4_MIN_HEADER_SIZE + payload.len()) as u16;
    let mut packet = vec![0x45, 0x00];
    packet.extend_from_slice(&total_length.to_be_bytes());
    packet.extend_from_slice(&[0x12, 0x34, 0x40, 0x00]); // id, DF
    packet.extend_from_slice(&[64, protocol, 0x00, 0x00]);
    packet.extend_from_slice(&src.octets());
    packet.extend_from_slice(&dst.octets());
    packet.extend_from_slice(payload);
    packet
}

#[allow(dead_code)]
pub fn udp_datagram(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = (UDP_HEADER_SIZE + payload.len()) as u16;
    let mut datagram = Vec::with_capacity(length as usize);
    datagram.extend_from_slice(&src_port.to_be_bytes());
    datagram.extend_from_slice(&dst_port.to_be_bytes());
    datagram.extend_from_slice(&length.to_be_bytes());
    datagram.extend_from_slice(&[0x00, 0x00]);
    datagram.extend_from_slice(payload);
    datagram
}

/// A complete Ethernet/IPv4/UDP frame.
#[allow(dead_code)]
pub fn udp_frame(
    (src_mac, src_ip, src_port): (MacAddr, Ipv4Addr, u16),
    (dst_mac, dst_ip, dst_port): (MacAddr, Ipv4Addr, u16),
    payload: &[u8],
) -> Vec<u8> {
    let udp = udp_datagram(src_port, dst_port, payload);
    let ip = ipv4_packet(src_ip, dst_ip, IP_PROTOCOL_UDP, &udp);
    ethernet_frame(src_mac, dst_mac, ETHER_TYPE_IPV4, &ip)
}

/// NDN carried directly over Ethernet.
#[allow(dead_code)]
pub fn ndn_frame(src: MacAddr, dst: MacAddr, payload: &[u8]) -> Vec<u8> {
    ethernet_frame(src, dst, ETHER_TYPE_NDN, payload)
}

/// Classic little-endian pcap file. Each frame is `(ts_sec, ts_frac, data)`,
/// the fraction in microseconds or, with `nanos`, nanoseconds.
#[allow(dead_code)]
pub fn pcap_file<D: AsRef<[u8]>>(nanos: bool, linktype: u32, frames: &[(u32, u32, D)]) -> Vec<u8> {
    let magic: u32 = if nanos { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
    let mut file = Vec::new();
    file.extend_from_slice(&magic.to_le_bytes());
    file.extend_from_slice(&2u16.to_le_bytes());
    file.extend_from_slice(&4u16.to_le_bytes());
    file.extend_from_slice(&0i32.to_le_bytes()); // thiszone
    file.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
    file.extend_from_slice(&65535u32.to_le_bytes());
    file.extend_from_slice(&linktype.to_le_bytes());
    for (ts_sec, ts_frac, data) in frames {
        let data = data.as_ref();
        file.extend_from_slice(&ts_sec.to_le_bytes());
        file.extend_from_slice(&ts_frac.to_le_bytes());
        file.extend_from_slice(&(data.len() as u32).to_le_bytes());
        file.extend_from_slice(&(data.len() as u32).to_le_bytes());
        file.extend_from_slice(data);
    }
    file
}

#[allow(dead_code)]
fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let padded = body.len().div_ceil(4) * 4;
    let total = (12 + padded) as u32;
    let mut block = Vec::with_capacity(total as usize);
    block.extend_from_slice(&block_type.to_le_bytes());
    block.extend_from_slice(&total.to_le_bytes());
    block.extend_from_slice(body);
    block.resize(8 + padded, 0);
    block.extend_from_slice(&total.to_le_bytes());
    block
}

/// Little-endian pcapng file with one Ethernet interface. Each frame is
/// `(ticks, data)` where ticks count units of the interface's `if_tsresol`
/// (microseconds when `tsresol` is `None`).
#[allow(dead_code)]
pub fn pcapng_file<D: AsRef<[u8]>>(tsresol: Option<u8>, frames: &[(u64, D)]) -> Vec<u8> {
    let mut shb = Vec::new();
    shb.extend_from_slice(&0x1A2B_3C4Du32.to_le_bytes());
    shb.extend_from_slice(&1u16.to_le_bytes());
    shb.extend_from_slice(&0u16.to_le_bytes());
    shb.extend_from_slice(&(-1i64).to_le_bytes());

    let mut idb = Vec::new();
    idb.extend_from_slice(&1u16.to_le_bytes()); // LINKTYPE_ETHERNET
    idb.extend_from_slice(&0u16.to_le_bytes());
    idb.extend_from_slice(&65535u32.to_le_bytes());
    if let Some(resol) = tsresol {
        idb.extend_from_slice(&9u16.to_le_bytes()); // if_tsresol
        idb.extend_from_slice(&1u16.to_le_bytes());
        idb.extend_from_slice(&[resol, 0, 0, 0]);
        idb.extend_from_slice(&[0, 0, 0, 0]); // opt_endofopt
    }

    let mut file = pcapng_block(0x0A0D_0D0A, &shb);
    file.extend(pcapng_block(0x0000_0001, &idb));
    for (ticks, data) in frames {
        let data = data.as_ref();
        let mut epb = Vec::new();
        epb.extend_from_slice(&0u32.to_le_bytes()); // interface id
        epb.extend_from_slice(&((ticks >> 32) as u32).to_le_bytes());
        epb.extend_from_slice(&(*ticks as u32).to_le_bytes());
        epb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        epb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        epb.extend_from_slice(data);
        file.extend(pcapng_block(0x0000_0006, &epb));
    }
    file
}
