//! Reading frames out of classic pcap and pcapng capture files.

use crate::constants::*;
use crate::error::PionError;
use bytes::Bytes;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{
    Block, InterfaceDescriptionBlock, Linktype, PcapBlockOwned, PcapError, PcapHeader, create_reader,
};
use std::io::Read;
use tracing::{debug, info, warn};

/// One captured frame with its capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Nanoseconds since the Unix epoch
    pub timestamp_ns: i64,
    pub data: Bytes,
}

impl CapturedFrame {
    pub fn new(timestamp_ns: i64, data: Bytes) -> Self {
        Self { timestamp_ns, data }
    }

    /// Capture time in milliseconds since the Unix epoch, truncated.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ns / NANOS_PER_MILLI
    }
}

/// Timestamp settings of one pcapng interface.
#[derive(Debug, Clone, Copy)]
struct Interface {
    linktype: Linktype,
    units_per_sec: u64,
    offset_secs: i64,
}

impl Interface {
    fn from_idb(idb: &InterfaceDescriptionBlock<'_>) -> Result<Self, PionError> {
        // high bit set: negative power of 2, otherwise negative power of 10
        let resol = idb.if_tsresol;
        let units_per_sec = if resol & 0x80 != 0 {
            2u64.checked_pow(u32::from(resol & 0x7f))
        } else {
            10u64.checked_pow(u32::from(resol))
        }
        .ok_or_else(|| PionError::Capture(format!("unsupported timestamp resolution {:#04x}", resol)))?;

        Ok(Self {
            linktype: idb.linktype,
            units_per_sec,
            offset_secs: idb.if_tsoffset as i64,
        })
    }

    fn timestamp_ns(&self, ts_high: u32, ts_low: u32) -> i64 {
        let ticks = (u64::from(ts_high) << 32) | u64::from(ts_low);
        let secs = (ticks / self.units_per_sec) as i64;
        let frac = ticks % self.units_per_sec;
        let frac_ns = (u128::from(frac) * NANOS_PER_SEC as u128 / u128::from(self.units_per_sec)) as i64;
        self.offset_secs
            .saturating_add(secs)
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(frac_ns)
    }
}

/// Per-file state needed to turn blocks into frames.
#[derive(Debug, Default)]
struct BlockState {
    legacy_nanos: bool,
    interfaces: Vec<Interface>,
}

impl BlockState {
    fn handle_block(&mut self, block: PcapBlockOwned<'_>) -> Result<Option<CapturedFrame>, PionError> {
        match block {
            PcapBlockOwned::LegacyHeader(header) => {
                self.legacy_header(&header);
                Ok(None)
            }
            PcapBlockOwned::Legacy(packet) => {
                let frac_ns = if self.legacy_nanos {
                    i64::from(packet.ts_usec)
                } else {
                    i64::from(packet.ts_usec) * 1_000
                };
                let timestamp_ns = i64::from(packet.ts_sec) * NANOS_PER_SEC + frac_ns;
                Ok(Some(CapturedFrame::new(timestamp_ns, Bytes::copy_from_slice(packet.data))))
            }
            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                debug!("pcapng section header, resetting interfaces");
                self.interfaces.clear();
                Ok(None)
            }
            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                let interface = Interface::from_idb(&idb)?;
                if interface.linktype != Linktype::ETHERNET {
                    warn!(
                        interface = self.interfaces.len(),
                        linktype = ?interface.linktype,
                        "interface is not Ethernet, its frames will not match"
                    );
                }
                debug!(?interface, "pcapng interface");
                self.interfaces.push(interface);
                Ok(None)
            }
            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                let interface = self.interfaces.get(epb.if_id as usize).ok_or_else(|| {
                    PionError::Capture(format!("enhanced packet block for unknown interface {}", epb.if_id))
                })?;
                let timestamp_ns = interface.timestamp_ns(epb.ts_high, epb.ts_low);
                // block data is padded to 32 bits
                let caplen = (epb.caplen as usize).min(epb.data.len());
                Ok(Some(CapturedFrame::new(timestamp_ns, Bytes::copy_from_slice(&epb.data[..caplen]))))
            }
            PcapBlockOwned::NG(Block::SimplePacket(_)) => {
                debug!("skipping simple packet block, it has no timestamp");
                Ok(None)
            }
            PcapBlockOwned::NG(_) => Ok(None),
        }
    }

    fn legacy_header(&mut self, header: &PcapHeader) {
        self.legacy_nanos = matches!(header.magic_number, PCAP_MAGIC_NANOS | PCAP_MAGIC_NANOS_SWAPPED);
        info!(
            version_major = header.version_major,
            version_minor = header.version_minor,
            nanosecond = self.legacy_nanos,
            snaplen = header.snaplen,
            "classic pcap capture"
        );
        if header.network != Linktype::ETHERNET {
            warn!(linktype = ?header.network, "capture is not Ethernet, frames will not match");
        }
    }
}

/// Lazily yields the frames of a classic pcap or pcapng stream, in capture order.
///
/// The first error ends the iteration.
pub struct CaptureReader {
    reader: Box<dyn PcapReaderIterator>,
    state: BlockState,
    finished: bool,
}

impl CaptureReader {
    /// Detect the capture format from the first bytes of `input`.
    pub fn new<R: Read + Send + 'static>(input: R) -> Result<Self, PionError> {
        let reader = create_reader(CAPTURE_BUFFER_SIZE, input)
            .map_err(|e| PionError::Capture(format!("unrecognized capture format: {:?}", e)))?;
        Ok(Self {
            reader,
            state: BlockState::default(),
            finished: false,
        })
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, PionError> {
        loop {
            match self.reader.next() {
                Ok((offset, block)) => {
                    let frame = self.state.handle_block(block);
                    self.reader.consume(offset);
                    if let Some(frame) = frame? {
                        return Ok(Some(frame));
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    if self.reader.reader_exhausted() {
                        return Err(PionError::Capture("capture ends with a truncated block".to_string()));
                    }
                    self.reader
                        .refill()
                        .map_err(|e| PionError::Capture(format!("failed to refill capture buffer: {:?}", e)))?;
                }
                Err(e) => return Err(PionError::Capture(format!("{:?}", e))),
            }
        }
    }
}

impl Iterator for CaptureReader {
    type Item = Result<CapturedFrame, PionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
