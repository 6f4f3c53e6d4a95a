use std::io;
use thiserror::Error;

/// The primary error type for the `pcapparse-lib` library.
///
/// Frame decoding and classification never fail; errors only come from reading
/// the capture and from configuration.
#[derive(Error, Debug)]
pub enum PionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Invalid MAC address: {0:?}")]
    InvalidMac(String),

    #[error("Invalid matcher selection: {0}")]
    MatcherSelection(String),
}
