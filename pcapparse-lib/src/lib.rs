pub mod capture;
pub mod classify;
pub mod constants;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod record;


pub use capture::{CaptureReader, CapturedFrame};
pub use classify::{Classification, Classifier, Direction};
pub use error::PionError;
pub use frame::{DecodedFrame, MacAddr};
pub use matcher::Matcher;
pub use record::{OutputFormat, Record, RecordWriter, records};
