use crate::capture::CapturedFrame;
use crate::classify::{Classification, Classifier, Direction};
use crate::error::PionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use strum_macros::Display;

/// One line of the event log: a frame that belongs to the device's traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp_ms: i64,
    pub direction: Direction,
    pub length: usize,
}

impl Record {
    /// `None` when the frame is not device traffic.
    pub fn new(frame: &CapturedFrame, classification: Classification) -> Option<Self> {
        classification.is_match().then(|| Self {
            timestamp_ms: frame.timestamp_ms(),
            direction: classification.direction,
            length: classification.length,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp_ms, self.direction, self.length)
    }
}

/// Classify every captured frame, keeping device traffic and passing read errors through.
pub fn records<I>(frames: I, classifier: &Classifier) -> impl Iterator<Item = Result<Record, PionError>>
where
    I: IntoIterator<Item = Result<CapturedFrame, PionError>>,
{
    frames.into_iter().filter_map(move |frame| match frame {
        Ok(frame) => Record::new(&frame, classifier.classify_bytes(&frame.data)).map(Ok),
        Err(e) => Some(Err(e)),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum OutputFormat {
    /// `<timestamp_ms> <direction> <length>`
    #[default]
    #[strum(to_string = "text")]
    Text,
    /// One JSON object per line
    #[strum(to_string = "json")]
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format {:?}, expected text or json", other)),
        }
    }
}

/// Writes records one per line in the chosen format.
pub struct RecordWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn write(&mut self, record: &Record) -> Result<(), PionError> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", record)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, record).map_err(io::Error::from)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), PionError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
