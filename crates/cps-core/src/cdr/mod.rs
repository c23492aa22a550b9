//! CDR table reading, format detection and normalization.
//!
//! The source is read in a single pass: the first two records are buffered
//! for detection and then replayed ahead of the remaining stream.

pub mod datetime;
pub mod detect;
pub mod normalize;
pub mod vendor;

pub use datetime::{parse_bound, DateTimeFormat, ParsedTimestamp};
pub use detect::{detect_format, Column, ColumnRef, DetectOptions, FormatProfile, OutboundFilter};
pub use normalize::{CanonicalEvent, Normalizer, RowOutcome};
pub use vendor::{OutboundConvention, Vendor};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use cps_common::{Error, Result};

/// A CDR table with its first two records buffered.
pub struct CdrSource<R: Read> {
    first: Option<StringRecord>,
    second: Option<StringRecord>,
    rest: StringRecordsIntoIter<R>,
}

impl CdrSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> CdrSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut rest = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        let first = rest.next().transpose()?;
        let second = match first {
            Some(_) => rest.next().transpose()?,
            None => None,
        };
        Ok(CdrSource {
            first,
            second,
            rest,
        })
    }

    pub fn detect(&self, options: &DetectOptions) -> Result<FormatProfile> {
        detect_format(self.first.as_ref(), self.second.as_ref(), options)
    }

    /// Every data row with its 1-based line number; the header is skipped.
    pub fn into_rows(self, has_header: bool) -> impl Iterator<Item = Result<(u64, StringRecord)>> {
        let buffered = self
            .first
            .into_iter()
            .chain(self.second)
            .map(Ok::<_, Error>);
        let streamed = self.rest.map(|r| r.map_err(Error::from));
        buffered
            .chain(streamed)
            .enumerate()
            .skip(usize::from(has_header))
            .map(|(i, record)| {
                record.map(|record| {
                    let line = record
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(i as u64 + 1);
                    (line, record)
                })
            })
    }
}
