//! Market data sources.
//!
//! A feed yields [`Quote`]s one at a time; whoever drives it pushes them
//! into the ring as [`Command::Quote`](crate::Command::Quote).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::command::Quote;
use crate::error::{Error, Result};

/// Anything that produces a sequence of quotes (file replay, live stream).
pub trait MarketDataFeed {
    /// Next quote, or `Ok(None)` once the source is exhausted.
    fn next_quote(&mut self) -> Result<Option<Quote>>;
}

/// Replays quotes from CSV rows of
/// `timestamp_ns,symbol,bid,ask,bid_size,ask_size`.
///
/// The first line is a header and is skipped whatever it says; fields are
/// read by position.
pub struct CsvReplayFeed<R> {
    reader: csv::Reader<R>,
    record: StringRecord,
    replayed: u64,
}

impl CsvReplayFeed<File> {
    /// Open a replay file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_reader(File::open(path)?))
    }
}

impl<R: Read> CsvReplayFeed<R> {
    /// Wrap any reader holding replay CSV
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
            replayed: 0,
        }
    }

    /// Quotes returned so far
    pub fn replayed(&self) -> u64 {
        self.replayed
    }
}

impl<R: Read> MarketDataFeed for CsvReplayFeed<R> {
    fn next_quote(&mut self) -> Result<Option<Quote>> {
        if !self.reader.read_record(&mut self.record)? {
            debug!(quotes = self.replayed, "replay exhausted");
            return Ok(None);
        }

        let line = self.record.position().map_or(0, |p| p.line());
        let quote: Quote = self
            .record
            .deserialize(None)
            .map_err(|e| Error::InvalidQuote {
                line,
                reason: e.to_string(),
            })?;

        self.replayed += 1;
        Ok(Some(quote))
    }
}

impl<R: Read> Iterator for CsvReplayFeed<R> {
    type Item = Result<Quote>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_quote().transpose()
    }
}
