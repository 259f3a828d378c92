//! Hour-file tick codec.
//!
//! An hour file is a sequence of 20-byte big-endian records, LZMA-compressed
//! as a whole:
//!
//! | bytes | field | type |
//! |-------|-------|------|
//! | 0..4   | milliseconds since the start of the hour | i32 |
//! | 4..8   | ask (points) | i32 |
//! | 8..12  | bid (points) | i32 |
//! | 12..16 | ask volume | f32 |
//! | 16..20 | bid volume | f32 |
//!
//! A zero-length file is a valid hour without ticks.

use crate::domain::{Source, StreamId, Tick};
use crate::error::DataError;
use crate::paths::HourPath;
use crate::sequence::Sequence;
use chrono::DateTime;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::Arc;
use tracing::debug;
use xz2::bufread::XzDecoder;
use xz2::stream::{LzmaOptions, Stream};
use xz2::write::XzEncoder;

pub const RECORD_LEN: usize = 20;

/// Observer called with every tick a reader hands out.
pub type TickVisitor = Arc<dyn Fn(&Tick) + Send + Sync>;

/// One fixed-width record as stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRecord {
    pub offset_ms: i32,
    pub ask: i32,
    pub bid: i32,
    pub ask_volume: f32,
    pub bid_volume: f32,
}

impl TickRecord {
    pub fn from_bytes(buf: &[u8; RECORD_LEN]) -> Self {
        let word = |i: usize| [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]];
        Self {
            offset_ms: i32::from_be_bytes(word(0)),
            ask: i32::from_be_bytes(word(4)),
            bid: i32::from_be_bytes(word(8)),
            ask_volume: f32::from_be_bytes(word(12)),
            bid_volume: f32::from_be_bytes(word(16)),
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0..4].copy_from_slice(&self.offset_ms.to_be_bytes());
        out[4..8].copy_from_slice(&self.ask.to_be_bytes());
        out[8..12].copy_from_slice(&self.bid.to_be_bytes());
        out[12..16].copy_from_slice(&self.ask_volume.to_be_bytes());
        out[16..20].copy_from_slice(&self.bid_volume.to_be_bytes());
        out
    }

    /// Record for `tick` relative to the hour starting at `hour_epoch_ms`.
    pub fn from_tick(tick: &Tick, hour_epoch_ms: i64) -> Result<Self, DataError> {
        let offset = tick.time.timestamp_millis() - hour_epoch_ms;
        let offset_ms = i32::try_from(offset)
            .ok()
            .filter(|o| (0..3_600_000).contains(o))
            .ok_or_else(|| {
                DataError::ValidationError(format!(
                    "tick at {} is outside the hour starting at {hour_epoch_ms}",
                    tick.time
                ))
            })?;
        Ok(Self {
            offset_ms,
            ask: tick.ask,
            bid: tick.bid,
            ask_volume: tick.ask_volume,
            bid_volume: tick.bid_volume,
        })
    }
}

/// Compress records into an hour file. No records gives an empty file.
pub fn encode_hour(records: &[TickRecord]) -> Result<Vec<u8>, DataError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let options = LzmaOptions::new_preset(6)
        .map_err(|e| DataError::ValidationError(format!("lzma options: {e}")))?;
    let stream = Stream::new_lzma_encoder(&options)
        .map_err(|e| DataError::ValidationError(format!("lzma encoder: {e}")))?;
    let mut encoder = XzEncoder::new_stream(Vec::with_capacity(records.len() * 8), stream);
    for record in records {
        encoder.write_all(&record.to_bytes())?;
    }
    Ok(encoder.finish()?)
}

enum Input<R> {
    Unopened(R),
    Open(Box<XzDecoder<BufReader<R>>>),
    Closed,
}

/// Lookahead slot between `has_next` and `next_item`.
enum Cursor {
    NotPeeked,
    Peeked(Tick),
    Exhausted,
}

/// Lazily decodes one hour file into validated ticks.
///
/// Decompression starts on the first pull. A truncated record or a
/// decompression failure is fatal: the error is returned and the reader is
/// exhausted from then on.
pub struct TickReader<R> {
    path: String,
    symbol: String,
    hour_epoch_ms: i64,
    stream: StreamId,
    source: Source,
    visitor: Option<TickVisitor>,
    input: Input<R>,
    cursor: Cursor,
    decoded: usize,
}

impl<R: Read> TickReader<R> {
    pub fn new(path: &HourPath, reader: R) -> Self {
        Self {
            path: path.key(),
            symbol: path.symbol.clone(),
            hour_epoch_ms: path.epoch_ms(),
            stream: StreamId::REALTIME,
            source: Source::Historical,
            visitor: None,
            input: Input::Unopened(reader),
            cursor: Cursor::NotPeeked,
            decoded: 0,
        }
    }

    /// Parse symbol and hour from `path` first.
    pub fn from_path(path: &str, reader: R) -> Result<Self, DataError> {
        Ok(Self::new(&HourPath::parse(path)?, reader))
    }

    pub fn with_stream(mut self, stream: StreamId) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_visitor(mut self, visitor: Option<TickVisitor>) -> Self {
        self.visitor = visitor;
        self
    }

    /// Number of records decoded so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Returns false for an empty file.
    fn open(&mut self) -> Result<bool, DataError> {
        match self.input {
            Input::Open(_) => return Ok(true),
            Input::Closed => return Ok(false),
            Input::Unopened(_) => {}
        }
        let Input::Unopened(raw) = std::mem::replace(&mut self.input, Input::Closed) else {
            return Ok(false);
        };
        let mut buffered = BufReader::new(raw);
        if buffered.fill_buf()?.is_empty() {
            debug!(path = %self.path, "empty hour file");
            return Ok(false);
        }
        let stream = Stream::new_lzma_decoder(u64::MAX)
            .map_err(|e| DataError::corrupt(&self.path, format!("lzma decoder: {e}")))?;
        self.input = Input::Open(Box::new(XzDecoder::new_stream(buffered, stream)));
        Ok(true)
    }

    fn read_record(&mut self) -> Result<Option<TickRecord>, DataError> {
        if !self.open()? {
            return Ok(None);
        }
        let Input::Open(decoder) = &mut self.input else {
            return Ok(None);
        };

        let mut buf = [0u8; RECORD_LEN];
        let mut filled = 0;
        while filled < RECORD_LEN {
            match decoder.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DataError::corrupt(
                        &self.path,
                        format!("decompression failed after {} records: {e}", self.decoded),
                    ))
                }
            }
        }
        match filled {
            0 => Ok(None),
            RECORD_LEN => Ok(Some(TickRecord::from_bytes(&buf))),
            short => Err(DataError::corrupt(
                &self.path,
                format!(
                    "truncated record {}: {short} of {RECORD_LEN} bytes",
                    self.decoded
                ),
            )),
        }
    }

    fn to_tick(&self, record: TickRecord) -> Result<Tick, DataError> {
        let ms = self.hour_epoch_ms + i64::from(record.offset_ms);
        let time = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| DataError::corrupt(&self.path, format!("timestamp {ms} out of range")))?;
        let tick = Tick {
            symbol: self.symbol.clone(),
            time,
            stream: self.stream,
            ask: record.ask,
            bid: record.bid,
            ask_volume: record.ask_volume,
            bid_volume: record.bid_volume,
            source: self.source,
        };
        tick.validate()?;
        Ok(tick)
    }

    fn peek(&mut self) -> Result<bool, DataError> {
        match self.cursor {
            Cursor::Peeked(_) => return Ok(true),
            Cursor::Exhausted => return Ok(false),
            Cursor::NotPeeked => {}
        }
        let decoded = self
            .read_record()
            .and_then(|record| record.map(|r| self.to_tick(r)).transpose());
        match decoded {
            Ok(Some(tick)) => {
                self.decoded += 1;
                self.cursor = Cursor::Peeked(tick);
                Ok(true)
            }
            Ok(None) => {
                debug!(path = %self.path, ticks = self.decoded, "hour file decoded");
                self.release();
                Ok(false)
            }
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    fn release(&mut self) {
        self.cursor = Cursor::Exhausted;
        self.input = Input::Closed;
    }
}

impl<R: Read> Sequence for TickReader<R> {
    type Item = Tick;

    fn has_next(&mut self) -> Result<bool, DataError> {
        self.peek()
    }

    fn next_item(&mut self) -> Result<Tick, DataError> {
        if !self.peek()? {
            return Err(DataError::SequenceExhausted);
        }
        match std::mem::replace(&mut self.cursor, Cursor::NotPeeked) {
            Cursor::Peeked(tick) => {
                if let Some(visit) = &self.visitor {
                    visit(&tick);
                }
                Ok(tick)
            }
            other => {
                self.cursor = other;
                Err(DataError::SequenceExhausted)
            }
        }
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.release();
        Ok(())
    }
}
