//! Bounded-box streaming scanner
//!
//! A [`Scanner`] is a lazy iterator of [`ScanEvent`]s: progress values
//! followed by exactly one terminal `Result` or `Error`. A cancelled scan
//! simply stops yielding, with no terminal event at all.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::Path;

use log::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::resolve::CoordinateEncoding;
use crate::types::{DELIMITER, QueryWindow, Record, SearchResult};

/// Event emitted by a scan
#[derive(Debug)]
pub enum ScanEvent {
    /// Advisory progress in percent, `0..=100`
    Progress(u8),
    /// Scan finished, by end of file or by reaching the match cap
    Result(SearchResult),
    /// Scan could not run or could not continue
    Error(Error),
}

impl ScanEvent {
    /// Whether this event ends the scan
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Parameters of one search
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Estimated number of data lines, from a prior full pass
    pub total_lines: u64,
    /// Tolerance window around the query point
    pub window:      QueryWindow,
    /// Resolved coordinate columns
    pub encoding:    CoordinateEncoding,
}

/// Advisory progress: `min(100, floor(processed * 100 / max(1, total)))`
#[must_use]
pub fn progress_percent(processed: u64, total: u64) -> u8 {
    let percent = processed.saturating_mul(100) / total.max(1);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Line reader that reuses one buffer and decodes lossily
#[derive(Debug)]
pub(crate) struct LineReader<R> {
    reader: R,
    buf:    Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) const fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new() }
    }

    /// Next line without its terminator, or `None` at end of file
    pub(crate) fn next_line(&mut self) -> io::Result<Option<Cow<'_, str>>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf)))
    }
}

/// Split a line into its fields
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.split(DELIMITER).collect()
}

/// Byte order mark some spreadsheet exports put before the header
const BOM: char = '\u{feff}';

/// Read the header row, dropping a leading byte order mark
///
/// # Errors
/// Returns `Error::Empty` if the first line is absent or empty, and
/// `Error::Read` if it cannot be read.
pub(crate) fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Record, Error> {
    match lines.next_line().map_err(Error::Read)? {
        Some(raw) => {
            let line = raw.strip_prefix(BOM).unwrap_or(&raw);
            if line.is_empty() {
                return Err(Error::Empty);
            }
            Ok(split_fields(line).into_iter().map(str::to_owned).collect())
        },
        None => Err(Error::Empty),
    }
}

/// Scan state after the header has been read
#[derive(Debug)]
struct Stream<R> {
    lines:           LineReader<R>,
    header_len:      usize,
    result:          SearchResult,
    lines_processed: u64,
}

#[derive(Debug)]
enum State<R> {
    /// Source not yet read; holds the outcome of opening it
    Opening(io::Result<R>),
    /// Header read, records streaming
    Streaming(Box<Stream<R>>),
    /// Match cap reached; result goes out next
    Flushing(SearchResult),
    /// No more events
    Done,
}

/// Single-pass scanner over one delimited source
///
/// Restartable only by constructing a new instance.
#[derive(Debug)]
pub struct Scanner<R> {
    state:  State<R>,
    config: ScanConfig,
    token:  CancellationToken,
}

impl Scanner<BufReader<File>> {
    /// Scanner over a file on disk; open failure is reported as the first event
    #[must_use]
    pub fn open(path: &Path, config: ScanConfig, token: CancellationToken) -> Self {
        Self::with_source(File::open(path).map(BufReader::new), config, token)
    }
}

impl<R: BufRead> Scanner<R> {
    /// Scanner over an already opened reader
    #[must_use]
    pub fn from_reader(reader: R, config: ScanConfig, token: CancellationToken) -> Self {
        Self::with_source(Ok(reader), config, token)
    }

    fn with_source(source: io::Result<R>, config: ScanConfig, token: CancellationToken) -> Self {
        Self { state: State::Opening(source), config, token }
    }

    /// Read the header and prepare the result accumulator
    fn start(&self, reader: R) -> Result<Box<Stream<R>>, Error> {
        let mut lines = LineReader::new(reader);
        let header = read_header(&mut lines)?;
        debug!(
            "Scan started: {} columns, {} estimated lines, encoding {}",
            header.len(),
            self.config.total_lines,
            self.config.encoding
        );
        Ok(Box::new(Stream {
            lines,
            header_len: header.len(),
            result: SearchResult::new(header),
            lines_processed: 0,
        }))
    }

    /// Process one record; the returned event is the next one to emit
    fn step(&mut self, mut stream: Box<Stream<R>>) -> ScanEvent {
        let record: Option<Record> = {
            let line = match stream.lines.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!(
                        "Scan complete: {} matches in {} lines",
                        stream.result.rows.len(),
                        stream.lines_processed
                    );
                    return ScanEvent::Result(stream.result);
                },
                Err(e) => {
                    warn!("Scan aborted after {} lines: {e}", stream.lines_processed);
                    return ScanEvent::Error(Error::Read(e));
                },
            };

            let fields = split_fields(&line);
            let matched = fields.len() == stream.header_len
                && self
                    .config
                    .encoding
                    .coordinates(fields.as_slice())
                    .is_some_and(|point| self.config.window.contains(point));
            matched.then(|| fields.into_iter().map(str::to_owned).collect())
        };

        if let Some(record) = record {
            stream.result.rows.push(record);
            if stream.result.is_full() {
                info!("Match cap reached after {} lines", stream.lines_processed + 1);
                self.state = State::Flushing(stream.result);
                return ScanEvent::Progress(100);
            }
        }

        stream.lines_processed += 1;
        let percent = progress_percent(stream.lines_processed, self.config.total_lines);
        self.state = State::Streaming(stream);
        ScanEvent::Progress(percent)
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<ScanEvent> {
        loop {
            if matches!(self.state, State::Done) {
                return None;
            }
            if self.token.is_set() {
                debug!("Scan cancelled");
                self.state = State::Done;
                return None;
            }

            match mem::replace(&mut self.state, State::Done) {
                State::Opening(Err(e)) => return Some(ScanEvent::Error(Error::Open(e))),
                State::Opening(Ok(reader)) => match self.start(reader) {
                    Ok(stream) => self.state = State::Streaming(stream),
                    Err(e) => return Some(ScanEvent::Error(e)),
                },
                State::Streaming(stream) => return Some(self.step(stream)),
                State::Flushing(result) => return Some(ScanEvent::Result(result)),
                State::Done => return None,
            }
        }
    }
}
