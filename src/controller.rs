//! File opening and search orchestration
//!
//! A [`Session`] owns the currently open file and at most one running
//! search. Each search runs a [`Scanner`] on a dedicated worker thread and
//! forwards its events over a channel; the controller never sees a partial
//! result.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};
use log::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::resolve::{CoordinateEncoding, resolve};
use crate::scan::{LineReader, ScanConfig, ScanEvent, Scanner, read_header, split_fields};
use crate::types::{MAX_PREVIEW_ROWS, QueryWindow, Record, SearchResult};

/// Events buffered between the worker and the controller before the worker blocks
pub const EVENT_BUFFER: usize = 1024;

/// A file validated for searching
#[derive(Debug, Clone)]
pub struct OpenedFile {
    /// Path of the source
    pub path:        PathBuf,
    /// Header row, original casing
    pub header:      Record,
    /// Resolved coordinate columns; never `Unresolved`
    pub encoding:    CoordinateEncoding,
    /// Number of data lines after the header
    pub total_lines: u64,
    /// First well-formed rows of the file
    pub preview:     Vec<Record>,
}

/// Open a source, count its lines, capture a preview and resolve coordinates
///
/// # Errors
/// Returns error if:
/// - The file cannot be opened or read
/// - The header line is absent or empty
/// - No coordinate columns can be resolved
pub fn open_file(path: &Path) -> Result<OpenedFile> {
    let file = File::open(path).map_err(Error::Open)?;
    let mut lines = LineReader::new(BufReader::new(file));

    let header = read_header(&mut lines)?;

    let encoding = resolve(header.as_slice());
    if !encoding.is_resolved() {
        return Err(Error::Unresolved);
    }

    let mut total_lines = 0_u64;
    let mut preview = Vec::new();
    while let Some(line) = lines.next_line().map_err(Error::Read)? {
        total_lines += 1;
        if preview.len() < MAX_PREVIEW_ROWS {
            let fields = split_fields(&line);
            if fields.len() == header.len() {
                preview.push(fields.into_iter().map(str::to_owned).collect());
            }
        }
    }

    info!(
        "Opened {}: {} columns, {total_lines} lines, encoding {encoding}",
        path.display(),
        header.len()
    );
    Ok(OpenedFile { path: path.to_path_buf(), header, encoding, total_lines, preview })
}

/// How a search ended
#[derive(Debug)]
pub enum SearchOutcome {
    /// Scan reached end of file or the match cap
    Completed(SearchResult),
    /// Scan reported an error
    Failed(Error),
    /// Worker stopped without a terminal event
    Cancelled,
}

/// A search running on its own worker thread
///
/// Dropping the handle cancels the search and joins the worker.
#[derive(Debug)]
pub struct SearchHandle {
    events: Receiver<ScanEvent>,
    token:  CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl SearchHandle {
    /// Start scanning `path` on a new worker thread
    ///
    /// # Errors
    /// Returns error if the worker thread cannot be spawned
    pub fn spawn(path: &Path, config: ScanConfig) -> Result<Self> {
        let token = CancellationToken::new();
        let scanner = Scanner::open(path, config, token.clone());
        let (tx, events) = bounded(EVENT_BUFFER);

        let worker = thread::Builder::new().name("boxfind-scan".into()).spawn(move || {
            for event in scanner {
                if tx.send(event).is_err() {
                    debug!("Search receiver dropped; stopping scan");
                    break;
                }
            }
        })?;

        Ok(Self { events, token, worker: Some(worker) })
    }

    /// Events as they arrive; the channel disconnects when the worker ends
    #[must_use]
    pub const fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.token.set();
    }

    /// Token shared with the worker, for cancelling from another thread
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Block until the worker ends, passing each progress value to `on_progress`
    pub fn wait_with(mut self, mut on_progress: impl FnMut(u8)) -> SearchOutcome {
        let mut outcome = SearchOutcome::Cancelled;
        for event in &self.events {
            match event {
                ScanEvent::Progress(percent) => on_progress(percent),
                ScanEvent::Result(result) => outcome = SearchOutcome::Completed(result),
                ScanEvent::Error(e) => outcome = SearchOutcome::Failed(e),
            }
        }
        if self.join().is_err() {
            return SearchOutcome::Failed(Error::WorkerPanicked);
        }
        outcome
    }

    /// Block until the worker ends, ignoring progress
    pub fn wait(self) -> SearchOutcome {
        self.wait_with(|_| {})
    }

    fn join(&mut self) -> std::result::Result<(), ()> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| ()),
            None => Ok(()),
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
            // Unblock a worker waiting on a full channel
            for _ in &self.events {}
            let _ = self.join();
        }
    }
}

/// Controller state: one open file and at most one running search
#[derive(Debug, Default)]
pub struct Session {
    file:   Option<OpenedFile>,
    search: Option<SearchHandle>,
}

impl Session {
    /// Create a session with nothing open
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file, replacing the current one only on success
    ///
    /// # Errors
    /// Returns the configuration error from [`open_file`]; prior state is kept
    pub fn open(&mut self, path: &Path) -> Result<&OpenedFile> {
        let opened = open_file(path)?;
        self.stop_search();
        Ok(self.file.insert(opened))
    }

    /// Currently open file, if any
    #[must_use]
    pub const fn file(&self) -> Option<&OpenedFile> {
        self.file.as_ref()
    }

    /// Start a search on the open file, superseding any running one
    ///
    /// # Errors
    /// Returns error if no file is open or the worker cannot be spawned
    pub fn start_search(&mut self, window: QueryWindow) -> Result<&SearchHandle> {
        let Some(file) = &self.file else {
            return Err(Error::NoFileOpen);
        };
        let config =
            ScanConfig { total_lines: file.total_lines, window, encoding: file.encoding };
        let path = file.path.clone();

        self.stop_search();
        let handle = SearchHandle::spawn(&path, config)?;
        debug!("Search started on {}", path.display());
        Ok(self.search.insert(handle))
    }

    /// Request cancellation of the running search, if any
    pub fn cancel_search(&self) {
        if let Some(search) = &self.search {
            search.cancel();
        }
    }

    /// Wait for the running search to end
    ///
    /// Returns `None` when no search was started.
    pub fn finish_search(&mut self, on_progress: impl FnMut(u8)) -> Option<SearchOutcome> {
        self.search.take().map(|search| search.wait_with(on_progress))
    }

    /// Cancel and join the running search
    fn stop_search(&mut self) {
        // Dropping the handle cancels and joins
        drop(self.search.take());
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::types::{MAX_MATCHES, Point};

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn large_csv(rows: usize) -> String {
        let mut data = String::from("id,x,y,z\n");
        for i in 0..rows {
            writeln!(data, "{i},0,0,0").unwrap();
        }
        data
    }

    fn origin(lag: u32) -> QueryWindow {
        QueryWindow::new(Point::new(0.0, 0.0, 0.0), lag)
    }

    #[test]
    fn test_open_file_counts_and_previews() {
        let temp_dir = TempDir::new().unwrap();
        let mut data = String::from("Id,X,Y,Z\n1,0,0\n");
        for i in 0..150 {
            writeln!(data, "{i},0,0,0").unwrap();
        }
        let path = write_csv(&temp_dir, "points.csv", &data);

        let opened = open_file(&path).unwrap();
        assert_eq!(opened.header, ["Id", "X", "Y", "Z"]);
        assert_eq!(opened.encoding, CoordinateEncoding::Separate { x: 1, y: 2, z: 3 });
        assert_eq!(opened.total_lines, 151);
        assert_eq!(opened.preview.len(), MAX_PREVIEW_ROWS);
        assert_eq!(opened.preview[0][0], "0");
    }

    #[test]
    fn test_open_and_search_with_byte_order_mark() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "excel.csv", "\u{feff}x,y,z\n1,2,3\n50,50,50\n");

        let mut session = Session::new();
        let opened = session.open(&path).unwrap();
        assert_eq!(opened.header, ["x", "y", "z"]);
        assert_eq!(opened.encoding, CoordinateEncoding::Separate { x: 0, y: 1, z: 2 });
        assert_eq!(opened.total_lines, 2);

        session.start_search(origin(5)).unwrap();
        let Some(SearchOutcome::Completed(result)) = session.finish_search(|_| {}) else {
            panic!("Expected completed search");
        };
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0], ["1", "2", "3"]);
    }

    #[test]
    fn test_open_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = temp_dir.path().join("missing.csv");
        assert!(matches!(open_file(&missing), Err(Error::Open(_))));

        let empty = write_csv(&temp_dir, "empty.csv", "");
        assert!(matches!(open_file(&empty), Err(Error::Empty)));

        let no_coords = write_csv(&temp_dir, "names.csv", "id,name\n1,a\n");
        let err = open_file(&no_coords).unwrap_err();
        assert!(matches!(err, Error::Unresolved));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_search_completes() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "points.csv", "id,x,y,z\n1,0,0,0\n2,150,0,0\n");
        let opened = open_file(&path).unwrap();

        let config = ScanConfig {
            total_lines: opened.total_lines,
            window:      origin(100),
            encoding:    opened.encoding,
        };
        let mut progress = Vec::new();
        let outcome = SearchHandle::spawn(&path, config).unwrap().wait_with(|p| progress.push(p));

        let SearchOutcome::Completed(result) = outcome else {
            panic!("Expected completed search");
        };
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "1");
        assert_eq!(progress, [50, 100]);
    }

    #[test]
    fn test_search_cap_on_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "large.csv", &large_csv(1000));

        let mut session = Session::new();
        session.open(&path).unwrap();
        session.start_search(origin(0)).unwrap();

        let mut last = 0;
        let outcome = session
            .finish_search(|p| {
                assert!(p >= last, "Progress must not decrease");
                last = p;
            })
            .unwrap();
        assert_eq!(last, 100);
        assert!(matches!(outcome, SearchOutcome::Completed(r) if r.rows.len() == MAX_MATCHES));
    }

    #[test]
    fn test_search_failure_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config = ScanConfig {
            total_lines: 0,
            window:      origin(0),
            encoding:    CoordinateEncoding::Combined(0),
        };
        let missing = temp_dir.path().join("gone.csv");
        let outcome = SearchHandle::spawn(&missing, config).unwrap().wait();
        assert!(matches!(outcome, SearchOutcome::Failed(Error::Open(_))));
    }

    #[test]
    fn test_cancel_yields_no_result() {
        let temp_dir = TempDir::new().unwrap();
        // Nothing matches, so the scan runs to end of file unless cancelled
        let path = write_csv(&temp_dir, "large.csv", &large_csv(200_000));
        let opened = open_file(&path).unwrap();
        let config = ScanConfig {
            total_lines: opened.total_lines,
            window:      QueryWindow::new(Point::new(1e9, 1e9, 1e9), 0),
            encoding:    opened.encoding,
        };

        let handle = SearchHandle::spawn(&path, config).unwrap();
        match handle.events().recv().unwrap() {
            ScanEvent::Progress(_) => {},
            other => panic!("Expected progress, got {other:?}"),
        }
        handle.cancel();

        assert!(matches!(handle.wait(), SearchOutcome::Cancelled));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "large.csv", &large_csv(200_000));

        let mut session = Session::new();
        session.open(&path).unwrap();
        let window = QueryWindow::new(Point::new(5.0, 5.0, 5.0), 0);
        let token = session.start_search(window).unwrap().token();

        let canceller = thread::spawn(move || token.set());
        canceller.join().unwrap();

        assert!(matches!(session.finish_search(|_| {}), Some(SearchOutcome::Cancelled)));
        assert!(session.finish_search(|_| {}).is_none());
    }

    #[test]
    fn test_session_cancel_search() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "large.csv", &large_csv(200_000));

        let mut session = Session::new();
        session.cancel_search();
        session.open(&path).unwrap();
        session.start_search(QueryWindow::new(Point::new(5.0, 5.0, 5.0), 0)).unwrap();
        session.cancel_search();

        assert!(matches!(session.finish_search(|_| {}), Some(SearchOutcome::Cancelled)));
    }

    #[test]
    fn test_new_search_supersedes_running_one() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "large.csv", &large_csv(200_000));

        let mut session = Session::new();
        session.open(&path).unwrap();
        let window = QueryWindow::new(Point::new(5.0, 5.0, 5.0), 0);
        let first = session.start_search(window).unwrap().token();
        session.start_search(origin(0)).unwrap();

        assert!(first.is_set());
        assert!(matches!(session.finish_search(|_| {}), Some(SearchOutcome::Completed(_))));
    }

    #[test]
    fn test_failed_open_keeps_previous_file() {
        let temp_dir = TempDir::new().unwrap();
        let good = write_csv(&temp_dir, "good.csv", "id,relativeLocation\n1,5 5 5\n");
        let bad = write_csv(&temp_dir, "bad.csv", "id,name\n");

        let mut session = Session::new();
        assert!(matches!(session.start_search(origin(0)), Err(Error::NoFileOpen)));

        session.open(&good).unwrap();
        assert!(session.open(&bad).is_err());
        assert_eq!(session.file().unwrap().path, good);

        session.start_search(QueryWindow::new(Point::new(5.0, 5.0, 5.0), 0)).unwrap();
        let Some(SearchOutcome::Completed(result)) = session.finish_search(|_| {}) else {
            panic!("Expected completed search");
        };
        assert!(result.found());
    }
}
