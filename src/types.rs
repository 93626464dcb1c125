//! Common types and constants for `BoxFind`

use arrayvec::ArrayVec;

/// Field delimiter of the source format; no quoting or escaping
pub const DELIMITER: char = ',';

/// Maximum number of matching rows a search returns
pub const MAX_MATCHES: usize = 100;

/// Maximum number of well-formed rows kept as a preview when opening a file
pub const MAX_PREVIEW_ROWS: usize = 100;

/// Maximum number of queries kept in the search history
pub const MAX_HISTORY: usize = 20;

/// Default tolerance applied to each axis
pub const DEFAULT_LAG: u32 = 100;

/// One row of the source, split on `DELIMITER`
pub type Record = Vec<String>;

/// A point in the coordinate domain of the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Closed cube `[center - lag, center + lag]` on every axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWindow {
    /// Center of the cube
    pub center: Point,
    /// Tolerance applied uniformly to all three axes
    pub lag:    u32,
}

impl QueryWindow {
    /// Create a new query window
    #[must_use]
    pub const fn new(center: Point, lag: u32) -> Self {
        Self { center, lag }
    }

    /// Whether `point` lies inside the window, bounds included
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let lag = f64::from(self.lag);
        let within = |value: f64, center: f64| value >= center - lag && value <= center + lag;
        within(point.x, self.center.x)
            && within(point.y, self.center.y)
            && within(point.z, self.center.z)
    }
}

/// Header row followed by at most `MAX_MATCHES` matching rows, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Header row of the source
    pub header: Record,
    /// Matching rows
    pub rows:   ArrayVec<Record, MAX_MATCHES>,
}

impl SearchResult {
    /// Start an empty result for the given header
    #[must_use]
    pub fn new(header: Record) -> Self {
        Self { header, rows: ArrayVec::new() }
    }

    /// Whether at least one row matched
    #[must_use]
    pub fn found(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Whether the match cap has been reached
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rows.is_full()
    }

    /// Header first, then every matching row
    pub fn iter_rows(&self) -> impl Iterator<Item = &Record> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }
}

const _: () = {
    assert!(MAX_MATCHES > 0);
    assert!(MAX_PREVIEW_ROWS > 0);
    assert!(MAX_HISTORY > 0);
};
