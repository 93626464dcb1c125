//! Coordinate column resolution and extraction

use std::fmt;

use crate::types::Point;

/// Header names (lowercased) of a combined `x y z` column
const COMBINED_NAMES: [&str; 2] = ["relativelocation", "relative_location"];

/// How the source encodes 3D coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateEncoding {
    /// One field holding three whitespace-separated numbers
    Combined(usize),
    /// Three fields holding x, y and z
    Separate {
        /// Index of the x field
        x: usize,
        /// Index of the y field
        y: usize,
        /// Index of the z field
        z: usize,
    },
    /// No usable coordinate layout
    Unresolved,
}

impl CoordinateEncoding {
    /// Whether a scan can proceed with this encoding
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Extract the coordinates of a well-formed row
    ///
    /// Returns `None` when the designated fields are missing, have the wrong
    /// token count, or do not parse as numbers.
    #[must_use]
    pub fn coordinates<S: AsRef<str>>(&self, fields: &[S]) -> Option<Point> {
        match *self {
            Self::Combined(index) => {
                let mut tokens = fields.get(index)?.as_ref().split_whitespace();
                let x = tokens.next()?.parse().ok()?;
                let y = tokens.next()?.parse().ok()?;
                let z = tokens.next()?.parse().ok()?;
                if tokens.next().is_some() {
                    return None;
                }
                Some(Point::new(x, y, z))
            },
            Self::Separate { x, y, z } => {
                let parse = |index: usize| fields.get(index)?.as_ref().trim().parse::<f64>().ok();
                Some(Point::new(parse(x)?, parse(y)?, parse(z)?))
            },
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for CoordinateEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combined(index) => write!(f, "combined (column {index})"),
            Self::Separate { x, y, z } => write!(f, "separate (columns {x}, {y}, {z})"),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Determine which header columns hold coordinates
///
/// Names are compared trimmed and case-insensitively. The last column for each
/// role wins, and a combined column takes priority over an x/y/z triple.
#[must_use]
pub fn resolve<S: AsRef<str>>(header: &[S]) -> CoordinateEncoding {
    let mut combined = None;
    let (mut x, mut y, mut z) = (None, None, None);

    for (index, name) in header.iter().enumerate() {
        let name = name.as_ref().trim().to_lowercase();
        match name.as_str() {
            n if COMBINED_NAMES.contains(&n) => combined = Some(index),
            "x" => x = Some(index),
            "y" => y = Some(index),
            "z" => z = Some(index),
            _ => {},
        }
    }

    match (combined, x, y, z) {
        (Some(index), ..) => CoordinateEncoding::Combined(index),
        (None, Some(x), Some(y), Some(z)) => CoordinateEncoding::Separate { x, y, z },
        _ => CoordinateEncoding::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_separate() {
        assert_eq!(
            resolve(&["id", "X", " y ", "Z"]),
            CoordinateEncoding::Separate { x: 1, y: 2, z: 3 }
        );
    }

    #[test]
    fn test_resolve_combined_variants() {
        assert_eq!(resolve(&["id", "RelativeLocation"]), CoordinateEncoding::Combined(1));
        assert_eq!(resolve(&["Relative_Location", "id"]), CoordinateEncoding::Combined(0));
    }

    #[test]
    fn test_combined_wins_over_separate() {
        assert_eq!(
            resolve(&["x", "y", "z", "relativeLocation"]),
            CoordinateEncoding::Combined(3)
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        assert_eq!(
            resolve(&["x", "y", "z", "X"]),
            CoordinateEncoding::Separate { x: 3, y: 1, z: 2 }
        );
        assert_eq!(
            resolve(&["relativelocation", "id", "RELATIVE_LOCATION"]),
            CoordinateEncoding::Combined(2)
        );
    }

    #[test]
    fn test_unresolved() {
        assert_eq!(resolve(&["id", "name"]), CoordinateEncoding::Unresolved);
        assert_eq!(resolve(&["x", "y"]), CoordinateEncoding::Unresolved);
        assert_eq!(resolve::<&str>(&[]), CoordinateEncoding::Unresolved);
        assert!(!CoordinateEncoding::Unresolved.is_resolved());
    }

    #[test]
    fn test_combined_coordinates() {
        let encoding = CoordinateEncoding::Combined(1);
        assert_eq!(encoding.coordinates(&["1", "  5 -2.5\t7 "]), Some(Point::new(5.0, -2.5, 7.0)));
        assert_eq!(encoding.coordinates(&["1", "5 5"]), None);
        assert_eq!(encoding.coordinates(&["1", "5 5 5 5"]), None);
        assert_eq!(encoding.coordinates(&["1", "5 a 5"]), None);
        assert_eq!(encoding.coordinates(&["1"]), None);
    }

    #[test]
    fn test_separate_coordinates() {
        let encoding = CoordinateEncoding::Separate { x: 1, y: 2, z: 3 };
        assert_eq!(encoding.coordinates(&["1", " 1", "2 ", "3"]), Some(Point::new(1.0, 2.0, 3.0)));
        assert_eq!(encoding.coordinates(&["1", "abc", "0", "0"]), None);
        assert_eq!(encoding.coordinates(&["1", "", "0", "0"]), None);
    }
}
