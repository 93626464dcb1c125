//! Query text parsing

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Point;

impl FromStr for Point {
    type Err = Error;

    /// Parse `"x y z"`: exactly three whitespace-separated numbers
    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let &[x, y, z] = tokens.as_slice() else {
            return Err(Error::query("enter exactly three numbers (x y z)"));
        };

        let parse = |token: &str| {
            token.parse::<f64>().map_err(|_| Error::query("query values must be valid numbers"))
        };
        Ok(Self::new(parse(x)?, parse(y)?, parse(z)?))
    }
}

/// Parse a tolerance: a non-negative integer
///
/// # Errors
/// Returns `Error::InvalidLag` for anything else
pub fn parse_lag(text: &str) -> Result<u32> {
    text.trim().parse().map_err(|_| Error::InvalidLag)
}
