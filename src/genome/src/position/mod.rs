use std::{fmt::{self, Display, Formatter}, str::FromStr};

mod error;
pub use error::ParsePositionError;

/// A 1-based physical position along a contig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(pub u32);

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<u32>()?))
    }
}

impl From<u32> for Position {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Position> for u32 {
    fn from(value: Position) -> Self {
        value.0
    }
}

impl Position {
    #[must_use]
    pub fn checked_add_signed(self, delta: i64) -> Option<Self> {
        let signed = i64::from(self.0) + delta;
        u32::try_from(signed).ok().map(Self)
    }
}
