use crate::value_objects::interval::Interval;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// No stored coverage; the window stands alone.
    Full,
    /// Extends coverage into the past, ending at the stored oldest record.
    Backward,
    /// Extends coverage into the future, starting at the stored newest record.
    Forward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Full => "full",
            Direction::Backward => "backward",
            Direction::Forward => "forward",
        }
    }
}

/// A single contiguous time range targeted for one fetch-and-merge pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    pub symbol: String,
    pub interval: Interval,
    pub direction: Direction,
    /// Stored boundary id the fetched data must connect to: the oldest id for
    /// backward windows, the newest id for forward windows.
    pub anchor_id: Option<i64>,
}

impl FetchWindow {
    pub fn full(symbol: &str, interval: Interval) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval,
            direction: Direction::Full,
            anchor_id: None,
        }
    }

    pub fn backward(symbol: &str, interval: Interval, oldest_id: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval,
            direction: Direction::Backward,
            anchor_id: Some(oldest_id),
        }
    }

    pub fn forward(symbol: &str, interval: Interval, newest_id: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval,
            direction: Direction::Forward,
            anchor_id: Some(newest_id),
        }
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.symbol,
            self.direction.as_str(),
            self.interval
        )
    }
}
