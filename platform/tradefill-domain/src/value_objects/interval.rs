use serde::Serialize;

/// Half-open time interval `[from_ts, to_ts)` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub from_ts: i64,
    pub to_ts: i64,
}

impl Interval {
    pub fn new(from_ts: i64, to_ts: i64) -> Self {
        Self { from_ts, to_ts }
    }

    pub fn is_empty(&self) -> bool {
        self.from_ts >= self.to_ts
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.to_ts - self.from_ts).max(0)
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.from_ts && ts < self.to_ts
    }

    /// True when `other` lies fully inside `self`. An empty `other` is always covered.
    pub fn covers(&self, other: &Interval) -> bool {
        other.is_empty() || (other.from_ts >= self.from_ts && other.to_ts <= self.to_ts)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.from_ts, self.to_ts)
    }
}

/// Inclusive id span. Ids are authoritative for contiguity: timestamps are not
/// unique, ids are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdRange {
    pub first: i64,
    pub last: i64,
}

impl IdRange {
    pub fn new(first: i64, last: i64) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> u64 {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first + 1) as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}
