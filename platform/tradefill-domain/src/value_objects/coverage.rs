use crate::value_objects::interval::{IdRange, Interval};
use serde::Serialize;

/// Oldest and newest stored record of a symbol. Every id between the two is
/// expected to be present in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub oldest_ts: i64,
    pub oldest_id: i64,
    pub newest_ts: i64,
    pub newest_id: i64,
}

impl Coverage {
    pub fn interval(&self) -> Interval {
        Interval::new(self.oldest_ts, self.newest_ts)
    }

    pub fn id_range(&self) -> IdRange {
        IdRange::new(self.oldest_id, self.newest_id)
    }

    pub fn expected_count(&self) -> u64 {
        self.id_range().len()
    }
}

impl std::fmt::Display for Coverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ {} : {}, {} : {} }}",
            self.oldest_ts, self.oldest_id, self.newest_ts, self.newest_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum Consistency {
    Verified,
    Duplicates(u64),
    Gaps(u64),
}

impl Consistency {
    pub fn is_verified(&self) -> bool {
        matches!(self, Consistency::Verified)
    }
}

/// Summary of one stored series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesInfo {
    pub symbol: String,
    pub coverage: Option<Coverage>,
    pub count: u64,
}
