use crate::errors::SyncError;
use crate::value_objects::coverage::Coverage;
use chrono::{DateTime, Utc};

/// One side of a requested interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Literal(i64),
    /// Current stored oldest timestamp.
    Oldest,
    /// Current stored newest timestamp.
    Newest,
    /// Epoch for a lower bound, `now` for an upper bound.
    Unbounded,
}

impl Bound {
    /// Accepts `oldest`, `newest`, epoch seconds or millis, or RFC3339.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "" => return Err("empty bound".to_string()),
            "oldest" => return Ok(Bound::Oldest),
            "newest" => return Ok(Bound::Newest),
            _ => {}
        }
        parse_time_input(trimmed).map(Bound::Literal)
    }

    pub fn from_option(value: Option<&str>) -> Result<Self, String> {
        match value {
            Some(raw) => Self::parse(raw),
            None => Ok(Bound::Unbounded),
        }
    }

    /// Resolves the bound against a coverage snapshot. `default` is used for
    /// `Unbounded`.
    pub fn resolve(&self, coverage: Option<&Coverage>, default: i64) -> Result<i64, SyncError> {
        match self {
            Bound::Literal(ts) => Ok(*ts),
            Bound::Unbounded => Ok(default),
            Bound::Oldest => coverage.map(|c| c.oldest_ts).ok_or_else(|| {
                SyncError::Config("sentinel 'oldest' requires stored coverage".to_string())
            }),
            Bound::Newest => coverage.map(|c| c.newest_ts).ok_or_else(|| {
                SyncError::Config("sentinel 'newest' requires stored coverage".to_string())
            }),
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Literal(ts) => write!(f, "{ts}"),
            Bound::Oldest => f.write_str("oldest"),
            Bound::Newest => f.write_str("newest"),
            Bound::Unbounded => f.write_str("unbounded"),
        }
    }
}

pub fn parse_time_input(value: &str) -> Result<i64, String> {
    if let Ok(ts) = value.parse::<i64>() {
        let seconds = if ts > 1_000_000_000_000 { ts / 1000 } else { ts };
        return Ok(seconds);
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).timestamp())
        .map_err(|_| format!("unsupported timestamp format: {value}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_time_input, Bound};
    use crate::errors::ErrorKind;
    use crate::value_objects::coverage::Coverage;

    fn coverage() -> Coverage {
        Coverage {
            oldest_ts: 1_000,
            oldest_id: 100,
            newest_ts: 5_000,
            newest_id: 500,
        }
    }

    #[test]
    fn parse_accepts_sentinels_epochs_and_rfc3339() {
        assert_eq!(Bound::parse("oldest").unwrap(), Bound::Oldest);
        assert_eq!(Bound::parse(" NEWEST ").unwrap(), Bound::Newest);
        assert_eq!(
            Bound::parse("1700000000000").unwrap(),
            Bound::Literal(1_700_000_000)
        );
        assert_eq!(
            Bound::parse("2026-01-01T00:00:00Z").unwrap(),
            Bound::Literal(1_767_225_600)
        );
        assert!(Bound::parse("yesterday").is_err());
        assert_eq!(Bound::from_option(None).unwrap(), Bound::Unbounded);
    }

    #[test]
    fn resolve_uses_coverage_for_sentinels() {
        let cov = coverage();
        assert_eq!(Bound::Oldest.resolve(Some(&cov), 0).unwrap(), 1_000);
        assert_eq!(Bound::Newest.resolve(Some(&cov), 0).unwrap(), 5_000);
        assert_eq!(Bound::Unbounded.resolve(Some(&cov), 42).unwrap(), 42);
        assert_eq!(Bound::Literal(7).resolve(None, 42).unwrap(), 7);
    }

    #[test]
    fn sentinel_without_coverage_is_config_error() {
        let err = Bound::Newest.resolve(None, 0).expect_err("no coverage");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn parse_time_input_normalizes_millis() {
        assert_eq!(parse_time_input("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time_input("1700000000123").unwrap(), 1_700_000_000);
    }
}
