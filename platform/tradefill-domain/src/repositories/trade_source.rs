use crate::value_objects::trade::TradeRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Timeouts, rate limits, 5xx. Worth retrying.
    Unavailable(String),
    /// The request itself is wrong (unknown symbol, bad parameters).
    Rejected(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            RemoteError::Rejected(msg) => write!(f, "rejected: {msg}"),
        }
    }
}

/// Remote source of truth for trade history.
pub trait TradeSource {
    fn list_tradable_symbols(&self) -> Result<Vec<String>, RemoteError>;

    /// Returns at most `limit` records with `from_ts <= timestamp < to_ts`,
    /// ascending by id, starting from the earliest record of the range.
    fn fetch_page(
        &self,
        symbol: &str,
        from_ts: i64,
        to_ts: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, RemoteError>;

    fn max_page_size(&self) -> usize;
}
