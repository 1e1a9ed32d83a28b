use serde::Serialize;

/// OHLC aggregate of the trades whose timestamp falls in
/// `[timestamp, timestamp + step)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trades: u64,
}
