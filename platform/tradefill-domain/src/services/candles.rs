use crate::value_objects::candle::Candle;
use crate::value_objects::trade::TradeRecord;

/// Groups id-ordered trades into fixed-step OHLC candles. Buckets without
/// trades are skipped rather than forward-filled.
pub fn aggregate_trades(trades: &[TradeRecord], step_seconds: i64) -> Result<Vec<Candle>, String> {
    if step_seconds <= 0 {
        return Err("step_seconds must be > 0".to_string());
    }
    if trades.is_empty() {
        return Ok(Vec::new());
    }

    let mut output = Vec::new();
    let mut bucket: Option<Candle> = None;

    for trade in trades {
        let bucket_start = trade
            .timestamp
            .saturating_sub(trade.timestamp.rem_euclid(step_seconds));

        match bucket.as_mut() {
            Some(active) if active.timestamp == bucket_start => {
                active.high = active.high.max(trade.price);
                active.low = active.low.min(trade.price);
                active.close = trade.price;
                active.volume += trade.amount;
                active.trades += 1;
            }
            _ => {
                if let Some(done) = bucket.take() {
                    output.push(done);
                }
                bucket = Some(Candle {
                    timestamp: bucket_start,
                    open: trade.price,
                    high: trade.price,
                    low: trade.price,
                    close: trade.price,
                    volume: trade.amount,
                    trades: 1,
                });
            }
        }
    }

    if let Some(done) = bucket {
        output.push(done);
    }
    Ok(output)
}
