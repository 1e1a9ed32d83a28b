use serde::Serialize;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::candles::aggregate_trades;
use tradefill_domain::services::consistency::check_consistency;
use tradefill_domain::value_objects::candle::Candle;
use tradefill_domain::value_objects::coverage::{Consistency, SeriesInfo};
use tradefill_domain::value_objects::interval::Interval;

pub fn series_info<T: TradeStore + ?Sized>(store: &T, symbol: &str) -> Result<SeriesInfo, String> {
    let coverage = store.coverage(symbol)?;
    let count = match coverage {
        Some(_) => store.count(symbol)?,
        None => 0,
    };
    Ok(SeriesInfo {
        symbol: symbol.to_string(),
        coverage,
        count,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyReport {
    pub info: SeriesInfo,
    pub consistency: Consistency,
}

pub fn verify_series<T: TradeStore + ?Sized>(store: &T, symbol: &str) -> Result<VerifyReport, String> {
    let info = series_info(store, symbol)?;
    let consistency = check_consistency(info.coverage.as_ref(), info.count);
    match consistency {
        Consistency::Verified => {
            tracing::debug!(symbol = %symbol, count = info.count, "series verified")
        }
        Consistency::Duplicates(extra) => {
            tracing::warn!(symbol = %symbol, extra, "series holds duplicate ids")
        }
        Consistency::Gaps(missing) => {
            tracing::warn!(symbol = %symbol, missing, "series has id gaps")
        }
    }
    Ok(VerifyReport { info, consistency })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub symbols: usize,
    pub records: u64,
    pub series: Vec<SeriesInfo>,
}

pub fn database_summary<T: TradeStore + ?Sized>(store: &T) -> Result<DatabaseSummary, String> {
    let mut series = Vec::new();
    for symbol in store.list_symbols()? {
        series.push(series_info(store, &symbol)?);
    }
    series.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    let records = series.iter().map(|info| info.count).sum();
    Ok(DatabaseSummary {
        symbols: series.len(),
        records,
        series,
    })
}

/// OHLC candles over the stored trades of `interval`.
pub fn series_candles<T: TradeStore + ?Sized>(
    store: &T,
    symbol: &str,
    interval: &Interval,
    step_seconds: i64,
) -> Result<Vec<Candle>, String> {
    if interval.is_empty() {
        return Ok(Vec::new());
    }
    let trades = store.load_range(symbol, interval)?;
    let candles = aggregate_trades(&trades, step_seconds)?;
    tracing::info!(
        symbol = %symbol,
        trades = trades.len(),
        candles = candles.len(),
        step_seconds,
        "candles aggregated"
    );
    Ok(candles)
}
