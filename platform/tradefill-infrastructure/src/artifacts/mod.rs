use chrono::{TimeZone, Utc};
use std::io::Write;
use std::path::Path;
use tradefill_domain::value_objects::candle::Candle;

pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), String> {
    let wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create candles csv {}: {}", path.display(), err))?;
    write_candles(wtr, candles)
}

/// Same layout as [`write_candles_csv`], to any writer (stdout for the CLI).
pub fn write_candles_to<W: Write>(out: W, candles: &[Candle]) -> Result<(), String> {
    write_candles(csv::Writer::from_writer(out), candles)
}

fn write_candles<W: Write>(mut wtr: csv::Writer<W>, candles: &[Candle]) -> Result<(), String> {
    wtr.write_record([
        "timestamp", "time_utc", "open", "high", "low", "close", "volume", "trades",
    ])
    .map_err(|err| format!("failed to write candles csv header: {}", err))?;

    for candle in candles {
        let time_utc = Utc
            .timestamp_opt(candle.timestamp, 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        wtr.write_record([
            candle.timestamp.to_string(),
            time_utc,
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            candle.trades.to_string(),
        ])
        .map_err(|err| format!("failed to write candle row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush candles csv: {}", err))
}
