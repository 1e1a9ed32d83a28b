//! Binance spot REST adapter.
//!
//! `/api/v3/aggTrades` only accepts `startTime`/`endTime` spans of at most one
//! hour, so a page request over a longer range walks hour slices until the
//! page is full or the range ends.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tradefill_domain::repositories::trade_source::{RemoteError, TradeSource};
use tradefill_domain::value_objects::trade::{Side, TradeRecord};

pub const BINANCE_BASE_URL: &str = "https://api.binance.com";
const MAX_LIMIT: usize = 1000;
const MAX_SPAN_MS: i64 = 3_600_000;

#[derive(Debug, Deserialize)]
struct AggTrade {
    #[serde(rename = "a")]
    id: i64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    time_ms: i64,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: Option<String>,
}

pub struct BinanceTradeSource {
    base_url: String,
    page_size: usize,
    client: Client,
}

impl BinanceTradeSource {
    pub fn new(base_url: &str, page_size: usize, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("tradefill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: page_size.clamp(1, MAX_LIMIT),
            client,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let started = Instant::now();
        let response = self.client.get(&url).query(query).send().map_err(|err| {
            metrics::counter!("tradefill.infra.binance.requests_total", "endpoint" => endpoint, "result" => "transport")
                .increment(1);
            RemoteError::Unavailable(format!("{endpoint} request failed: {err}"))
        })?;
        metrics::histogram!("tradefill.infra.binance.request_ms", "endpoint" => endpoint)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            let result = classify_status(status, format!("{endpoint} status {status}: {snippet}"));
            metrics::counter!("tradefill.infra.binance.requests_total", "endpoint" => endpoint, "result" => "http_error")
                .increment(1);
            tracing::warn!(endpoint, status = status.as_u16(), "binance returned an error status");
            return Err(result);
        }

        metrics::counter!("tradefill.infra.binance.requests_total", "endpoint" => endpoint, "result" => "ok")
            .increment(1);
        response
            .json::<T>()
            .map_err(|err| RemoteError::Unavailable(format!("{endpoint} response parse failed: {err}")))
    }

    fn agg_trades(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms_inclusive: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, RemoteError> {
        let rows: Vec<AggTrade> = self.get_json(
            "/api/v3/aggTrades",
            &[
                ("symbol", symbol.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms_inclusive.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        parse_agg_trades(rows).map_err(RemoteError::Unavailable)
    }
}

impl TradeSource for BinanceTradeSource {
    fn list_tradable_symbols(&self) -> Result<Vec<String>, RemoteError> {
        let info: ExchangeInfo = self.get_json("/api/v3/exchangeInfo", &[])?;
        let mut symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status.as_deref().unwrap_or("TRADING") == "TRADING")
            .map(|s| s.symbol.to_uppercase())
            .collect();
        symbols.sort();
        tracing::debug!(symbols = symbols.len(), "listed tradable symbols");
        Ok(symbols)
    }

    /// aggTrades in `[from_ts, to_ts)`, scanned in hour-long slices until
    /// `limit` rows are collected.
    ///
    /// Trade times are truncated to whole seconds, and the fetcher's cursor
    /// cannot split a second. A second holding `limit` or more aggTrades
    /// therefore comes back as a saturated page on every attempt, and nothing
    /// past it can be stored. If that second sits at the stored newest edge,
    /// every ring tick for the symbol fails the same way. `[remote].page_size`
    /// defaults to Binance's 1000-row cap, so it cannot be raised past this.
    /// The way out is `tradefill one <SYMBOL> --overwrite --from <ts>` with
    /// `<ts>` after the busy second, which restarts the series above it.
    fn fetch_page(
        &self,
        symbol: &str,
        from_ts: i64,
        to_ts: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, RemoteError> {
        let limit = limit.clamp(1, self.page_size);
        let end_ms = to_ts.saturating_mul(1000);
        let mut slice_start = from_ts.saturating_mul(1000);
        let mut page = Vec::new();

        while slice_start < end_ms && page.len() < limit {
            let slice_end = (slice_start + MAX_SPAN_MS).min(end_ms);
            let wanted = limit - page.len();
            let rows = self.agg_trades(symbol, slice_start, slice_end - 1, wanted)?;
            let filled = rows.len() >= wanted;
            page.extend(rows);
            if filled {
                break;
            }
            slice_start = slice_end;
        }

        tracing::trace!(symbol = %symbol, from_ts, to_ts, records = page.len(), "aggTrades page");
        Ok(page)
    }

    fn max_page_size(&self) -> usize {
        self.page_size
    }
}

fn classify_status(status: StatusCode, message: String) -> RemoteError {
    // 418 is Binance's IP ban after ignored 429s.
    if status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 418
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RemoteError::Unavailable(message)
    } else {
        RemoteError::Rejected(message)
    }
}

fn parse_agg_trades(rows: Vec<AggTrade>) -> Result<Vec<TradeRecord>, String> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let price = parse_f64(&row.price, "price")?;
        let amount = parse_f64(&row.quantity, "quantity")?;
        records.push(TradeRecord {
            id: row.id,
            timestamp: row.time_ms.div_euclid(1000),
            price,
            amount,
            // the taker sold into a resting bid
            side: if row.buyer_is_maker { Side::Sell } else { Side::Buy },
        });
    }
    records.sort_by_key(|r| r.id);
    Ok(records)
}

fn parse_f64(value: &str, field: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|_| format!("invalid {field} value: {value}"))
}

#[cfg(test)]
mod tests {
    use super::{classify_status, parse_agg_trades, AggTrade};
    use reqwest::StatusCode;
    use tradefill_domain::repositories::trade_source::RemoteError;
    use tradefill_domain::value_objects::trade::Side;

    #[test]
    fn parses_agg_trade_payload() {
        let payload = r#"[
            {"a": 27, "p": "0.01633102", "q": "4.70443515", "f": 27781, "l": 27781, "T": 1498793709153, "m": true, "M": true},
            {"a": 26, "p": "0.01633000", "q": "1.00000000", "f": 27780, "l": 27780, "T": 1498793708999, "m": false, "M": true}
        ]"#;
        let rows: Vec<AggTrade> = serde_json::from_str(payload).expect("payload parses");
        let records = parse_agg_trades(rows).expect("records");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 26);
        assert_eq!(records[0].timestamp, 1_498_793_708);
        assert_eq!(records[0].side, Side::Buy);
        assert_eq!(records[1].side, Side::Sell);
        assert!((records[1].amount - 4.70443515).abs() < 1e-12);
    }

    #[test]
    fn trades_within_one_second_share_a_timestamp() {
        let payload = r#"[
            {"a": 5, "p": "1", "q": "1", "T": 1700000000001, "m": true},
            {"a": 6, "p": "1", "q": "1", "T": 1700000000999, "m": false},
            {"a": 7, "p": "1", "q": "1", "T": 1700000001000, "m": false}
        ]"#;
        let rows: Vec<AggTrade> = serde_json::from_str(payload).expect("payload parses");
        let stamps: Vec<i64> = parse_agg_trades(rows)
            .expect("records")
            .iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(stamps, vec![1_700_000_000, 1_700_000_000, 1_700_000_001]);
    }

    #[test]
    fn rejects_unparseable_prices() {
        let payload = r#"[{"a": 1, "p": "n/a", "q": "1", "T": 1000, "m": true}]"#;
        let rows: Vec<AggTrade> = serde_json::from_str(payload).expect("payload parses");
        assert!(parse_agg_trades(rows).unwrap_err().contains("price"));
    }

    #[test]
    fn classifies_status_codes() {
        let unavailable = |status| matches!(classify_status(status, String::new()), RemoteError::Unavailable(_));
        assert!(unavailable(StatusCode::TOO_MANY_REQUESTS));
        assert!(unavailable(StatusCode::from_u16(418).unwrap()));
        assert!(unavailable(StatusCode::BAD_GATEWAY));
        assert!(!unavailable(StatusCode::BAD_REQUEST));
        assert!(!unavailable(StatusCode::NOT_FOUND));
    }
}
