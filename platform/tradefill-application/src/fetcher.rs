//! Paginated remote reads.
//!
//! A window is read as a lazy sequence of pages. After each full page the
//! cursor moves to the timestamp of the last record received, so the instant
//! at the page boundary is read again; ids already emitted are dropped. A page
//! shorter than the source's page size ends the window.

use std::time::{Duration, Instant};
use tradefill_domain::errors::SyncError;
use tradefill_domain::repositories::trade_source::TradeSource;
use tradefill_domain::services::clock::Clock;
use tradefill_domain::services::merge::normalize_batch;
use tradefill_domain::value_objects::trade::TradeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchSettings {
    pub retry: RetryPolicy,
    /// Pause between consecutive page requests of one window.
    pub request_delay: Duration,
}

/// One bounded remote read, retrying transient failures with exponential backoff.
pub fn fetch_page_with_retry<S, C>(
    source: &S,
    clock: &C,
    retry: &RetryPolicy,
    symbol: &str,
    from_ts: i64,
    to_ts: i64,
    limit: usize,
) -> Result<Vec<TradeRecord>, SyncError>
where
    S: TradeSource + ?Sized,
    C: Clock + ?Sized,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let started = Instant::now();
        let err = match source.fetch_page(symbol, from_ts, to_ts, limit) {
            Ok(page) => {
                metrics::counter!("tradefill.app.fetch.requests_total", "result" => "ok")
                    .increment(1);
                metrics::histogram!("tradefill.app.fetch.request_ms")
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                return Ok(page);
            }
            Err(err) => SyncError::from(err),
        };

        let msg = match err {
            SyncError::RemoteTransient(msg) => msg,
            err => {
                metrics::counter!("tradefill.app.fetch.requests_total", "result" => "rejected")
                    .increment(1);
                tracing::error!(symbol = %symbol, from_ts, to_ts, error = %err, "remote rejected request");
                return Err(SyncError::RemoteFailure(format!("{symbol}: {}", err.message())));
            }
        };
        metrics::counter!("tradefill.app.fetch.requests_total", "result" => "unavailable")
            .increment(1);
        if attempt >= max_attempts {
            tracing::error!(
                symbol = %symbol,
                attempts = attempt,
                error = %msg,
                "remote unavailable, giving up"
            );
            return Err(SyncError::RemoteFailure(format!(
                "{symbol}: remote unavailable after {attempt} attempts: {msg}"
            )));
        }
        let backoff = retry.delay_for(attempt);
        metrics::counter!("tradefill.app.fetch.retries_total").increment(1);
        tracing::warn!(
            symbol = %symbol,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %msg,
            "remote unavailable, retrying"
        );
        clock.sleep(backoff);
    }
}

/// Lazy page sequence over `[from_ts, to_ts)` for one symbol.
pub struct PageFetcher<'a, S: ?Sized, C: ?Sized> {
    source: &'a S,
    clock: &'a C,
    settings: &'a FetchSettings,
    symbol: &'a str,
    cursor: i64,
    to_ts: i64,
    last_id: Option<i64>,
    pages: u64,
    done: bool,
}

impl<'a, S, C> PageFetcher<'a, S, C>
where
    S: TradeSource + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        source: &'a S,
        clock: &'a C,
        settings: &'a FetchSettings,
        symbol: &'a str,
        from_ts: i64,
        to_ts: i64,
    ) -> Self {
        Self {
            source,
            clock,
            settings,
            symbol,
            cursor: from_ts,
            to_ts,
            last_id: None,
            pages: 0,
            done: false,
        }
    }

    /// Drops every record with an id at or below `id`.
    pub fn skip_through(mut self, id: i64) -> Self {
        self.last_id = Some(self.last_id.map_or(id, |last| last.max(id)));
        self
    }

    /// True once a short or empty page ended the window, or an error did.
    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    fn fetch_next(&mut self) -> Result<Option<Vec<TradeRecord>>, SyncError> {
        if self.cursor >= self.to_ts {
            return Ok(None);
        }
        if self.pages > 0 && !self.settings.request_delay.is_zero() {
            self.clock.sleep(self.settings.request_delay);
        }

        let limit = self.source.max_page_size().max(1);
        let raw = fetch_page_with_retry(
            self.source,
            self.clock,
            &self.settings.retry,
            self.symbol,
            self.cursor,
            self.to_ts,
            limit,
        )?;
        self.pages += 1;
        metrics::counter!("tradefill.app.fetch.pages_total").increment(1);

        if raw.is_empty() {
            return Ok(None);
        }

        let full = raw.len() >= limit;
        let page = normalize_batch(raw);
        let page_last_ts = page.last().map(|r| r.timestamp).unwrap_or(self.cursor);

        let floor_id = self.last_id;
        let to_ts = self.to_ts;
        let fresh: Vec<TradeRecord> = page
            .into_iter()
            .filter(|r| floor_id.map_or(true, |last| r.id > last) && r.timestamp < to_ts)
            .collect();
        if let Some(last) = fresh.last() {
            self.last_id = Some(last.id);
        }

        tracing::trace!(
            symbol = %self.symbol,
            cursor = self.cursor,
            fresh = fresh.len(),
            full,
            "page received"
        );

        if !full {
            self.done = true;
            return Ok(Some(fresh));
        }

        if page_last_ts <= self.cursor {
            return Err(SyncError::RemoteFailure(format!(
                "{}: page saturated at timestamp {} ({} records share one instant)",
                self.symbol, self.cursor, limit
            )));
        }
        self.cursor = page_last_ts;
        Ok(Some(fresh))
    }
}

impl<'a, S, C> Iterator for PageFetcher<'a, S, C>
where
    S: TradeSource + ?Sized,
    C: Clock + ?Sized,
{
    type Item = Result<Vec<TradeRecord>, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fetch_next() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
