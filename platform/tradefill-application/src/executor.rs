//! Executes planned fetch windows.
//!
//! Forward windows stream pages oldest first and merge each page once it
//! continues the id chain from the stored newest id. Backward and full windows
//! walk from the upper bound towards the lower bound in time chunks; a chunk
//! is merged only when it ends right below the current anchor id, and its
//! first id becomes the next anchor. Either way the stored series only ever
//! grows at its edges, so an aborted window leaves no hole behind.
//!
//! A chunk is held in memory until it is complete, so a chunk that reaches
//! `max_chunk_pages` is abandoned and retried at half its width. A failure
//! then costs at most that many pages, and everything merged before it stays.

use crate::fetcher::{FetchSettings, PageFetcher};
use crate::merge_writer::MergeWriter;
use std::time::Duration;
use tradefill_domain::errors::SyncError;
use tradefill_domain::repositories::trade_source::TradeSource;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::clock::Clock;
use tradefill_domain::services::merge::{connects_below, first_break, normalize_batch, IdChain};
use tradefill_domain::value_objects::trade::TradeRecord;
use tradefill_domain::value_objects::window::{Direction, FetchWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub fetch: FetchSettings,
    /// Time span of one backward chunk.
    pub backfill_chunk_seconds: i64,
    /// Pages one backward chunk may take before it is split.
    pub max_chunk_pages: u32,
    /// Empty history below known data, in multiples of
    /// `backfill_chunk_seconds`, after which a backward walk assumes it
    /// reached the start of the remote history.
    pub quiet_chunks: u32,
    /// Compare stored count and id span after every sync that added records.
    pub verify_after_sync: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings {
                request_delay: Duration::from_millis(250),
                ..FetchSettings::default()
            },
            backfill_chunk_seconds: 86_400,
            max_chunk_pages: 50,
            quiet_chunks: 7,
            verify_after_sync: false,
        }
    }
}

enum ChunkRead {
    Complete { batch: Vec<TradeRecord>, pages: u64 },
    /// Hit the page cap before the chunk ended.
    Oversized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStats {
    pub records_added: u64,
    pub pages: u64,
    pub batches: u64,
}

pub struct WindowExecutor<'a, S: ?Sized, T: ?Sized, C: ?Sized> {
    source: &'a S,
    writer: MergeWriter<'a, T>,
    clock: &'a C,
    settings: &'a SyncSettings,
    stats: WindowStats,
}

impl<'a, S, T, C> WindowExecutor<'a, S, T, C>
where
    S: TradeSource + ?Sized,
    T: TradeStore + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(source: &'a S, store: &'a T, clock: &'a C, settings: &'a SyncSettings) -> Self {
        Self {
            source,
            writer: MergeWriter::new(store),
            clock,
            settings,
            stats: WindowStats::default(),
        }
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    pub fn execute(&mut self, window: &FetchWindow) -> Result<(), SyncError> {
        let span = tracing::info_span!(
            "app.sync.window",
            symbol = %window.symbol,
            direction = window.direction.as_str(),
            from_ts = window.interval.from_ts,
            to_ts = window.interval.to_ts,
        );
        let _guard = span.enter();
        if window.interval.is_empty() {
            return Ok(());
        }

        let result = match (window.direction, window.anchor_id) {
            (Direction::Forward, Some(anchor)) => self.run_forward(window, anchor),
            (Direction::Forward, None) => Err(SyncError::Config(format!(
                "{window}: forward window without an anchor id"
            ))),
            (Direction::Backward, anchor) | (Direction::Full, anchor) => {
                self.run_backward(window, anchor)
            }
        };

        match &result {
            Ok(()) => tracing::info!(
                records_added = self.stats.records_added,
                pages = self.stats.pages,
                "window complete"
            ),
            Err(err) => tracing::warn!(
                records_added = self.stats.records_added,
                pages = self.stats.pages,
                error = %err,
                "window aborted"
            ),
        }
        result
    }

    fn run_forward(&mut self, window: &FetchWindow, anchor: i64) -> Result<(), SyncError> {
        let settings: &'a SyncSettings = self.settings;
        let mut fetcher = PageFetcher::new(
            self.source,
            self.clock,
            &settings.fetch,
            &window.symbol,
            window.interval.from_ts,
            window.interval.to_ts,
        )
        .skip_through(anchor);
        let mut chain = IdChain::after(anchor);
        let pages_before = self.stats.pages;

        loop {
            let next = fetcher.next();
            self.stats.pages = pages_before + fetcher.pages();
            let page = match next {
                None => return Ok(()),
                Some(page) => page?,
            };
            if page.is_empty() {
                continue;
            }
            chain
                .accept(&page)
                .map_err(|gap| SyncError::RemoteFailure(format!("{window}: {gap}")))?;
            self.merge(&window.symbol, page)?;
        }
    }

    fn run_backward(&mut self, window: &FetchWindow, anchor: Option<i64>) -> Result<(), SyncError> {
        let chunk = self.settings.backfill_chunk_seconds.max(1);
        let page_cap = u64::from(self.settings.max_chunk_pages.max(1));
        let quiet_limit = i64::from(self.settings.quiet_chunks).saturating_mul(chunk);
        let floor = window.interval.from_ts;
        let mut anchor_id = anchor;
        // Anchored walks re-read the anchor instant: other records may share
        // the stored oldest timestamp.
        let mut upper = match anchor {
            Some(_) => window.interval.to_ts.saturating_add(1),
            None => window.interval.to_ts,
        };
        let mut span = chunk;
        let mut quiet_seconds = 0i64;

        loop {
            let lower = upper.saturating_sub(span).max(floor);
            if lower >= upper {
                return Ok(());
            }
            let (batch, pages) = match self.collect_chunk(&window.symbol, lower, upper, anchor_id)? {
                ChunkRead::Complete { batch, pages } => (batch, pages),
                ChunkRead::Oversized => {
                    span = ((upper - lower) / 2).max(1);
                    metrics::counter!("tradefill.app.sync.chunk_splits_total").increment(1);
                    tracing::debug!(lower, upper, span_seconds = span, "chunk over page cap, splitting");
                    continue;
                }
            };

            if let Some(first) = batch.first() {
                quiet_seconds = 0;
                let first_id = first.id;
                let check = match anchor_id {
                    Some(anchor) => connects_below(&batch, anchor),
                    None => first_break(&batch).map_or(Ok(()), Err),
                };
                check.map_err(|gap| {
                    SyncError::RemoteFailure(format!("{window}: chunk [{lower}, {upper}): {gap}"))
                })?;
                self.merge(&window.symbol, batch)?;
                anchor_id = Some(first_id);
            } else if anchor_id.is_some() {
                quiet_seconds = quiet_seconds.saturating_add(upper - lower);
                if quiet_limit > 0 && quiet_seconds >= quiet_limit {
                    tracing::info!(
                        reached_ts = lower,
                        quiet_seconds,
                        "no older records upstream, stopping backward walk"
                    );
                    return Ok(());
                }
            }

            if lower <= floor {
                return Ok(());
            }
            // sparse history: widen again towards the configured chunk
            if pages.saturating_mul(4) <= page_cap {
                span = span.saturating_mul(2).min(chunk);
            }
            upper = lower;
        }
    }

    fn collect_chunk(
        &mut self,
        symbol: &str,
        lower: i64,
        upper: i64,
        anchor_id: Option<i64>,
    ) -> Result<ChunkRead, SyncError> {
        let settings: &'a SyncSettings = self.settings;
        let page_cap = u64::from(settings.max_chunk_pages.max(1));
        // a single second cannot be split further
        let splittable = upper - lower > 1;
        let mut fetcher = PageFetcher::new(
            self.source,
            self.clock,
            &settings.fetch,
            symbol,
            lower,
            upper,
        );
        let mut records = Vec::new();
        let outcome = loop {
            match fetcher.next() {
                None => break Ok(true),
                Some(Ok(page)) => {
                    records.extend(page);
                    if splittable && fetcher.pages() >= page_cap && !fetcher.is_exhausted() {
                        break Ok(false);
                    }
                }
                Some(Err(err)) => break Err(err),
            }
        };
        let pages = fetcher.pages();
        self.stats.pages += pages;
        if !outcome? {
            return Ok(ChunkRead::Oversized);
        }

        let mut batch = normalize_batch(records);
        if let Some(anchor) = anchor_id {
            batch.retain(|r| r.id < anchor);
        }
        Ok(ChunkRead::Complete { batch, pages })
    }

    fn merge(&mut self, symbol: &str, batch: Vec<TradeRecord>) -> Result<(), SyncError> {
        let added = self.writer.merge(symbol, batch)?;
        self.stats.records_added += added;
        self.stats.batches += 1;
        Ok(())
    }
}
