//! Sync use cases: one symbol, many symbols, and the repeating ring.

use crate::executor::{SyncSettings, WindowExecutor};
use crate::inspection::verify_series;
use crate::selection::resolve_symbols;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tradefill_domain::errors::{ErrorKind, SyncError};
use tradefill_domain::repositories::trade_source::TradeSource;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::clock::Clock;
use tradefill_domain::services::planner::{plan_windows, PlanRequest};
use tradefill_domain::value_objects::coverage::{Consistency, Coverage};
use tradefill_domain::value_objects::selector::SymbolSelector;

const CANCEL_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub records_added: u64,
    pub final_coverage: Option<Coverage>,
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SymbolOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingOptions {
    /// Pause between the end of one iteration and the start of the next.
    pub every: Duration,
    /// `None` repeats until cancelled.
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub iteration: u32,
    pub outcomes: Vec<SymbolOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RingSummary {
    pub iterations: u32,
    pub records_added: u64,
    pub failures: u64,
    pub cancelled: bool,
}

pub struct SyncService<'a, S: ?Sized, T: ?Sized, C: ?Sized> {
    source: &'a S,
    store: &'a T,
    clock: &'a C,
    settings: SyncSettings,
}

impl<'a, S, T, C> SyncService<'a, S, T, C>
where
    S: TradeSource + ?Sized,
    T: TradeStore + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(source: &'a S, store: &'a T, clock: &'a C, settings: SyncSettings) -> Self {
        Self {
            source,
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Brings one symbol up to the requested interval. Failures are reported
    /// in the outcome; whatever was merged before the failure stays stored.
    pub fn sync_one(&self, symbol: &str, request: &PlanRequest) -> SymbolOutcome {
        let span = tracing::info_span!("app.sync.symbol", symbol = %symbol);
        let _guard = span.enter();
        let started = Instant::now();

        let mut records_added = 0u64;
        let mut result = self.run_symbol(symbol, request, &mut records_added);
        if result.is_ok() && records_added > 0 && self.settings.verify_after_sync {
            result = self.verify_after(symbol);
        }

        let final_coverage = match self.store.coverage(symbol) {
            Ok(coverage) => coverage,
            Err(err) => {
                if result.is_ok() {
                    result = Err(SyncError::Storage(format!(
                        "{symbol}: unable to read coverage: {err}"
                    )));
                }
                None
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("tradefill.app.sync.symbol_ms").record(elapsed_ms);
        metrics::counter!("tradefill.app.sync.records_added_total").increment(records_added);

        match result {
            Ok(()) => {
                metrics::counter!("tradefill.app.sync.symbols_total", "result" => "ok")
                    .increment(1);
                tracing::info!(records_added, elapsed_ms, "symbol synced");
                SymbolOutcome {
                    symbol: symbol.to_string(),
                    records_added,
                    final_coverage,
                    error: None,
                    message: None,
                }
            }
            Err(err) => {
                metrics::counter!("tradefill.app.sync.symbols_total", "result" => "error")
                    .increment(1);
                tracing::warn!(records_added, elapsed_ms, error = %err, "symbol sync failed");
                SymbolOutcome {
                    symbol: symbol.to_string(),
                    records_added,
                    final_coverage,
                    error: Some(err.kind()),
                    message: Some(err.message().to_string()),
                }
            }
        }
    }

    fn run_symbol(
        &self,
        symbol: &str,
        request: &PlanRequest,
        records_added: &mut u64,
    ) -> Result<(), SyncError> {
        let coverage = self
            .store
            .coverage(symbol)
            .map_err(|err| SyncError::Storage(format!("{symbol}: unable to read coverage: {err}")))?;
        let plan = plan_windows(symbol, request, coverage.as_ref(), self.clock.now_ts())?;

        if plan.drop_first {
            self.store
                .drop_symbol(symbol)
                .map_err(|err| SyncError::Storage(format!("{symbol}: drop failed: {err}")))?;
            tracing::info!("stored series dropped for overwrite");
        }
        if plan.is_empty() {
            tracing::debug!(requested = %plan.requested, "already covered");
            return Ok(());
        }

        for window in &plan.windows {
            let mut executor = WindowExecutor::new(self.source, self.store, self.clock, &self.settings);
            let result = executor.execute(window);
            *records_added += executor.stats().records_added;
            result?;
        }
        Ok(())
    }

    fn verify_after(&self, symbol: &str) -> Result<(), SyncError> {
        let report = verify_series(self.store, symbol)
            .map_err(|err| SyncError::Storage(format!("{symbol}: verification failed: {err}")))?;
        match report.consistency {
            Consistency::Verified => Ok(()),
            Consistency::Duplicates(extra) => Err(SyncError::Storage(format!(
                "{symbol}: consistency broken, {extra} duplicate records"
            ))),
            Consistency::Gaps(missing) => Err(SyncError::Storage(format!(
                "{symbol}: consistency broken, {missing} records missing"
            ))),
        }
    }

    /// Syncs every symbol the selector resolves to. A failing symbol never
    /// stops the remaining ones.
    pub fn sync_many(
        &self,
        selector: &SymbolSelector,
        request: &PlanRequest,
    ) -> Result<Vec<SymbolOutcome>, SyncError> {
        let symbols = resolve_symbols(selector, self.source, self.store)?;
        Ok(self.sync_symbols(&symbols, request))
    }

    pub fn sync_symbols(&self, symbols: &[String], request: &PlanRequest) -> Vec<SymbolOutcome> {
        symbols
            .iter()
            .map(|symbol| self.sync_one(symbol, request))
            .collect()
    }

    /// Repeats a forward sync of every selected symbol until the iteration
    /// cap is reached or `cancel` is set. Each tick starts from the coverage
    /// stored at that moment. `cancel` is checked between iterations and
    /// while waiting; a running iteration always completes.
    pub fn sync_ring<F>(
        &self,
        selector: &SymbolSelector,
        options: &RingOptions,
        cancel: &AtomicBool,
        mut on_tick: F,
    ) -> Result<RingSummary, SyncError>
    where
        F: FnMut(&TickReport),
    {
        let symbols = resolve_symbols(selector, self.source, self.store)?;
        tracing::info!(
            symbols = symbols.len(),
            every_ms = options.every.as_millis() as u64,
            iterations = ?options.iterations,
            "ring started"
        );

        let request = PlanRequest::forward_tick();
        let mut summary = RingSummary::default();
        loop {
            if options.iterations.is_some_and(|max| summary.iterations >= max) {
                break;
            }
            if cancel.load(Ordering::SeqCst) {
                summary.cancelled = true;
                break;
            }

            summary.iterations += 1;
            let outcomes: Vec<SymbolOutcome> = symbols
                .iter()
                .map(|symbol| self.ring_symbol(symbol, &request))
                .collect();
            for outcome in &outcomes {
                summary.records_added += outcome.records_added;
                if !outcome.is_ok() {
                    summary.failures += 1;
                }
            }
            metrics::counter!("tradefill.app.ring.ticks_total").increment(1);
            on_tick(&TickReport {
                iteration: summary.iterations,
                outcomes,
            });

            if options.iterations.is_some_and(|max| summary.iterations >= max) {
                break;
            }
            if !self.wait_unless_cancelled(options.every, cancel) {
                summary.cancelled = true;
                break;
            }
        }

        tracing::info!(
            iterations = summary.iterations,
            records_added = summary.records_added,
            failures = summary.failures,
            cancelled = summary.cancelled,
            "ring finished"
        );
        Ok(summary)
    }

    fn ring_symbol(&self, symbol: &str, request: &PlanRequest) -> SymbolOutcome {
        match self.store.coverage(symbol) {
            Ok(Some(_)) => self.sync_one(symbol, request),
            Ok(None) => SymbolOutcome {
                symbol: symbol.to_string(),
                records_added: 0,
                final_coverage: None,
                error: Some(ErrorKind::Config),
                message: Some(format!(
                    "{symbol}: nothing stored yet, run a one-shot sync first"
                )),
            },
            Err(err) => SymbolOutcome {
                symbol: symbol.to_string(),
                records_added: 0,
                final_coverage: None,
                error: Some(ErrorKind::Storage),
                message: Some(format!("{symbol}: unable to read coverage: {err}")),
            },
        }
    }

    /// Returns `false` when cancelled before `duration` elapsed.
    fn wait_unless_cancelled(&self, duration: Duration, cancel: &AtomicBool) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            let step = remaining.min(CANCEL_POLL);
            self.clock.sleep(step);
            remaining -= step;
        }
        !cancel.load(Ordering::SeqCst)
    }
}
