#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;
use tradefill_application::executor::SyncSettings;
use tradefill_application::fetcher::{FetchSettings, RetryPolicy};
use tradefill_domain::repositories::trade_source::{RemoteError, TradeSource};
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::clock::Clock;
use tradefill_domain::value_objects::coverage::Coverage;
use tradefill_domain::value_objects::interval::Interval;
use tradefill_domain::value_objects::trade::{Side, TradeRecord};

/// Contiguous ids starting at `first_id`, two records per second from `start_ts`.
pub fn series(first_id: i64, count: i64, start_ts: i64) -> Vec<TradeRecord> {
    (0..count)
        .map(|i| TradeRecord {
            id: first_id + i,
            timestamp: start_ts + i / 2,
            price: 100.0 + (i % 7) as f64,
            amount: 0.5,
            side: if i % 2 == 0 { Side::Buy } else { Side::Sell },
        })
        .collect()
}

pub fn test_settings() -> SyncSettings {
    SyncSettings {
        fetch: FetchSettings {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(4),
            },
            request_delay: Duration::ZERO,
        },
        backfill_chunk_seconds: 50,
        max_chunk_pages: 64,
        quiet_chunks: 3,
        verify_after_sync: false,
    }
}

pub struct FakeRemote {
    pub series: RefCell<BTreeMap<String, Vec<TradeRecord>>>,
    pub page_size: usize,
    pub missing_ids: RefCell<BTreeSet<i64>>,
    pub scripted_errors: RefCell<VecDeque<RemoteError>>,
    /// Every call after this many fails as unavailable.
    pub fail_after_calls: Cell<Option<usize>>,
    pub calls: RefCell<Vec<(String, i64, i64)>>,
}

impl FakeRemote {
    pub fn new(page_size: usize) -> Self {
        Self {
            series: RefCell::new(BTreeMap::new()),
            page_size,
            missing_ids: RefCell::new(BTreeSet::new()),
            scripted_errors: RefCell::new(VecDeque::new()),
            fail_after_calls: Cell::new(None),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(self, symbol: &str, records: Vec<TradeRecord>) -> Self {
        self.series.borrow_mut().insert(symbol.to_string(), records);
        self
    }

    pub fn push_records(&self, symbol: &str, records: Vec<TradeRecord>) {
        self.series
            .borrow_mut()
            .entry(symbol.to_string())
            .or_default()
            .extend(records);
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl TradeSource for FakeRemote {
    fn list_tradable_symbols(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.series.borrow().keys().cloned().collect())
    }

    fn fetch_page(
        &self,
        symbol: &str,
        from_ts: i64,
        to_ts: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, RemoteError> {
        self.calls
            .borrow_mut()
            .push((symbol.to_string(), from_ts, to_ts));
        let call_number = self.calls.borrow().len();
        if let Some(err) = self.scripted_errors.borrow_mut().pop_front() {
            return Err(err);
        }
        if self
            .fail_after_calls
            .get()
            .is_some_and(|limit| call_number > limit)
        {
            return Err(RemoteError::Unavailable("503 service unavailable".to_string()));
        }

        let series = self.series.borrow();
        let Some(records) = series.get(symbol) else {
            return Err(RemoteError::Rejected(format!("unknown symbol {symbol}")));
        };
        let missing = self.missing_ids.borrow();
        Ok(records
            .iter()
            .filter(|r| r.timestamp >= from_ts && r.timestamp < to_ts)
            .filter(|r| !missing.contains(&r.id))
            .take(limit)
            .cloned()
            .collect())
    }

    fn max_page_size(&self) -> usize {
        self.page_size
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub series: RefCell<BTreeMap<String, BTreeMap<i64, TradeRecord>>>,
    /// Added to every count, simulating duplicate rows.
    pub phantom_rows: Cell<u64>,
}

impl FakeStore {
    pub fn seeded(symbol: &str, records: Vec<TradeRecord>) -> Self {
        let store = Self::default();
        store.seed(symbol, records);
        store
    }

    pub fn seed(&self, symbol: &str, records: Vec<TradeRecord>) {
        let mut series = self.series.borrow_mut();
        let entry = series.entry(symbol.to_string()).or_default();
        for record in records {
            entry.insert(record.id, record);
        }
    }

    pub fn ids(&self, symbol: &str) -> Vec<i64> {
        self.series
            .borrow()
            .get(symbol)
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn records(&self, symbol: &str) -> Vec<TradeRecord> {
        self.series
            .borrow()
            .get(symbol)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl TradeStore for FakeStore {
    fn coverage(&self, symbol: &str) -> Result<Option<Coverage>, String> {
        let series = self.series.borrow();
        let Some(records) = series.get(symbol) else {
            return Ok(None);
        };
        match (records.values().next(), records.values().next_back()) {
            (Some(oldest), Some(newest)) => Ok(Some(Coverage {
                oldest_ts: oldest.timestamp,
                oldest_id: oldest.id,
                newest_ts: newest.timestamp,
                newest_id: newest.id,
            })),
            _ => Ok(None),
        }
    }

    fn insert_if_absent(&self, symbol: &str, records: &[TradeRecord]) -> Result<u64, String> {
        let mut series = self.series.borrow_mut();
        let entry = series.entry(symbol.to_string()).or_default();
        let mut added = 0;
        for record in records {
            if !entry.contains_key(&record.id) {
                entry.insert(record.id, record.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    fn drop_symbol(&self, symbol: &str) -> Result<(), String> {
        self.series.borrow_mut().remove(symbol);
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, String> {
        Ok(self
            .series
            .borrow()
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect())
    }

    fn count(&self, symbol: &str) -> Result<u64, String> {
        let stored = self
            .series
            .borrow()
            .get(symbol)
            .map(|records| records.len() as u64)
            .unwrap_or(0);
        Ok(stored + self.phantom_rows.get())
    }

    fn load_range(&self, symbol: &str, interval: &Interval) -> Result<Vec<TradeRecord>, String> {
        Ok(self
            .records(symbol)
            .into_iter()
            .filter(|r| interval.contains(r.timestamp))
            .collect())
    }
}

pub struct ManualClock {
    pub now: Cell<i64>,
    pub sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn at(now: i64) -> Self {
        Self {
            now: Cell::new(now),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now_ts(&self) -> i64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

pub fn assert_contiguous(ids: &[i64]) {
    for pair in ids.windows(2) {
        assert_eq!(pair[1], pair[0] + 1, "hole between {} and {}", pair[0], pair[1]);
    }
}
