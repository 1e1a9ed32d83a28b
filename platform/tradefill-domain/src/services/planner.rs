//! Range reconciliation: turns a requested interval and the stored coverage of
//! a symbol into the fetch windows needed to satisfy it.
//!
//! Windows never leave a hole between fetched and stored data. A request that
//! starts after the stored newest record is pulled back to it; a request that
//! ends before the stored oldest record is pushed forward to it.

use crate::errors::SyncError;
use crate::value_objects::bound::Bound;
use crate::value_objects::coverage::Coverage;
use crate::value_objects::interval::Interval;
use crate::value_objects::window::FetchWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRequest {
    pub from: Bound,
    pub to: Bound,
    /// Drop the stored series before planning.
    pub full_overwrite: bool,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            from: Bound::Unbounded,
            to: Bound::Unbounded,
            full_overwrite: false,
        }
    }
}

impl PlanRequest {
    pub fn between(from: Bound, to: Bound) -> Self {
        Self {
            from,
            to,
            full_overwrite: false,
        }
    }

    /// `[newest, now)`: the request issued by every tick of a repeating run.
    pub fn forward_tick() -> Self {
        Self::between(Bound::Newest, Bound::Unbounded)
    }

    pub fn with_overwrite(mut self, full_overwrite: bool) -> Self {
        self.full_overwrite = full_overwrite;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub symbol: String,
    /// The request after sentinel and default resolution.
    pub requested: Interval,
    pub drop_first: bool,
    /// Backward windows precede forward windows.
    pub windows: Vec<FetchWindow>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Plans the windows for one symbol. `coverage` must be the snapshot taken
/// before any mutation; `now` resolves an unbounded upper bound.
pub fn plan_windows(
    symbol: &str,
    request: &PlanRequest,
    coverage: Option<&Coverage>,
    now: i64,
) -> Result<SyncPlan, SyncError> {
    let from_ts = request.from.resolve(coverage, 0)?;
    let to_ts = request.to.resolve(coverage, now)?;
    let requested = Interval::new(from_ts, to_ts);

    let coverage = if request.full_overwrite {
        None
    } else {
        coverage
    };

    let mut plan = SyncPlan {
        symbol: symbol.to_string(),
        requested,
        drop_first: request.full_overwrite,
        windows: Vec::new(),
    };

    if requested.is_empty() {
        return Ok(plan);
    }

    let Some(stored) = coverage else {
        plan.windows.push(FetchWindow::full(symbol, requested));
        return Ok(plan);
    };
    if stored.interval().covers(&requested) {
        return Ok(plan);
    }

    if from_ts < stored.oldest_ts {
        let backward = Interval::new(from_ts, stored.oldest_ts);
        if !backward.is_empty() {
            plan.windows
                .push(FetchWindow::backward(symbol, backward, stored.oldest_id));
        }
    }

    if to_ts > stored.newest_ts {
        let forward = Interval::new(stored.newest_ts, to_ts);
        if !forward.is_empty() {
            plan.windows
                .push(FetchWindow::forward(symbol, forward, stored.newest_id));
        }
    }

    Ok(plan)
}
