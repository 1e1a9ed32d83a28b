use crate::value_objects::trade::TradeRecord;

/// Sorts by id and keeps the first occurrence of each id.
pub fn normalize_batch(mut records: Vec<TradeRecord>) -> Vec<TradeRecord> {
    records.sort_by_key(|r| r.id);
    records.dedup_by_key(|r| r.id);
    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBreak {
    pub expected: i64,
    pub found: i64,
}

impl std::fmt::Display for IdBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gap detected: expected id {}, found {}",
            self.expected, self.found
        )
    }
}

/// First hole inside a normalized batch, if any.
pub fn first_break(batch: &[TradeRecord]) -> Option<IdBreak> {
    batch.windows(2).find_map(|pair| {
        let expected = pair[0].id + 1;
        (pair[1].id != expected).then_some(IdBreak {
            expected,
            found: pair[1].id,
        })
    })
}

/// Tracks the id the next merged batch must start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdChain {
    next_expected: Option<i64>,
}

impl IdChain {
    /// No stored neighbour yet; the first batch may start anywhere.
    pub fn unanchored() -> Self {
        Self {
            next_expected: None,
        }
    }

    /// The next batch must start right after `last_id`.
    pub fn after(last_id: i64) -> Self {
        Self {
            next_expected: Some(last_id + 1),
        }
    }

    pub fn next_expected(&self) -> Option<i64> {
        self.next_expected
    }

    /// Validates a normalized batch and advances the chain past it. A rejected
    /// batch leaves the chain untouched.
    pub fn accept(&mut self, batch: &[TradeRecord]) -> Result<(), IdBreak> {
        let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
            return Ok(());
        };
        if let Some(expected) = self.next_expected {
            if first.id != expected {
                return Err(IdBreak {
                    expected,
                    found: first.id,
                });
            }
        }
        if let Some(gap) = first_break(batch) {
            return Err(gap);
        }
        self.next_expected = Some(last.id + 1);
        Ok(())
    }
}

/// Checks that a normalized batch is contiguous and ends right below `anchor_id`.
pub fn connects_below(batch: &[TradeRecord], anchor_id: i64) -> Result<(), IdBreak> {
    if let Some(gap) = first_break(batch) {
        return Err(gap);
    }
    match batch.last() {
        Some(last) if last.id + 1 != anchor_id => Err(IdBreak {
            expected: anchor_id - 1,
            found: last.id,
        }),
        _ => Ok(()),
    }
}
