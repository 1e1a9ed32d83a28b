use std::time::Instant;
use tradefill_domain::errors::SyncError;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::merge::normalize_batch;
use tradefill_domain::value_objects::trade::TradeRecord;

/// Inserts batches into the store, skipping ids that are already present.
pub struct MergeWriter<'a, T: ?Sized> {
    store: &'a T,
}

impl<'a, T: TradeStore + ?Sized> MergeWriter<'a, T> {
    pub fn new(store: &'a T) -> Self {
        Self { store }
    }

    /// Returns the number of records that were not stored before.
    pub fn merge(&self, symbol: &str, records: Vec<TradeRecord>) -> Result<u64, SyncError> {
        let batch = normalize_batch(records);
        if batch.is_empty() {
            return Ok(0);
        }
        let started = Instant::now();
        let added = self
            .store
            .insert_if_absent(symbol, &batch)
            .map_err(|err| SyncError::Storage(format!("{symbol}: merge failed: {err}")))?;

        metrics::counter!("tradefill.app.merge.batches_total").increment(1);
        metrics::counter!("tradefill.app.merge.records_added_total").increment(added);
        metrics::histogram!("tradefill.app.merge.batch_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            symbol = %symbol,
            received = batch.len(),
            added,
            first_id = batch[0].id,
            last_id = batch[batch.len() - 1].id,
            "batch merged"
        );
        Ok(added)
    }
}
