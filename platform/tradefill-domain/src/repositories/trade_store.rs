use crate::value_objects::coverage::Coverage;
use crate::value_objects::interval::Interval;
use crate::value_objects::trade::TradeRecord;

/// Local persistence of trade series, partitioned by symbol.
pub trait TradeStore {
    /// Oldest and newest record by id; `None` when the symbol has no records.
    fn coverage(&self, symbol: &str) -> Result<Option<Coverage>, String>;

    /// Inserts records whose id is not yet stored and returns how many were new.
    fn insert_if_absent(&self, symbol: &str, records: &[TradeRecord]) -> Result<u64, String>;

    fn drop_symbol(&self, symbol: &str) -> Result<(), String>;

    fn list_symbols(&self) -> Result<Vec<String>, String>;

    fn count(&self, symbol: &str) -> Result<u64, String>;

    /// Records with `interval.from_ts <= timestamp < interval.to_ts`, ascending by id.
    fn load_range(&self, symbol: &str, interval: &Interval) -> Result<Vec<TradeRecord>, String>;
}
