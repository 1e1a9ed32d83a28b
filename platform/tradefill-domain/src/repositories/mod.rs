pub mod trade_source;
pub mod trade_store;
