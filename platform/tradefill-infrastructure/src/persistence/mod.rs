pub mod postgres_trades;
