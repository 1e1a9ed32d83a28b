pub mod bound;
pub mod candle;
pub mod coverage;
pub mod interval;
pub mod selector;
pub mod timeframe;
pub mod trade;
pub mod window;
