pub mod candles;
pub mod clock;
pub mod consistency;
pub mod merge;
pub mod planner;
