pub mod config;
pub mod executor;
pub mod fetcher;
pub mod inspection;
pub mod merge_writer;
pub mod scheduler;
pub mod selection;
