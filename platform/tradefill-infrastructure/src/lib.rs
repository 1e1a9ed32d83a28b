pub mod artifacts;
pub mod persistence;
pub mod remote;
