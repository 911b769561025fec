pub mod classify;
pub mod config;
pub mod grid;
pub mod merge;
pub mod pool;
pub mod report;
pub mod types;
