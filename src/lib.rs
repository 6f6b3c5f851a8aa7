//! iostorm - threaded IO load generator
//!
//! iostorm drives a configurable number of worker threads against files or raw
//! block devices, running four benchmark phases (sequential write, random write,
//! sequential read, random read) with a fixed block size, and reports throughput,
//! CPU utilization and per-operation latency.
//!
//! # Architecture
//!
//! - **Placement strategies**: sequential and random offset generation
//! - **IO engines**: descriptor-based (pread/pwrite) and memory-mapped
//! - **Generic driver**: one code path for all four phases
//! - **Coordinator**: barrier-synchronized workers, aggregated phase totals
//! - **Reports**: table, terse and JSON output

pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod output;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Coordinator;
pub use error::BenchError;

/// Result type used by the run-time engine
pub type Result<T> = std::result::Result<T, BenchError>;
