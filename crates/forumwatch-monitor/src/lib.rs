//! The monitoring pipeline: reconciliation, polling cycles, historical scans
//! and runtime administration of keywords and sources.

mod admin;
mod cycle;
pub mod error;
mod monitor;
mod report;
mod runner;
mod scan;

pub use admin::{ManagedKeyword, ManagedSource};
pub use error::MonitorError;
pub use monitor::Monitor;
pub use report::CycleReport;
