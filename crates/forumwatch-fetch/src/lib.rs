//! Shared, paced and retrying HTTP gate for every outbound source request.

pub mod error;
pub mod gate;

mod retry;

pub use error::FetchError;
pub use gate::{FetchGate, GateConfig};
