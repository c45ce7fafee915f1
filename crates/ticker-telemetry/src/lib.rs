//! Prometheus metrics and structured logging for the market-data ticker.
//!
//! - Prometheus counters for asset trust outcomes, metadata cache traffic,
//!   trade persistence and stream events
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
