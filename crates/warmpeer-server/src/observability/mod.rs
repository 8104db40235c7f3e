//! Observability Module
//!
//! - `tracing`: subscriber setup (text or JSON, `RUST_LOG` filtering)
//! - `metrics`: Prometheus metrics for discovery cycles and connection attempts
//! - `events`: structured events with consistent field names

pub mod events;
pub mod metrics;
pub mod tracing;

pub use self::metrics::{init_metrics, MetricsState};
pub use self::tracing::{init_tracing, TracingConfig};
