//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Finalizer and HTTP layers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is set on every request and echoed back
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
