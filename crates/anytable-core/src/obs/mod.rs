//! Module: obs
//! Responsibility: planner and adapter instrumentation.
//! Does not own: log output, which goes through `tracing` at the call site.

pub mod metrics;
pub mod sink;

pub use metrics::{EventOps, EventState, TableCounters};
pub use sink::{MetricsEvent, MetricsSink, MutationKind, metrics_report, metrics_reset, with_metrics_sink};
