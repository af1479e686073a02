//! Telemetry and observability for boomtown services.
//!
//! Everything here is explicitly constructed and process-scoped: the daemon
//! builds one [`metrics::MetricsCollector`], wraps it in a
//! [`recorder::Recorder`], and hands that to call-sites. There is no hidden
//! global state and no lazy initialization.
//!
//! Recording is in-memory and infallible. Callers never block on, and never
//! fail because of, the telemetry path; export to an external transport is
//! someone else's job.

pub mod logging;
pub mod metrics;
pub mod recorder;
