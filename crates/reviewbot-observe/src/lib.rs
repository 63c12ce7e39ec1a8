//! Observability setup for the review bot: structured logging via `tracing`
//! with optional OpenTelemetry span export.

pub mod tracing_setup;
