//! Logging and tracing setup shared by the agent identity binaries.
//!
//! Everything is driven by the usual environment variables (`RUST_LOG`,
//! `LOG_FORMAT`, `ENABLE_OTEL`, `OTEL_EXPORTER_OTLP_*`, `OTEL_SERVICE_NAME`).

use anyhow::Result;

pub mod config;
mod tracing_init;

pub use config::{LogFormat, OtlpConfig, TelemetryConfig, TelemetryProtocol};
pub use tracing_init::{TelemetryGuard, init_tracing};

/// Installs the subscriber configured from the environment.
pub fn install(service_name: &str, service_version: &str) -> Result<TelemetryGuard> {
    init_tracing(&TelemetryConfig::from_env(service_name, service_version))
}
