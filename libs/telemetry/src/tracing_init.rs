use std::io;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, OtlpConfig, TelemetryConfig, TelemetryProtocol};

/// Flushes and shuts down the span exporter when dropped. Hold it for the
/// life of the process.
#[must_use = "dropping the guard shuts the exporter down immediately"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush spans: {err}");
            }
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for command output. A second call keeps the first subscriber.
pub fn init_tracing(cfg: &TelemetryConfig) -> Result<TelemetryGuard> {
    let fmt_layer = match cfg.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(io::stderr)
            .boxed(),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.default_filter))
        .with_context(|| format!("invalid log filter '{}'", cfg.default_filter))?;

    let Some(otlp) = &cfg.otlp else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
        return Ok(TelemetryGuard { provider: None });
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(build_resource(cfg))
        .with_batch_exporter(build_span_exporter(otlp)?)
        .build();
    let tracer = provider.tracer(cfg.service_name.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()
        .ok();
    tracing::debug!(endpoint = %otlp.endpoint, protocol = ?otlp.protocol, "span exporter installed");

    Ok(TelemetryGuard {
        provider: Some(provider),
    })
}

fn build_span_exporter(otlp: &OtlpConfig) -> Result<SpanExporter> {
    let exporter = match otlp.protocol {
        TelemetryProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp.endpoint.clone())
            .build(),
        TelemetryProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_endpoint(otlp.endpoint.clone())
            .build(),
    };
    exporter.with_context(|| format!("failed to build OTLP exporter for {}", otlp.endpoint))
}

fn build_resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ])
        .build()
}
