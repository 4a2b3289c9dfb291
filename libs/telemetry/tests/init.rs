use aid_telemetry::{TelemetryConfig, init_tracing};

fn local_only() -> TelemetryConfig {
    TelemetryConfig::from_lookup("agent-identity-test", "0.0.0", |_| None)
}

#[test]
fn installs_without_an_exporter() {
    let guard = init_tracing(&local_only()).unwrap();
    assert!(!guard.exporting());
    tracing::info!(target: "aid_telemetry::tests", "subscriber installed");
}

#[test]
fn installing_twice_keeps_the_first_subscriber() {
    let first = init_tracing(&local_only()).unwrap();
    let second = init_tracing(&local_only().with_default_filter("debug")).unwrap();
    assert!(!first.exporting());
    assert!(!second.exporting());
}

#[test]
fn exporter_guard_flushes_on_drop() {
    let cfg = TelemetryConfig::from_lookup("agent-identity-test", "0.0.0", |key| match key {
        "ENABLE_OTEL" => Some("true".into()),
        "OTEL_EXPORTER_OTLP_ENDPOINT" => Some("http://127.0.0.1:4318/v1/traces".into()),
        _ => None,
    });
    let guard = init_tracing(&cfg).unwrap();
    assert!(guard.exporting());
    drop(guard);
}
