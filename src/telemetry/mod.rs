//! Structured logging setup.
//!
//! The runner logs through `tracing`; this module wires a `tracing-subscriber`
//! env-filter + fmt layer. There is no OTLP exporter — just process-local
//! structured logs, configurable via `RUST_LOG`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub enable_console_logging: bool,
    pub log_level: Level,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "altwalker".to_string(),
            enable_console_logging: true,
            log_level: Level::INFO,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("ALTWALKER_SERVICE_NAME") {
            config.service_name = name;
        }
        config
    }
}

/// Installs the global tracing subscriber. Must be called once, before any
/// `tracing` macro is used.
pub fn init_telemetry(config: TelemetryConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.enable_console_logging {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        subscriber.init();
    }

    tracing::info!(service_name = %config.service_name, "telemetry initialized");
    Ok(())
}

/// No background exporter to flush; kept as a symmetrical shutdown hook so
/// `main` doesn't need to know that.
pub fn shutdown_telemetry() {
    tracing::info!("telemetry shut down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_info_level() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "altwalker");
        assert!(config.enable_console_logging);
        assert_eq!(config.log_level, Level::INFO);
    }
}
