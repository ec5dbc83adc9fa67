use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_FORMAT_ENV: &str = "RUSTACCIO_AZURE_LOG_FORMAT";
const CRATE_TARGET: &str = "rustaccio_azure_ad";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }

    fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|value| Self::parse(&value))
            .unwrap_or(Self::Pretty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingSettings {
    pub filter: String,
    pub log_format: LogFormat,
}

pub fn default_filter(default_level: &str) -> String {
    format!("{CRATE_TARGET}={default_level},reqwest=warn")
}

/// Installs the global subscriber once. `RUST_LOG` wins over `default_level`.
pub fn init_from_env(default_level: &str) -> TracingSettings {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_filter(default_level));
    let log_format = LogFormat::from_env();

    let env_filter = EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| EnvFilter::new(default_filter("info")));

    TRACING_INIT.get_or_init(|| {
        // Exactly one of the three layers is Some.
        let json = (log_format == LogFormat::Json).then(|| {
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_span_events(FmtSpan::CLOSE)
        });
        let compact = (log_format == LogFormat::Compact).then(|| {
            fmt::layer()
                .compact()
                .with_target(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
        });
        let pretty = (log_format == LogFormat::Pretty).then(|| {
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
        });

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_error::ErrorLayer::default())
            .with(json)
            .with(compact)
            .with(pretty)
            .try_init();
    });

    TracingSettings { filter, log_format }
}
