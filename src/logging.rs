use tracing::Level;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Registry};

pub fn level_from_name(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Installs the stderr subscriber. The crate's own level comes from
/// `LOG_LEVEL`; dependencies stay at `warn`.
pub fn init() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let level = level_from_name(&log_level);

    let filter = filter::Targets::new()
        .with_target("sqlx::query", Level::WARN)
        .with_target(env!("CARGO_CRATE_NAME"), level)
        .with_default(Level::WARN);

    let tracing_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    Registry::default().with(tracing_layer).with(filter).init();
}
