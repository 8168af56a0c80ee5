use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter: `LOG_LEVEL` for our crates, quieter dependencies.
pub fn default_filter() -> EnvFilter {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "scholaris={level},scholaris_observability={level},tower_http=warn,hyper=warn,tonic=warn,h2=warn,sqlx=warn",
            level = log_level
        ))
    })
}

/// Console-only logging, used when observability is disabled.
pub fn init_basic_console_logging() {
    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(default_filter());

    // A subscriber may already be set (tests, embedding)
    let _ = tracing_subscriber::registry().with(console_layer).try_init();

    eprintln!("Observability disabled: console logging only");
}
