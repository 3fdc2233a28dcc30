use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Call once, at startup.
///
/// `RUST_LOG` wins over `default_level`; an unparsable level falls back to `info`.
pub fn setup_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .init();
}
