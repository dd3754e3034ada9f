use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. `default_level` is used when
/// `RUST_LOG` is unset; it should come from `Config.monitoring.log_level`.
pub fn init(default_level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
