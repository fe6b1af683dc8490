/// Initializes env_logger with an info default; `RUST_LOG` overrides.
/// Safe to call more than once (later calls are no-ops).
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
