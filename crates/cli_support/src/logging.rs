/// Initialize `env_logger`, honoring `RUST_LOG` and defaulting to `info`.
pub fn init() {
    init_with_default("info");
}

pub fn init_with_default(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
