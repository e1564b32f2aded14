use env_logger;
use log;

/// Info by default, `RUST_LOG` takes precedence when set.
pub fn setup_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
