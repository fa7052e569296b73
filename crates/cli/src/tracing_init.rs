use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Layer;

/// Installs the stderr subscriber.
///
/// Level: `ENFORCER_LOG` env var (`error`..`trace`) > `-q` / `-v` flags > `warn`.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let from_env = std::env::var("ENFORCER_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok());
    let level = from_env.unwrap_or(match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    });

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_filter(level);

    tracing_subscriber::registry().with(layer).init()
}
