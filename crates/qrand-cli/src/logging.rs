use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "QRAND_LOG";

/// Install the stderr subscriber. Stdout stays reserved for results.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
