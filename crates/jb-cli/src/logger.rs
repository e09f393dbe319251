//! Log output for the CLI
//!
//! The engine logs through the `log` facade; `tracing-subscriber` bridges
//! those records and writes them to stderr. `RUST_LOG` overrides `-v`.

use tracing_subscriber::EnvFilter;

/// Filter directive for a number of `-v` flags.
pub fn directive_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init(verbosity: u8) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive_for(verbosity)));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Logging disabled: {e}");
    }
}
