//! recstore CLI entry point
//!
//! This is a minimal entrypoint that:
//! 1. Installs the tracing subscriber (stderr, `RUST_LOG`, default `warn`)
//! 2. Dispatches to CLI commands (via cli::run)
//! 3. Prints errors to stderr as `CODE: message`
//! 4. Exits with non-zero on failure
//!
//! All logic is delegated to the CLI module.

use recstore::cli;

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    setup_logging();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
