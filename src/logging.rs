use std::fs;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "race_finder.log";

fn default_directive() -> Option<Directive> {
    "race_finder=info".parse().ok()
}

/// Initializes the logging system with both console and file output.
///
/// `RUST_LOG` extends the default `race_finder=info` filter. Console output
/// goes to stderr so that search results on stdout stay machine readable.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    // Daily rotated JSON file
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let mut filter = EnvFilter::from_default_env();
    if let Some(directive) = default_directive() {
        filter = filter.add_directive(directive);
    }

    // A second call (tests, embedding) keeps the subscriber already installed
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the writer alive so buffered lines are flushed until exit
    std::mem::forget(guard);
}
