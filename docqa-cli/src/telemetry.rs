use tracing_subscriber::{EnvFilter, fmt};

/// Progress from this binary and the library at `info`, everything else at `warn`.
const DEFAULT_DIRECTIVES: &str = "warn,docqa=info,docqa_rag=info";

/// Filter directives for a `-v` count, or `None` to defer to `RUST_LOG`.
fn verbosity_directives(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("debug"),
        2 => Some("docqa=trace,docqa_rag=trace,debug"),
        _ => Some("trace"),
    }
}

/// Install the global fmt subscriber writing to stderr.
///
/// Without `-v`, `RUST_LOG` is used when set and [`DEFAULT_DIRECTIVES`]
/// otherwise, so ingestion progress is visible by default.
pub fn init(verbosity: u8) {
    let filter = match verbosity_directives(verbosity) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
