//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so stdout stays parseable. `RUST_LOG` overrides the
//! default filter.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool, json: bool) {
    let default = if verbose { "subtopic=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // try_init: a second call (e.g. from tests) is a no-op.
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.with_target(false).try_init();
    }
}
