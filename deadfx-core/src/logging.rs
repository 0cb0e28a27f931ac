//! Structured logging using **tracing**.
//!
//! Events are emitted as JSON on stderr so stdout stays clean for the
//! report. The verbosity flag only changes the default filter; `RUST_LOG`
//! always wins when set.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    }
}

/// Initializes the global tracing subscriber.
///
/// Call once at process start. A second call is a no-op (the error from
/// `try_init` is swallowed) so tests and embedders can call it freely.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=deadfx_core=debug`)
pub fn init_structured_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
