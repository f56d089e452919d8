//! Diagnostic tracing setup.
//!
//! Spans and events are always emitted through `tracing`; they only become visible when a fmt
//! subscriber is installed, which happens with `ARCHY_TRACING_FMT=1` or `--verbose`. Output goes
//! to stderr so the JSON outcome on stdout stays machine-readable.

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter used when RUST_LOG is unset: quiet by default, `info` for archy when verbose.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,archy=info"
    } else {
        "warn"
    }
}

pub fn tracing_fmt_requested(verbose: bool) -> bool {
    verbose || env::var("ARCHY_TRACING_FMT").ok().as_deref() == Some("1")
}

/// Install the stderr fmt subscriber once. Returns false when not requested or already set.
pub fn telemetry_init(verbose: bool) -> bool {
    if INIT.get().is_some() || !tracing_fmt_requested(verbose) {
        return false;
    }

    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_filter(verbose).to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("archy: tracing init skipped (global subscriber already set)");
        return false;
    }
    let _ = INIT.set(());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "warn");
        assert!(default_filter(true).contains("archy=info"));
    }

    #[test]
    fn test_verbose_requests_fmt() {
        assert!(tracing_fmt_requested(true));
    }
}
