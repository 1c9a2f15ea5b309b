// CHURCH_TRACE gated diagnostics (stderr only)
//
// CHURCH_TRACE=1 turns on debug events; any other value is taken as a filter
// directive such as `church_bridge=trace`. Without it RUST_LOG applies, and
// the fallback is `warn`.

use tracing_subscriber::EnvFilter;

pub const TRACE_ENV: &str = "CHURCH_TRACE";

const FALLBACK_DIRECTIVE: &str = "warn";

pub fn filter_from(trace: Option<&str>) -> EnvFilter {
    match trace {
        Some("1") => EnvFilter::new("debug"),
        Some(directive) => {
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE)),
    }
}

pub fn init() {
    let filter = filter_from(std::env::var(TRACE_ENV).ok().as_deref());
    // A subscriber may already be installed by an embedding host.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
