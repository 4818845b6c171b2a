use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const APP_TARGET: &str = "budgetflow";

/// Installs the global subscriber. Logs go to stderr so `metrics` JSON on stdout stays parseable.
///
/// Without `RUST_LOG` the filter is `warn`, plus debug output for this crate when
/// `verbose` is set. A `RUST_LOG` value replaces that default entirely.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();
    let registry = tracing_subscriber::registry().with(env_filter);
    if verbose {
        registry.with(layer.pretty()).init();
    } else {
        registry.with(layer.compact()).init();
    }
}

fn default_directives(verbose: bool) -> String {
    if verbose {
        format!("warn,{APP_TARGET}=debug")
    } else {
        "warn".to_string()
    }
}
