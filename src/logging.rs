use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "STOCK_OUTLIERS_LOG";

static INIT: Once = Once::new();

/// Installs the global subscriber. Levels come from `STOCK_OUTLIERS_LOG`
/// (e.g. `stock_outliers=debug`), falling back to `stock_outliers=info`.
/// Later calls are no-ops.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose {
            "stock_outliers=debug"
        } else {
            "stock_outliers=info"
        };
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    });
}
