use std::sync::Once;

static TRACING_INIT: Once = Once::new();

pub const DEFAULT_LOG_DIRECTIVE: &str = "campaign_ledger=info";

/// Installs the global fmt subscriber once.
///
/// `RUST_LOG` wins over `directive`, which wins over [`DEFAULT_LOG_DIRECTIVE`].
/// A subscriber installed elsewhere is left in place.
pub fn init_tracing(directive: Option<&str>) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directive.unwrap_or(DEFAULT_LOG_DIRECTIVE)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

        if fmt().with_env_filter(filter).try_init().is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}
