use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Log directives used when `RUST_LOG` is unset
pub fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "info,mongodb=warn,hyper=warn,tower_http=info"
    } else {
        "debug,domain_products=trace,mongodb=info,hyper=info,h2=info,tower=info"
    }
}

/// Install the color-eyre report hook: error locations on, environment dump off.
/// Repeated calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Install the global subscriber.
///
/// Production writes flattened JSON lines without targets; development writes
/// pretty multi-line events with targets. Both carry an `ErrorLayer` so eyre
/// reports include span traces. `RUST_LOG` replaces [`default_directives`].
/// Does nothing when a subscriber is already installed.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(?environment, "tracing initialized"),
        Err(_) => debug!("tracing already initialized"),
    }
}
