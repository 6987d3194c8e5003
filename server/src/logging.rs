use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Relay spans and upstream failures are
/// `info`/`error`, so production keeps those and drops reqwest's connection
/// chatter; development also shows target rejections at `debug`.
fn default_filter(is_production: bool) -> &'static str {
    if is_production {
        "info,reqwest=warn"
    } else {
        "relay_server=debug,reqwest=info"
    }
}

/// Installs the global subscriber: JSON lines when `is_production`, plain fmt
/// otherwise.
pub fn setup_tracing(is_production: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(is_production)));
    let registry = tracing_subscriber::registry().with(filter);

    match is_production {
        true => registry.with(fmt::layer().json().with_current_span(true)).init(),
        false => registry.with(fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_parse() {
        for is_production in [true, false] {
            assert!(default_filter(is_production)
                .parse::<EnvFilter>()
                .is_ok());
        }
    }
}
