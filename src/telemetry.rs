use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

static INIT: OnceLock<()> = OnceLock::new();

/// Install a global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; a subscriber installed elsewhere is left alone.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_span_events(FmtSpan::CLOSE))
            .with(env_filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("tracing initialised");
    }
}
