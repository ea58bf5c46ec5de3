use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber: `RUST_LOG` if set, else `default_directive`.
///
/// Returns `false` when a subscriber was already installed, so calling this
/// from every test is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`] but writes through the test harness capture.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
