//! Tracing setup and helpers.

use tokio::task::JoinHandle;
use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Registry, fmt::layer, layer::SubscriberExt,
};

/// Compose the tracing subscriber. `env_filter` is the default directive when
/// RUST_LOG is unset.
pub fn get_subscriber(env_filter: String) -> impl Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env_filter));
    Registry::default().with(env_filter).with(layer())
}

/// Register a subscriber as global default to process span data.
///
/// It should only be called once.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Offload CPU-intensive work (password hashing) to a blocking thread while
/// keeping the current span attached.
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}

/// For logging error chains from a Result without interrupting control flow.
pub fn log_error(e: anyhow::Error) {
    tracing::error!("{:#}", e);
}
