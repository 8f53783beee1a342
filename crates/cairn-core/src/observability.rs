//! Observability infrastructure for Cairn.
//!
//! Structured logging with consistent spans. The collector emits all of its
//! diagnostics through `tracing`; whatever subscriber the embedding process
//! installs receives them. Nothing here is required for correctness, and no
//! process-wide logger is assumed: [`init_logging`] is a convenience for
//! binaries, while library consumers may install any subscriber they like.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at process startup. Safe to call multiple times; subsequent
/// calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: controls log levels (e.g. `info`, `cairn_gc=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for collection operations with standard fields.
///
/// # Example
///
/// ```rust
/// use cairn_core::observability::gc_span;
///
/// let span = gc_span("collect");
/// let _guard = span.enter();
/// // ... do collection work
/// ```
#[must_use]
pub fn gc_span(operation: &str) -> Span {
    tracing::info_span!("gc", op = operation)
}
