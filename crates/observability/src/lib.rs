//! Tracing subscriber setup shared by the binaries.

/// Log output shape, chosen with `LOG_FORMAT`.
pub mod format;

pub use format::LogFormat;

/// Filter used when `RUST_LOG` is unset: service logs at info, sqlx query chatter muted.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initialize process-wide tracing.
///
/// Output format comes from `LOG_FORMAT` (`json` by default), filtering from
/// `RUST_LOG`. Safe to call multiple times; later calls are no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .map(|raw| LogFormat::parse(&raw))
        .unwrap_or_default();
    init_with(format);
}

pub fn init_with(format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    tracing::debug!(?format, "tracing initialized");
}
