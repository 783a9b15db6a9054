use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with file and console logging.
///
/// Two layers: console (stdout) at INFO and above for development, a daily
/// rolling file under ./logs at DEBUG and above for monitoring.
///
/// Must return the WorkerGuard to keep the non-blocking file writer alive;
/// drop it in main() so buffered logs flush on shutdown.
pub fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("./logs", "campus_backend.log");

    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Tracing initialized (console=INFO+, file=DEBUG+)");

    guard
}
