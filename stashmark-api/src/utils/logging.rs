/// Installs the global subscriber: a pretty console layer, plus a daily rolling
/// plain-text file under `log_dir` when given. Filtering follows `RUST_LOG`.
pub fn setup_logging(log_dir: Option<&str>) {
    use std::io;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let mut layers = vec![tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(io::stdout)
        .boxed()];

    if let Some(dir) = log_dir {
        let file_log = tracing_appender::rolling::daily(dir, "stashmark.log");
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_log)
                .boxed(),
        );
    }

    _ = tracing_subscriber::registry()
        .with(layers)
        .with(EnvFilter::from_default_env())
        .try_init();
}

pub fn setup_console_log() {
    setup_logging(None)
}
