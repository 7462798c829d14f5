//! Tracing subscriber setup shared by both binaries.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Where console log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    Stderr,
    /// File logging only
    Off,
}

impl Console {
    /// Console target for a binary that draws its own screen on stdout.
    ///
    /// With a log directory configured nothing is written to the terminal;
    /// otherwise diagnostics go to stderr so they can be redirected.
    pub fn for_display(config: &LoggingConfig) -> Self {
        if config.dir.is_some() {
            Console::Off
        } else {
            Console::Stderr
        }
    }

    fn writer(self) -> Option<BoxMakeWriter> {
        match self {
            Console::Stdout => Some(BoxMakeWriter::new(std::io::stdout)),
            Console::Stderr => Some(BoxMakeWriter::new(std::io::stderr)),
            Console::Off => None,
        }
    }
}

/// Install the global subscriber.
///
/// Console lines go to `console`, filtered by `RUST_LOG` (default `info`).
/// When `config.dir` is set logs are also written to a daily-rolling file
/// there; keep the returned guard alive until exit so buffered lines are
/// flushed.
pub fn init(config: &LoggingConfig, console: Console) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = console
        .writer()
        .map(|writer| fmt::layer().with_writer(writer));

    let (file_layer, guard) = match config.dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_binary_never_logs_to_stdout() {
        let mut config = LoggingConfig::default();
        assert_eq!(Console::for_display(&config), Console::Stderr);

        config.dir = Some("./logs".to_string());
        assert_eq!(Console::for_display(&config), Console::Off);
    }

    #[test]
    fn test_console_off_has_no_writer() {
        assert!(Console::Off.writer().is_none());
        assert!(Console::Stderr.writer().is_some());
    }
}
