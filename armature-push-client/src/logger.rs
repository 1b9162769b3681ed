//! Logging sink for push client diagnostics.

use std::fmt;
use std::sync::Arc;

/// Severity passed to a [`PushLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Progress information (retries, auto-subscribe).
    Info,
    /// A failure that was handled or swallowed.
    Error,
}

/// Application-provided log sink.
///
/// Closures `Fn(&str, LogLevel)` implement this trait directly.
pub trait PushLogger: Send + Sync {
    /// Record a message.
    fn log(&self, message: &str, level: LogLevel);
}

impl<F> PushLogger for F
where
    F: Fn(&str, LogLevel) + Send + Sync,
{
    fn log(&self, message: &str, level: LogLevel) {
        self(message, level)
    }
}

/// Forwards messages to `tracing` and to the configured sink, if any.
#[derive(Clone, Default)]
pub(crate) struct Logger {
    sink: Option<Arc<dyn PushLogger>>,
}

impl Logger {
    pub(crate) fn new(sink: Option<Arc<dyn PushLogger>>) -> Self {
        Self { sink }
    }

    pub(crate) fn info(&self, message: &str) {
        tracing::info!(target: "armature_push_client", "{}", message);
        if let Some(sink) = &self.sink {
            sink.log(message, LogLevel::Info);
        }
    }

    pub(crate) fn error(&self, message: &str) {
        tracing::error!(target: "armature_push_client", "{}", message);
        if let Some(sink) = &self.sink {
            sink.log(message, LogLevel::Error);
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_closure_sink_receives_levels() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let logger = Logger::new(Some(Arc::new(move |msg: &str, level: LogLevel| {
            captured.lock().push((msg.to_string(), level));
        })));

        logger.info("retrying");
        logger.error("failed");

        assert_eq!(
            *seen.lock(),
            vec![
                ("retrying".to_string(), LogLevel::Info),
                ("failed".to_string(), LogLevel::Error),
            ]
        );
    }

    #[test]
    fn test_no_sink() {
        Logger::default().info("nothing to forward");
    }
}
