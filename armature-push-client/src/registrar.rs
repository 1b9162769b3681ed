//! Service worker registration.

use std::sync::Arc;
use tracing::debug;

use crate::logger::Logger;
use crate::platform::{Registration, ServiceWorkerContainer};
use crate::{PushError, PushErrorKind, Result};

/// Registers the push service worker and waits for it to activate.
///
/// Registration is delegated to the platform, which returns the existing
/// registration when the same script is registered again. Callers may invoke
/// [`register`](Self::register) once per operation.
#[derive(Clone)]
pub struct ServiceWorkerRegistrar {
    container: Arc<dyn ServiceWorkerContainer>,
    script_url: String,
    logger: Logger,
}

impl ServiceWorkerRegistrar {
    /// Create a registrar for `script_url`.
    pub fn new(container: Arc<dyn ServiceWorkerContainer>, script_url: impl Into<String>) -> Self {
        Self {
            container,
            script_url: script_url.into(),
            logger: Logger::default(),
        }
    }

    pub(crate) fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// The worker script URL.
    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    /// Register (or look up) the worker.
    pub async fn register(&self) -> Result<Registration> {
        match self.container.register(&self.script_url).await {
            Ok(registration) => {
                debug!(scope = %registration.scope, active = registration.active, "Service worker registered");
                self.logger.info("Service Worker registered");
                Ok(registration)
            }
            Err(e) => {
                self.logger
                    .error(&format!("Service Worker registration failed: {}", e));
                Err(PushError::platform(PushErrorKind::ServiceWorkerFailed, e))
            }
        }
    }

    /// Wait until a registration has an active worker.
    ///
    /// A completed [`register`](Self::register) does not imply activation;
    /// push manager calls must wait for this.
    pub async fn ready(&self) -> Result<Registration> {
        self.container
            .ready()
            .await
            .map_err(|e| PushError::platform(PushErrorKind::ServiceWorkerFailed, e))
    }

    /// Register, then wait for activation.
    pub async fn register_and_wait(&self) -> Result<Registration> {
        self.register().await?;
        self.ready().await
    }
}
