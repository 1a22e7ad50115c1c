//! Application state module

use std::{fmt, sync::Arc};

use crate::{domain::mail::Mailer, infrastructure::storage::AttachmentStore};

/// Application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Maximum size of a request body in bytes
    pub body_limit: usize,
}

/// Application state, shared read-only between requests
#[derive(Clone)]
pub struct AppState<M: Mailer> {
    /// The application configuration
    pub config: AppConfig,

    /// Delivers assembled messages
    pub mailer: Arc<M>,

    /// Temporary storage for uploaded attachments
    pub attachments: Arc<AttachmentStore>,
}

impl<M: Mailer> AppState<M> {
    /// Create a new application state
    pub fn new(config: AppConfig, mailer: M, attachments: AttachmentStore) -> Self {
        Self {
            config,
            mailer: Arc::new(mailer),
            attachments: Arc::new(attachments),
        }
    }
}

impl<M: Mailer> fmt::Debug for AppState<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("mailer", &"Mailer")
            .field("attachments", &self.attachments)
            .finish()
    }
}

#[cfg(test)]
use crate::{domain::mail::tests::MockMailer, infrastructure::http::DEFAULT_BODY_LIMIT};

#[cfg(test)]
pub fn test_state(mailer: Option<MockMailer>, attachments: AttachmentStore) -> AppState<MockMailer> {
    let mailer = mailer.unwrap_or_else(MockMailer::new);

    let config = AppConfig {
        body_limit: DEFAULT_BODY_LIMIT,
    };

    AppState::new(config, mailer, attachments)
}
