//! Mailer abstraction

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use super::{MailerError, Message};

/// Delivers assembled messages
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Send an email
    ///
    /// # Arguments
    /// * `message` - The [`Message`] to deliver.
    ///
    /// # Returns
    /// A [`Result`] indicating success or failure. Failures are never retried.
    async fn send(&self, message: &Message) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        async fn send(&self, message: &Message) -> Result<(), MailerError>;
    }
}
