//! Mail domain errors

use thiserror::Error;

/// Errors raised while assembling a [`Message`](super::Message)
#[derive(Debug, Error)]
pub enum MessageError {
    /// No recipient remained after normalizing the `to` field
    #[error("at least one recipient is required")]
    NoRecipients,
}

/// Errors raised by the attachment store
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Temporary storage could not be written
    #[error("failed to store attachment \"{filename}\": {source}")]
    Io {
        /// The client-supplied file name
        filename: String,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Mailer errors
#[derive(Debug, Error)]
pub enum MailerError {
    /// A recipient is not a valid mailbox
    #[error("invalid email address \"{0}\"")]
    InvalidAddress(String),

    /// The configured sender is not a valid mailbox
    #[error("invalid sender address \"{0}\"")]
    InvalidSender(String),

    /// An attachment could not be read back for sending
    #[error("failed to read attachment \"{filename}\": {source}")]
    Attachment {
        /// The client-supplied file name
        filename: String,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The transport failed to deliver the email
    #[error("failed to send email: {0}")]
    SendError(anyhow::Error),
}

impl From<anyhow::Error> for MailerError {
    fn from(err: anyhow::Error) -> Self {
        MailerError::SendError(err)
    }
}
