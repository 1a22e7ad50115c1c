//! Mail domain: messages, attachments and the mailer abstraction.

mod attachments;
mod errors;
mod mailer;
mod message;

pub use attachments::{Attachment, AttachmentSource, StoredFile};
pub use errors::{AttachmentError, MailerError, MessageError};
pub use mailer::Mailer;
pub use message::{normalize_recipients, Message, MessageFields};

#[cfg(test)]
pub mod tests {
    pub use super::mailer::MockMailer;
}
