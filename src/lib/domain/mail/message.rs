//! Email message

use super::{Attachment, MessageError};

/// Raw form fields describing an email, as received from the client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageFields {
    /// Comma separated primary recipients
    pub to: String,

    /// Comma separated carbon copy recipients
    pub cc: String,

    /// Comma separated blind carbon copy recipients
    pub bcc: String,

    /// The subject line
    pub subject: String,

    /// The message body
    pub body: String,

    /// `"true"` if the body is HTML
    pub is_html: String,
}

/// A validated email, ready to be handed to a [`Mailer`](super::Mailer)
#[derive(Debug)]
pub struct Message {
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: String,
    is_html: bool,
    attachments: Vec<Attachment>,
}

impl Message {
    /// Builds a message from raw form fields and already persisted attachments.
    ///
    /// Recipient lists are normalized with [`normalize_recipients`]. The body is
    /// treated as HTML only when `is_html` is exactly `"true"`. Subject and body
    /// are kept as is.
    ///
    /// # Errors
    /// [`MessageError::NoRecipients`] if `to` is empty after normalization. The
    /// attachments are dropped in that case, which releases their storage.
    pub fn assemble(
        fields: MessageFields,
        attachments: Vec<Attachment>,
    ) -> Result<Self, MessageError> {
        let to = normalize_recipients(&fields.to);

        if to.is_empty() {
            return Err(MessageError::NoRecipients);
        }

        Ok(Self {
            to,
            cc: normalize_recipients(&fields.cc),
            bcc: normalize_recipients(&fields.bcc),
            subject: fields.subject,
            body: fields.body,
            is_html: fields.is_html == "true",
            attachments,
        })
    }

    /// Primary recipients
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Carbon copy recipients, possibly empty
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    /// Blind carbon copy recipients, possibly empty
    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    /// The subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The body, plain text or HTML depending on [`Message::is_html`]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body is HTML
    pub fn is_html(&self) -> bool {
        self.is_html
    }

    /// Attachments in upload order
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Consumes the message, handing back its attachments so their storage can
    /// be released.
    pub fn into_attachments(self) -> Vec<Attachment> {
        self.attachments
    }
}

/// Splits a comma separated recipient list, trimming each entry and dropping
/// empty ones. Order is preserved and duplicates are kept.
pub fn normalize_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
