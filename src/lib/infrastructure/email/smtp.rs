//! SMTP email service implementation

use std::fmt;

use anyhow::anyhow;
use async_trait::async_trait;
use clap::{ArgAction, Parser};
use lettre::{
    message::{header::ContentType, Attachment as EmailAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message as Email, Tokio1Executor,
};
use tracing::{debug, info};

use crate::domain::mail::{Mailer, MailerError, Message};

const OCTET_STREAM: &str = "application/octet-stream";

/// SMTP configuration
#[derive(Clone, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long = "smtp-host", env = "SMTP_HOST")]
    pub host: String,

    /// The SMTP port
    #[clap(long = "smtp-port", env = "SMTP_PORT")]
    pub port: u16,

    /// The sender email address
    #[clap(long = "smtp-from", env = "SMTP_FROM")]
    pub from: String,

    /// The SMTP username
    #[clap(long = "smtp-username", env = "SMTP_USERNAME")]
    pub username: String,

    /// The SMTP password
    #[clap(long = "smtp-password", env = "SMTP_PASSWORD")]
    pub password: String,

    /// Upgrade the connection with STARTTLS instead of connecting over TLS
    #[clap(
        long = "smtp-starttls",
        env = "SMTP_STARTTLS",
        default_value = "true",
        action = ArgAction::Set
    )]
    pub starttls: bool,

    /// Verify the TLS certificate
    #[clap(
        long = "smtp-verify-tls",
        env = "SMTP_VERIFY_TLS",
        default_value = "true",
        action = ArgAction::Set
    )]
    pub verify_tls: bool,
}

impl fmt::Debug for SMTPConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SMTPConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("username", &self.username)
            .field("password", &"********")
            .field("starttls", &self.starttls)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// SMTP mailer
#[derive(Debug, Clone)]
pub struct SMTPMailer {
    config: SMTPConfig,
}

impl SMTPMailer {
    /// Create a new SMTP mailer
    pub fn new(config: SMTPConfig) -> Self {
        Self { config }
    }

    /// Build the transport for the configured relay
    pub fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let tls_parameters = TlsParameters::builder(self.config.host.clone())
            .dangerous_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .map_err(|e| MailerError::SendError(e.into()))?;

        let relay = if self.config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map(|relay| relay.tls(Tls::Opportunistic(tls_parameters)))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
                .map(|relay| relay.tls(Tls::Wrapper(tls_parameters)))
        }
        .map_err(|e| MailerError::SendError(e.into()))?;

        Ok(relay.credentials(creds).port(self.config.port).build())
    }

    /// Build the wire message for `message`.
    ///
    /// `Cc` and `Bcc` are only set when the message has such recipients.
    /// Attachments follow the body in upload order.
    pub async fn build_email(&self, message: &Message) -> Result<Email, MailerError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|_| MailerError::InvalidSender(self.config.from.clone()))?;

        let mut builder = Email::builder().from(from).subject(message.subject());

        for to in message.to() {
            builder = builder.to(parse_mailbox(to)?);
        }

        for cc in message.cc() {
            builder = builder.cc(parse_mailbox(cc)?);
        }

        for bcc in message.bcc() {
            builder = builder.bcc(parse_mailbox(bcc)?);
        }

        let body_type = if message.is_html() {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let email = if message.attachments().is_empty() {
            builder
                .header(body_type)
                .body(message.body().to_string())
        } else {
            let mut parts = MultiPart::mixed().singlepart(
                SinglePart::builder()
                    .header(body_type)
                    .body(message.body().to_string()),
            );

            for attachment in message.attachments() {
                let content =
                    attachment
                        .content()
                        .await
                        .map_err(|source| MailerError::Attachment {
                            filename: attachment.filename().to_string(),
                            source,
                        })?;

                let content_type = ContentType::parse(attachment.content_type())
                    .or_else(|_| ContentType::parse(OCTET_STREAM))
                    .map_err(|e| MailerError::SendError(anyhow!(e)))?;

                parts = parts.singlepart(
                    EmailAttachment::new(attachment.filename().to_string())
                        .body(content.into_owned(), content_type),
                );
            }

            builder.multipart(parts)
        };

        email.map_err(|e| MailerError::SendError(e.into()))
    }
}

#[async_trait]
impl Mailer for SMTPMailer {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        let email = self.build_email(message).await?;

        debug!(
            "sending email to {} recipient(s) via {}:{}",
            email.envelope().to().len(),
            self.config.host,
            self.config.port
        );

        match self.transport()?.send(email).await {
            Ok(response) => {
                info!("email accepted by relay: {}", response.code());
                Ok(())
            }
            Err(e) => Err(MailerError::SendError(e.into())),
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address
        .parse()
        .map_err(|_| MailerError::InvalidAddress(address.to_string()))
}

#[cfg(test)]
mod tests {
    use lettre::message::header::{Bcc, Cc};
    use testresult::TestResult;

    use crate::domain::mail::{Attachment, MessageFields};

    use super::*;

    fn config() -> SMTPConfig {
        SMTPConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            from: "sender@example.com".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            starttls: false,
            verify_tls: true,
        }
    }

    fn assemble(fields: MessageFields, attachments: Vec<Attachment>) -> Message {
        Message::assemble(fields, attachments).expect("valid message")
    }

    fn formatted(email: &Email) -> String {
        String::from_utf8_lossy(&email.formatted()).into_owned()
    }

    #[tokio::test]
    async fn test_build_email_omits_empty_cc_and_bcc() -> TestResult {
        let mailer = SMTPMailer::new(config());
        let message = assemble(
            MessageFields {
                to: "a@x.com".to_string(),
                subject: "Hi".to_string(),
                body: "Hello".to_string(),
                ..Default::default()
            },
            vec![],
        );

        let email = mailer.build_email(&message).await?;

        assert!(email.headers().get::<Cc>().is_none());
        assert!(email.headers().get::<Bcc>().is_none());

        let raw = formatted(&email);
        assert!(!raw.contains("\r\nCc:"));
        assert!(!raw.contains("\r\nBcc:"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("Subject: Hi"));
        assert!(raw.contains("From: sender@example.com"));

        Ok(())
    }

    #[tokio::test]
    async fn test_build_email_sets_cc_and_bcc_recipients() -> TestResult {
        let mailer = SMTPMailer::new(config());
        let message = assemble(
            MessageFields {
                to: "a@x.com".to_string(),
                cc: "c@x.com".to_string(),
                bcc: "b@x.com".to_string(),
                is_html: "true".to_string(),
                body: "<p>Hello</p>".to_string(),
                ..Default::default()
            },
            vec![],
        );

        let email = mailer.build_email(&message).await?;

        assert!(email.headers().get::<Cc>().is_some());

        let recipients: Vec<String> = email
            .envelope()
            .to()
            .iter()
            .map(|address| address.to_string())
            .collect();
        assert_eq!(recipients.len(), 3);
        for expected in ["a@x.com", "c@x.com", "b@x.com"] {
            assert!(recipients.iter().any(|r| r == expected), "{expected} missing");
        }

        assert!(formatted(&email).contains("Cc: c@x.com"));
        assert!(formatted(&email).contains("Content-Type: text/html"));

        Ok(())
    }

    #[tokio::test]
    async fn test_build_email_attaches_files_in_order() -> TestResult {
        let mailer = SMTPMailer::new(config());
        let message = assemble(
            MessageFields {
                to: "a@x.com".to_string(),
                body: "see attached".to_string(),
                ..Default::default()
            },
            vec![
                Attachment::in_memory("first.txt", "text/plain", b"one".to_vec()),
                Attachment::in_memory("second.bin", "not a mime type", b"two".to_vec()),
            ],
        );

        let raw = formatted(&mailer.build_email(&message).await?);

        assert!(raw.contains("multipart/mixed"));

        let first = raw.find("first.txt").ok_or("first.txt missing")?;
        let second = raw.find("second.bin").ok_or("second.bin missing")?;
        assert!(first < second);
        assert!(raw.contains("application/octet-stream"));

        Ok(())
    }

    #[tokio::test]
    async fn test_build_email_rejects_invalid_address() {
        let mailer = SMTPMailer::new(config());
        let message = assemble(
            MessageFields {
                to: "not an address".to_string(),
                ..Default::default()
            },
            vec![],
        );

        let result = mailer.build_email(&message).await;

        assert!(
            matches!(result, Err(MailerError::InvalidAddress(address)) if address == "not an address")
        );
    }

    #[tokio::test]
    async fn test_build_email_rejects_invalid_sender() {
        let mailer = SMTPMailer::new(SMTPConfig {
            from: "not a sender".to_string(),
            ..config()
        });
        let message = assemble(
            MessageFields {
                to: "a@x.com".to_string(),
                ..Default::default()
            },
            vec![],
        );

        let result = mailer.build_email(&message).await;

        assert!(
            matches!(result, Err(MailerError::InvalidSender(address)) if address == "not a sender")
        );
    }

    #[tokio::test]
    async fn test_send_reports_connection_failure() {
        let mailer = SMTPMailer::new(config());
        let message = assemble(
            MessageFields {
                to: "a@x.com".to_string(),
                ..Default::default()
            },
            vec![],
        );

        let result = mailer.send(&message).await;

        assert!(matches!(result, Err(MailerError::SendError(_))));
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", config());

        assert!(!debug.contains("secret"));
        assert!(debug.contains("********"));
    }
}
