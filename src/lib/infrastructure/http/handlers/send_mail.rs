//! Send mail handler

use axum::{extract::State, http::StatusCode};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    domain::mail::{Mailer, Message},
    infrastructure::http::{errors::ApiError, state::AppState},
};

mod form;

pub use form::MailForm;

/// Send mail request body, only used to document the form
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct SendMailForm {
    /// Recipient(s), comma separated
    #[schema(example = "alice@example.com, bob@example.com")]
    pub to: String,

    /// CC recipient(s), comma separated
    #[schema(example = "carol@example.com")]
    pub cc: Option<String>,

    /// BCC recipient(s), comma separated
    pub bcc: Option<String>,

    /// Email subject
    #[schema(example = "Monthly report")]
    pub subject: String,

    /// Email body
    #[schema(example = "Please find the report attached.")]
    pub body: String,

    /// Set to "true" if body is HTML
    #[schema(example = "true")]
    pub is_html: Option<String>,

    /// Attachments (can upload multiple), each at most 25 MiB
    #[schema(value_type = Option<Vec<String>>, format = Binary)]
    pub attachments: Option<Vec<Vec<u8>>>,
}

/// Send an email
#[utoipa::path(
    post,
    operation_id = "send_mail",
    tag = "Mail",
    path = "/",
    request_body(content = SendMailForm, content_type = "multipart/form-data"),
    responses(
        (status = StatusCode::OK, description = "Email sent"),
        (status = StatusCode::BAD_REQUEST, description = "Malformed form, oversized attachment or invalid recipients", body = String, content_type = "text/plain"),
        (status = StatusCode::PAYLOAD_TOO_LARGE, description = "Request body too large", body = String, content_type = "text/plain"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Attachment storage or SMTP failure", body = String, content_type = "text/plain"),
    )
)]
pub async fn handler<M: Mailer>(
    State(state): State<AppState<M>>,
    form: MailForm,
) -> Result<StatusCode, ApiError> {
    let MailForm {
        fields,
        attachments,
    } = form;

    let message = Message::assemble(fields, attachments)?;

    let result = state.mailer.send(&message).await;
    let recipients = message.to().len() + message.cc().len() + message.bcc().len();

    state
        .attachments
        .release_all(message.into_attachments())
        .await;

    match result {
        Ok(()) => {
            info!("email sent to {} recipient(s)", recipients);

            Ok(StatusCode::OK)
        }
        Err(e) => {
            error!("failed to send email: {}", e);

            Err(e.into())
        }
    }
}
