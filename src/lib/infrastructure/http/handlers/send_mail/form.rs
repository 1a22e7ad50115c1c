//! Extraction of the mail form and its attachments

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{multipart::Field, FromRequest, Multipart, Request},
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    Form,
};
use tracing::debug;

use crate::{
    domain::mail::{Attachment, Mailer, MessageFields},
    infrastructure::{
        http::{errors::ApiError, state::AppState},
        storage::AttachmentStore,
    },
};

const ATTACHMENTS_FIELD: &str = "attachments";

const OCTET_STREAM: &str = "application/octet-stream";

/// The raw fields of a send request along with its persisted attachments.
///
/// Attachments already persisted are released when the value is dropped, so a
/// request that fails halfway through extraction leaves nothing behind.
#[derive(Debug, Default)]
pub struct MailForm {
    /// Text fields, empty when absent
    pub fields: MessageFields,

    /// Persisted uploads in the order they were received
    pub attachments: Vec<Attachment>,
}

#[async_trait]
impl<M: Mailer> FromRequest<AppState<M>> for MailForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState<M>) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await?;

            read_multipart(multipart, &state.attachments).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(values) = Form::<HashMap<String, String>>::from_request(req, state).await?;

            Ok(Self {
                fields: fields_from_map(values),
                attachments: Vec::new(),
            })
        } else {
            debug!("request without a form body: \"{}\"", content_type);

            Ok(Self::default())
        }
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    store: &AttachmentStore,
) -> Result<MailForm, ApiError> {
    let mut form = MailForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == ATTACHMENTS_FIELD && field.file_name().is_some() {
            let attachment = read_attachment(field, store).await?;
            form.attachments.push(attachment);
            continue;
        }

        let target = match name.as_str() {
            "to" => &mut form.fields.to,
            "cc" => &mut form.fields.cc,
            "bcc" => &mut form.fields.bcc,
            "subject" => &mut form.fields.subject,
            "body" => &mut form.fields.body,
            "is_html" => &mut form.fields.is_html,
            _ => {
                debug!("ignoring unknown form field \"{}\"", name);
                continue;
            }
        };

        *target = field.text().await?;
    }

    Ok(form)
}

/// Streams one uploaded file into the store.
///
/// A part that declares a length over the ceiling is refused before anything
/// is stored. Otherwise each chunk is checked before it is written, and an
/// oversized upload drops its writer, which removes what was already stored.
async fn read_attachment(
    mut field: Field<'_>,
    store: &AttachmentStore,
) -> Result<Attachment, ApiError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or(OCTET_STREAM).to_string();
    let max_size = store.max_size() as u64;

    let declared = field
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    if declared.is_some_and(|size| size > max_size) {
        return Err(too_large(&filename, max_size));
    }

    let mut writer = store.create(&filename, &content_type).await?;

    while let Some(chunk) = field.chunk().await? {
        if writer.size() + chunk.len() as u64 > max_size {
            return Err(too_large(&filename, max_size));
        }

        writer.write(&chunk).await?;
    }

    Ok(writer.finish().await?)
}

fn too_large(filename: &str, max_size: u64) -> ApiError {
    ApiError::new_400(&format!(
        "attachment \"{}\" must be at most {} bytes",
        filename, max_size
    ))
}

fn fields_from_map(mut values: HashMap<String, String>) -> MessageFields {
    let mut take = |name: &str| values.remove(name).unwrap_or_default();

    MessageFields {
        to: take("to"),
        cc: take("cc"),
        bcc: take("bcc"),
        subject: take("subject"),
        body: take("body"),
        is_html: take("is_html"),
    }
}
