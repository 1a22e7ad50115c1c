//! OpenAPI module

use utoipa::OpenApi;

use crate::infrastructure::http::handlers::send_mail;

/// OpenAPI document for the relay
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Mail Relay",
        description = "A simple API to send emails with optional attachments"
    ),
    paths(send_mail::handler),
    components(schemas(send_mail::SendMailForm)),
    tags((name = "Mail", description = "Email delivery"))
)]
pub struct ApiDocs;
