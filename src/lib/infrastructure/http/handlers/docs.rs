//! API documentation.

use axum::response::Html;

/// Stoplight API documentation.
pub async fn handler() -> Html<&'static str> {
    Html(
        r#"
<html lang="en">
<head>
    <title>Mail Relay API</title>
    <script src="https://unpkg.com/@stoplight/elements/web-components.min.js"></script>
    <link rel="stylesheet" href="https://unpkg.com/@stoplight/elements/styles.min.css">
</head>
<body>
    <main role="main">
        <elements-api apiDescriptionUrl="/swagger/openapi.json" router="hash" />
    </main>
</body>
</html>
"#,
    )
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use testresult::TestResult;

    use crate::infrastructure::{
        http::{router, state::test_state},
        storage::{AttachmentConfig, AttachmentStore},
    };

    #[tokio::test]
    async fn test_docs_handler() -> TestResult {
        let state = test_state(None, AttachmentStore::new(AttachmentConfig::default()));

        let response = TestServer::new(router(state))?.get("/swagger").await;

        response.assert_status_ok();

        let raw_text = response.text();

        assert!(raw_text.contains("Mail Relay API"));
        assert!(raw_text.contains("/swagger/openapi.json"));

        Ok(())
    }

    #[tokio::test]
    async fn test_openapi_document() -> TestResult {
        let state = test_state(None, AttachmentStore::new(AttachmentConfig::default()));

        let response = TestServer::new(router(state))?
            .get("/swagger/openapi.json")
            .await;

        response.assert_status_ok();

        let raw_text = response.text();

        assert!(raw_text.contains("\"send_mail\""));
        assert!(raw_text.contains("multipart/form-data"));

        Ok(())
    }
}
