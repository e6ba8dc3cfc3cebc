pub mod extract;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/extract_skills", post(extract::handle_extract_skills))
        .route("/extract_skills/", post(extract::handle_extract_skills))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::extraction::docx::fixtures::docx_bytes;
    use crate::pipeline::document::fixtures::pipeline;
    use crate::pipeline::BatchOrchestrator;

    const BOUNDARY: &str = "extract-test-boundary";

    fn app(max_upload_bytes: usize) -> Router {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.max_upload_bytes = max_upload_bytes;
        build_router(AppState {
            orchestrator: Arc::new(BatchOrchestrator::new(Arc::new(pipeline()))),
            config,
        })
    }

    fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, filename, content) in parts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(1024)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "extract-api");
    }

    #[tokio::test]
    async fn test_extract_skills_returns_batch_result() {
        let resume = docx_bytes(&["Email: jane@x.io", "Python, Docker and AWS"], &[]);
        let body = multipart_body(&[
            ("files", "resume.docx", resume.as_slice()),
            ("files", "notes.txt", &b"Python"[..]),
        ]);

        let response = app(10 * 1024 * 1024)
            .oneshot(upload("/extract_skills", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["results"][0]["filename"], "resume.docx");
        assert_eq!(json["results"][0]["personal_info"]["Email"], "jane@x.io");
        assert_eq!(json["results"][1]["filename"], "notes.txt");
        assert_eq!(json["skills"], serde_json::json!(["AWS", "Docker", "Python"]));
        assert_eq!(json["processing_stats"]["total_files"], 2);
        assert_eq!(json["processing_stats"]["successful_files"], 1);
    }

    #[tokio::test]
    async fn test_trailing_slash_route() {
        let body = multipart_body(&[("files", "a.txt", &b"nothing"[..])]);
        let response = app(1024 * 1024)
            .oneshot(upload("/extract_skills/", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_files_is_a_validation_error() {
        let body = multipart_body(&[("other", "a.pdf", &b"%PDF"[..])]);
        let response = app(1024 * 1024)
            .oneshot(upload("/extract_skills", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let big = vec![b'x'; 4096];
        let body = multipart_body(&[("files", "big.pdf", big.as_slice())]);
        let response = app(1024)
            .oneshot(upload("/extract_skills", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
