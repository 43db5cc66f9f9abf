//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use docvault_core::config::ServerConfig;
use docvault_registry::MAX_UPLOAD_BYTES;

use crate::api;
use crate::state::AppState;

/// Request body cap for uploads: the file limit plus room for multipart framing.
/// Files between the two limits are rejected by the registry with a typed error.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 64 * 1024;

pub fn build_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/documents",
            get(api::list_documents)
                .post(api::upload_document)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Static segment wins over `{id}`.
        .route("/documents/history", get(api::list_history))
        .route(
            "/documents/{id}",
            get(api::get_document).delete(api::delete_document),
        )
        .route("/documents/{id}/file", get(api::document_file))
        .layer(cors_layer(&server.cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN '{}'; cross-origin requests disabled", origin);
            CorsLayer::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use docvault_core::config::DatabaseConfig;
    use docvault_registry::{DocumentRegistry, SqliteDocumentRepository};
    use docvault_storage::ObjectBlobStore;

    const BOUNDARY: &str = "docvault-test-boundary";

    async fn test_app() -> Router {
        let repo = SqliteDocumentRepository::connect(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        })
        .await
        .unwrap();
        let registry = DocumentRegistry::new(ObjectBlobStore::in_memory(), repo, "uploads");
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origin: "*".into(),
        };
        build_router(Arc::new(AppState::new(registry)), &server)
    }

    fn multipart_body(document_type: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(kind) = document_type {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document_type\"\r\n\r\n{kind}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document_file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(app: &Router, kind: &str, filename: &str, content: &[u8]) -> Response {
        let body = multipart_body(Some(kind), Some((filename, content)));
        send(app, "POST", "/documents", body).await
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Vec<u8>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if method == "POST" {
            req = req.header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        }
        app.clone()
            .oneshot(req.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, "GET", uri, Vec::new()).await
    }

    async fn json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = test_app().await;
        let resp = get(&app, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn upload_view_delete_flow() {
        let app = test_app().await;

        let resp = upload(&app, "Radio Permit", "permit.pdf", b"%PDF-1.4 permit").await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json(resp).await;
        assert_eq!(created["status"], "created");
        assert_eq!(created["document"]["document_type"], "radio_permit");
        assert_eq!(created["document"]["label"], "Radio Permit");
        let id = created["document"]["id"].as_i64().unwrap();

        let listed = json(get(&app, "/documents").await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let resp = get(&app, &format!("/documents/{id}/file")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"permit.pdf\""
        );
        let content = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(content.as_ref(), b"%PDF-1.4 permit");

        let resp = send(&app, "DELETE", &format!("/documents/{id}"), Vec::new()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, "DELETE", &format!("/documents/{id}"), Vec::new()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["kind"], "not_found");

        let listed = json(get(&app, "/documents").await).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_upload_of_type_is_a_replace() {
        let app = test_app().await;
        upload(&app, "Drivers License", "a.pdf", b"%PDF a").await;

        let resp = upload(&app, "drivers_license", "b.pdf", b"%PDF b").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["status"], "replaced");
        assert_eq!(body["document"]["original_filename"], "b.pdf");
        assert!(body["previous_file_path"].as_str().unwrap().starts_with("uploads/"));

        let history = json(get(&app, "/documents/history").await).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_uploads_map_to_status_codes() {
        let app = test_app().await;

        let resp = upload(&app, "Notes", "notes.txt", b"hello").await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json(resp).await["kind"], "unsupported_file_type");

        let big = vec![b'x'; MAX_UPLOAD_BYTES as usize + 1];
        let resp = upload(&app, "Scan", "scan.pdf", &big).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(resp).await["kind"], "file_too_large");

        let resp = upload(&app, "  ", "a.pdf", b"%PDF").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["kind"], "invalid_input");

        let body = multipart_body(Some("Passport"), None);
        let resp = send(&app, "POST", "/documents", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let listed = json(get(&app, "/documents").await).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_ids_are_invalid_input() {
        let app = test_app().await;

        let resp = get(&app, "/documents/abc").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["kind"], "invalid_input");

        let resp = send(&app, "DELETE", "/documents/0", Vec::new()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = get(&app, "/documents/99").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
