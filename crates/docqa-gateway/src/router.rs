use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    ask_handler, ask_text_handler, delete_document_handler, health_handler,
    list_documents_handler, root_handler, upload_handler,
};
use super::server::AppState;

pub(crate) fn build_router(state: AppState, cors_origins: &[String], max_body_size: usize) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    // Trailing-slash forms are kept for clients of the original endpoints.
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/upload/", post(upload_handler))
        .route("/ask", post(ask_handler))
        .route("/ask/", post(ask_handler))
        .route("/ask/text", post(ask_text_handler))
        .route("/documents", get(list_documents_handler))
        .route("/documents/{id}", delete(delete_document_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use docqa_core::{Config, DocQa, SharedModels};
    use docqa_llm::mock::{MockEmbedder, MockExtractor};
    use docqa_llm::{AnyEmbedder, AnyExtractor};
    use docqa_memory::DocumentStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    const DOC: &str = "The cat sat on the mat. The dog ran in the park.";
    const BOUNDARY: &str = "docqa-test-boundary";

    struct Harness {
        app: Router,
        qa: DocQa,
        uploads: tempfile::TempDir,
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.storage.sqlite_path = ":memory:".into();
        config.retrieval.chunk_size = 30;
        config.retrieval.chunk_overlap = 10;
        config
    }

    async fn harness_with(qa: DocQa, max_body_size: usize) -> Harness {
        let uploads = tempfile::tempdir().unwrap();
        let state = AppState {
            qa: qa.clone(),
            upload_dir: uploads.path().join("uploads"),
            ask_timeout: Duration::from_secs(30),
            started_at: Instant::now(),
        };
        let app = build_router(state, &qa.config().gateway.cors_origins, max_body_size);
        Harness {
            app,
            qa,
            uploads,
        }
    }

    async fn harness() -> Harness {
        harness_with(DocQa::open(test_config()).await.unwrap(), 1_048_576).await
    }

    fn multipart(filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-length", body.len())
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_says_hello() {
        let h = harness().await;
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await["message"], "Hello World");
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let h = harness().await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn upload_then_ask() {
        let h = harness().await;
        let resp = h
            .app
            .clone()
            .oneshot(multipart("pets.txt", DOC.as_bytes()))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let uploaded = json_body(resp).await;
        assert_eq!(uploaded["filename"], "pets.txt");
        let id = uploaded["id"].as_i64().unwrap();

        let req = Request::builder()
            .method("POST")
            .uri(format!(
                "/ask?document_id={id}&question=Where%20did%20the%20dog%20run%3F"
            ))
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["question"], "Where did the dog run?");
        assert!(json["answer"].as_str().unwrap().contains("park"));
    }

    #[tokio::test]
    async fn upload_keeps_raw_file() {
        let h = harness().await;
        let uploads = h.uploads.path().join("uploads");
        let resp = h.app.oneshot(multipart("notes.md", b"# Notes")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let saved: Vec<_> = std::fs::read_dir(&uploads).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().ends_with(".md"));
    }

    #[tokio::test]
    async fn rejected_upload_is_not_kept() {
        let mut config = test_config();
        config.storage.max_file_size = 8;
        let h = harness_with(DocQa::open(config).await.unwrap(), 1_048_576).await;
        let uploads = h.uploads.path().join("uploads");

        let resp = h.app.oneshot(multipart("pets.txt", DOC.as_bytes())).await.unwrap();
        assert_eq!(resp.status(), 413);
        assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 0);
        assert!(h.qa.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_other_types() {
        let h = harness().await;
        let resp = h.app.oneshot(multipart("photo.png", &[0, 1, 2])).await.unwrap();
        assert_eq!(resp.status(), 400);
        let json = json_body(resp).await;
        assert_eq!(json["status"], 400);
        assert!(json["detail"].as_str().unwrap().starts_with("File must be a PDF"));
    }

    #[tokio::test]
    async fn upload_without_file_field() {
        let h = harness().await;
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn ask_unknown_document_is_404() {
        let h = harness().await;
        let req = Request::builder()
            .method("POST")
            .uri("/ask/?document_id=999&question=Why%3F")
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = json_body(resp).await;
        assert_eq!(json["status"], 404);
        assert_eq!(json["detail"], "Document not found");
    }

    #[tokio::test]
    async fn ask_missing_question_is_400() {
        let h = harness().await;
        let req = Request::builder()
            .method("POST")
            .uri("/ask?document_id=1")
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(json_body(resp).await["status"], 400);
    }

    #[tokio::test]
    async fn ask_empty_document_is_400() {
        let h = harness().await;
        let id = h.qa.ingest_text("empty.txt", "").await.unwrap();
        let req = Request::builder()
            .method("POST")
            .uri(format!("/ask?document_id={id}&question=What%3F"))
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn ask_text_json() {
        let h = harness().await;
        let body = serde_json::json!({
            "text": DOC,
            "question": "Where did the dog run?",
            "k": 1
        });
        let req = Request::builder()
            .method("POST")
            .uri("/ask/text")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(json_body(resp).await["answer"].as_str().unwrap().contains("park"));
    }

    #[tokio::test]
    async fn unanswerable_question_is_500() {
        let h = harness().await;
        let body = serde_json::json!({ "text": DOC, "question": "Who wrote Hamlet?" });
        let req = Request::builder()
            .method("POST")
            .uri("/ask/text")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn list_and_delete_documents() {
        let h = harness().await;
        let id = h.qa.ingest_text("pets.txt", DOC).await.unwrap();

        let req = Request::builder().uri("/documents").body(Body::empty()).unwrap();
        let resp = h.app.clone().oneshot(req).await.unwrap();
        let json = json_body(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["filename"], "pets.txt");

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/documents/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let resp = h.app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = h.app.oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let h = harness().await;
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origin() {
        let h = harness().await;
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://evil.test")
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn body_size_limit() {
        let qa = DocQa::open(test_config()).await.unwrap();
        let h = harness_with(qa, 64).await;
        let resp = h.app.oneshot(multipart("big.txt", &[b'a'; 256])).await.unwrap();
        assert_eq!(resp.status(), 413);
    }

    #[tokio::test]
    async fn slow_ask_times_out() {
        let embedder = MockEmbedder::new(4);
        let models = Arc::new(SharedModels::preloaded(
            AnyEmbedder::Mock(embedder),
            AnyExtractor::Mock(MockExtractor::answering("park")),
        ));
        let qa = DocQa::new(test_config(), DocumentStore::new(":memory:").await.unwrap(), models);
        let id = qa.ingest_text("pets.txt", DOC).await.unwrap();

        let uploads = tempfile::tempdir().unwrap();
        let state = AppState {
            qa,
            upload_dir: uploads.path().to_path_buf(),
            ask_timeout: Duration::ZERO,
            started_at: Instant::now(),
        };
        let app = build_router(state, &[], 1_048_576);
        let req = Request::builder()
            .method("POST")
            .uri(format!("/ask?document_id={id}&question=Where%3F"))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
