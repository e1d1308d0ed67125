use std::path::Path;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use docqa_core::AskOutcome;
use docqa_memory::DocumentId;
use docqa_memory::document::{extension_of, supported_extensions};

use super::error::ApiError;
use super::server::AppState;

const UNSUPPORTED_FILE: &str = "File must be a PDF or text file";

#[derive(serde::Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct UploadResponse {
    pub id: DocumentId,
    pub filename: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct AskParams {
    pub document_id: i64,
    pub question: String,
    pub k: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct AskTextRequest {
    pub text: String,
    pub question: String,
    pub k: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct AskResponse {
    pub question: String,
    pub answer: String,
}

pub(crate) async fn root_handler() -> impl IntoResponse {
    Json(RootResponse {
        message: "Hello World",
    })
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Store the `file` field under `upload_dir/<uuid>.<ext>`, then extract and persist its text.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Status(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("file field has no filename".into()))?;
        let ext = extension_of(Path::new(&filename));
        if !supported_extensions().contains(&ext.as_str()) {
            return Err(ApiError::BadRequest(UNSUPPORTED_FILE.into()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Status(e.status(), e.body_text()))?;

        tokio::fs::create_dir_all(&state.upload_dir).await?;
        let stored = state
            .upload_dir
            .join(format!("{}.{ext}", uuid::Uuid::new_v4()));
        tokio::fs::write(&stored, &bytes).await?;
        tracing::debug!(path = %stored.display(), bytes = bytes.len(), "upload saved");

        let id = match state.qa.ingest_file(&stored, &filename).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&stored).await {
                    tracing::warn!(path = %stored.display(), "failed to remove rejected upload: {rm}");
                }
                return Err(e.into());
            }
        };
        return Ok(Json(UploadResponse { id, filename }));
    }

    Err(ApiError::BadRequest("missing multipart field \"file\"".into()))
}

pub(crate) async fn ask_handler(
    State(state): State<AppState>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = with_timeout(
        &state,
        state
            .qa
            .ask_document(DocumentId(params.document_id), &params.question, params.k),
    )
    .await?;
    Ok(Json(AskResponse {
        question: params.question,
        answer: outcome.answer,
    }))
}

pub(crate) async fn ask_text_handler(
    State(state): State<AppState>,
    body: Result<Json<AskTextRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = with_timeout(&state, state.qa.ask_text(&req.text, &req.question, req.k)).await?;
    Ok(Json(AskResponse {
        question: req.question,
        answer: outcome.answer,
    }))
}

pub(crate) async fn list_documents_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.qa.list_documents().await?))
}

pub(crate) async fn delete_document_handler(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.qa.delete_document(DocumentId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn with_timeout(
    state: &AppState,
    ask: impl Future<Output = docqa_core::Result<AskOutcome>>,
) -> Result<AskOutcome, ApiError> {
    match tokio::time::timeout(state.ask_timeout, ask).await {
        Ok(outcome) => Ok(outcome?),
        Err(_) => Err(ApiError::Timeout(state.ask_timeout.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn ask_text_request_k_optional() {
        let req: AskTextRequest =
            serde_json::from_str(r#"{"text":"a b","question":"b?"}"#).unwrap();
        assert_eq!(req.question, "b?");
        assert!(req.k.is_none());
    }

    #[test]
    fn upload_response_id_is_number() {
        let json = serde_json::to_string(&UploadResponse {
            id: DocumentId(3),
            filename: "a.txt".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"id":3,"filename":"a.txt"}"#);
    }
}
