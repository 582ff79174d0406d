//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its query or JSON body, calls into the shared index
//! or study assistant, and returns a JSON response.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use studystage_chat::{
    DocumentDigitizer, IngestReport, PlainTextDigitizer, Quiz, QuizLevel, StudyAnswer, StudyPlan,
};
use studystage_vector::{DocumentSummary, InsertOutcome, SearchHit};

use crate::error::ApiError;
use crate::state::AppState;

/// Characters of document text shown in listings.
const PREVIEW_CHARS: usize = 100;
const DEFAULT_KEYWORDS: usize = 5;
const DEFAULT_UPLOAD_NAME: &str = "upload";

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub text: String,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    #[serde(default)]
    pub level: QuizLevel,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub goal: String,
    pub days: u32,
    pub hours: u32,
    #[serde(default)]
    pub use_documents: bool,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub text: String,
    pub top_k: Option<usize>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub documents: usize,
    pub dimensions: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        documents: state.index.len(),
        dimensions: state.index.dimensions(),
    }))
}

/// GET /documents - stored documents in upload order.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let documents = state.index.documents(PREVIEW_CHARS)?;
    let total = documents.len();
    Ok(Json(DocumentsResponse { documents, total }))
}

/// POST /documents - index raw text.
pub async fn add_document(
    State(state): State<AppState>,
    Json(body): Json<AddDocumentRequest>,
) -> Result<Json<InsertOutcome>, ApiError> {
    let filename = body.filename.as_deref().filter(|f| !f.trim().is_empty());
    let outcome = state.assistant.ingest_text(&body.text, filename).await?;
    Ok(Json(outcome))
}

fn is_plain_text(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".md")
}

/// POST /documents/upload?filename= - digitize a raw file body, then index it.
///
/// `.txt` and `.md` files are read as UTF-8 directly; everything else goes
/// through the configured document parser.
pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<IngestReport>, ApiError> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

    let digitizer: &dyn DocumentDigitizer = if is_plain_text(&filename) {
        &PlainTextDigitizer
    } else {
        state.digitizer.as_ref()
    };

    tracing::info!(filename = %filename, bytes = body.len(), "Upload received");
    let report = state
        .assistant
        .ingest_file(&filename, body.to_vec(), digitizer)
        .await?;
    Ok(Json(report))
}

/// GET /search?q=&top_k= - ranked passages for a query.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params
        .q
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter 'q'".to_string()))?;
    let top_k = params
        .top_k
        .unwrap_or(state.config.retrieval.default_top_k);

    let results = state.index.search(&query, top_k).await?;
    let total = results.len();
    Ok(Json(SearchResponse {
        query,
        results,
        total,
    }))
}

/// POST /ask - answer a question from the indexed documents.
pub async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<StudyAnswer>, ApiError> {
    let answer = state.assistant.answer(&body.question, body.top_k).await?;
    Ok(Json(answer))
}

/// POST /quiz
pub async fn quiz(
    State(state): State<AppState>,
    Json(body): Json<QuizRequest>,
) -> Result<Json<Quiz>, ApiError> {
    let quiz = state.assistant.quiz(&body.topic, body.level).await?;
    Ok(Json(quiz))
}

/// POST /plan
pub async fn plan(
    State(state): State<AppState>,
    Json(body): Json<PlanRequest>,
) -> Result<Json<StudyPlan>, ApiError> {
    let plan = state
        .assistant
        .plan(&body.goal, body.days, body.hours, body.use_documents)
        .await?;
    Ok(Json(plan))
}

/// POST /keywords
pub async fn keywords(
    State(state): State<AppState>,
    Json(body): Json<KeywordsRequest>,
) -> Result<Json<KeywordsResponse>, ApiError> {
    let top_k = body.top_k.unwrap_or(DEFAULT_KEYWORDS);
    let keywords = state.assistant.keywords(&body.text, top_k).await?;
    Ok(Json(KeywordsResponse { keywords }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plain_text() {
        assert!(is_plain_text("notes.txt"));
        assert!(is_plain_text("README.MD"));
        assert!(!is_plain_text("lecture.pdf"));
        assert!(!is_plain_text("upload"));
    }

    #[test]
    fn test_plan_request_defaults() {
        let req: PlanRequest =
            serde_json::from_str(r#"{"goal":"exam","days":3,"hours":2}"#).unwrap();
        assert!(!req.use_documents);

        let req: QuizRequest = serde_json::from_str(r#"{"topic":"cells"}"#).unwrap();
        assert_eq!(req.level, QuizLevel::Medium);
    }
}
