//! HTTP API server for integration with other systems.
//!
//! Exposes the filter, search, lookup and ask operations as JSON endpoints.

use crate::assistant::{AskRequest, Assistant, QueryOutcome, QuestionMatch};
use crate::catalog::{Answer, FilterOptions, Question, QuestionFilter, UserFilter};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SvarError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    assistant: Assistant,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let assistant = Assistant::new(settings)?;
    let app = router(assistant);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Svar API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Filters", "GET  /filters");
    Output::kv("Questions", "POST /questions");
    Output::kv("Search", "POST /search");
    Output::kv("Users", "POST /users");
    Output::kv("Answers", "POST /answers");
    Output::kv("Ask", "POST /ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(assistant: Assistant) -> Router {
    let state = Arc::new(AppState { assistant });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/filters", get(filters))
        .route("/questions", post(questions))
        .route("/search", post(search))
        .route("/users", post(users))
        .route("/answers", post(answers))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(flatten)]
    questions: QuestionFilter,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<QuestionMatch>,
}

#[derive(Serialize)]
struct QuestionsResponse {
    questions: Vec<Question>,
}

#[derive(Serialize)]
struct UsersResponse {
    user_ids: Vec<String>,
}

#[derive(Deserialize)]
struct AnswersRequest {
    question_ids: Vec<String>,
    user_ids: Vec<String>,
}

#[derive(Serialize)]
struct AnswersResponse {
    answers: Vec<Answer>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A library error rendered as a JSON `{error}` body.
struct ApiError(SvarError);

impl From<SvarError> for ApiError {
    fn from(e: SvarError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SvarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SvarError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SvarError::ModelUnavailable(_) | SvarError::OpenAI(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn filters(State(state): State<Arc<AppState>>) -> ApiResult<FilterOptions> {
    Ok(Json(state.assistant.filter_options()?))
}

async fn questions(
    State(state): State<Arc<AppState>>,
    Json(filter): Json<QuestionFilter>,
) -> ApiResult<QuestionsResponse> {
    let questions = state.assistant.filter_questions(&filter)?;
    Ok(Json(QuestionsResponse { questions }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    if req.query.trim().is_empty() {
        return Err(SvarError::InvalidInput("Query must not be empty".to_string()).into());
    }
    let results = state
        .assistant
        .search_questions(&req.query, &req.questions)
        .await?;
    Ok(Json(SearchResponse { results }))
}

async fn users(
    State(state): State<Arc<AppState>>,
    Json(filter): Json<UserFilter>,
) -> ApiResult<UsersResponse> {
    let user_ids = state.assistant.resolve_user_ids(&filter)?;
    Ok(Json(UsersResponse { user_ids }))
}

async fn answers(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswersRequest>,
) -> ApiResult<AnswersResponse> {
    let answers = state
        .assistant
        .resolve_answers(&req.question_ids, &req.user_ids)?;
    Ok(Json(AnswersResponse { answers }))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> ApiResult<QueryOutcome> {
    Ok(Json(state.assistant.ask(&req).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{QuestionStore, UserDirectory};
    use crate::embedding::HashEmbedder;
    use crate::summarize::PassthroughSummarizer;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let questions_path = dir.path().join("questions.csv");
        let users_path = dir.path().join("users.csv");
        let answers_path = dir.path().join("answers.csv");
        std::fs::write(
            &questions_path,
            "Question Id,Question,Category,Country\n\
             Q1,What is your favorite color?,Landscape,DAI-475\n\
             Q2,Which price corridor do you expect?,Pricing,FR\n",
        )
        .unwrap();
        std::fs::write(
            &users_path,
            "user_id,username,stakeholder_type,Country_grouping\n\
             u1,Nicolas Girard,NSCLC_KOL,FR\n\
             u2,Jaime Espin,ES_Payer,ES\n",
        )
        .unwrap();
        std::fs::write(
            &answers_path,
            "question_id,user_id,answer\nQ1,u1,Blue\nQ2,u2,Below comparators\n",
        )
        .unwrap();

        let store = QuestionStore::in_memory().unwrap();
        store
            .persist(&QuestionStore::load(&questions_path).unwrap())
            .unwrap();

        let assistant = Assistant::with_components(
            Settings::default(),
            store,
            UserDirectory::new(users_path, answers_path),
            Arc::new(HashEmbedder::default()),
            Arc::new(PassthroughSummarizer),
        );
        (dir, router(assistant))
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_filters() {
        let (_dir, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/filters").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["categories"], json!(["All", "Landscape", "Pricing"]));
        assert_eq!(body["country_groupings"], json!(["All", "FR", "ES"]));
    }

    #[tokio::test]
    async fn test_questions_by_category() {
        let (_dir, app) = app();
        let (status, body) = post(app, "/questions", json!({"category": "Pricing"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 1);
        assert_eq!(body["questions"][0]["question_id"], "Q2");
    }

    #[tokio::test]
    async fn test_users_and_answers() {
        let (_dir, app) = app();
        let (_, body) = post(app.clone(), "/users", json!({"country_grouping": "ES"})).await;
        assert_eq!(body["user_ids"], json!(["u2"]));

        let (status, body) = post(
            app,
            "/answers",
            json!({"question_ids": ["Q1", "Q2"], "user_ids": ["u2"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answers"][0]["answer"], "Below comparators");
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let (_dir, app) = app();
        let (status, body) = post(app, "/search", json!({"query": " "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_ask_answered() {
        let (_dir, app) = app();
        let (status, body) = post(
            app,
            "/ask",
            json!({"query": "Which price corridor do you expect?", "category": "all"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "answered");
        assert_eq!(body["matches"][0]["question"]["question_id"], "Q2");
        assert_eq!(body["summary"], "Below comparators");
    }

    #[tokio::test]
    async fn test_ask_no_users() {
        let (_dir, app) = app();
        let (status, body) = post(
            app,
            "/ask",
            json!({"query": "color", "username": "Nobody"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_users");
    }
}
