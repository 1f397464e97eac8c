use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use moneywise_core::auth::{hash_password, verify_password};
use moneywise_core::db::Database;
use moneywise_core::models::{parse_role, validate_registration};

use crate::gemini::{ChatTurn, GeminiClient};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    ai: Arc<GeminiClient>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct AuthOk {
    success: bool,
    user: WireUser,
}

#[derive(Serialize)]
struct WireUser {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    user_id: Option<String>,
}

#[derive(Serialize)]
struct HistoryEntry {
    role: String,
    content: String,
    timestamp: String,
}

#[derive(Deserialize)]
struct AppendMessageRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatOk {
    response: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    /// Bad password. Same body as `UnknownUser`; only the status differs.
    InvalidCredentials,
    /// Unknown email. Same body as `InvalidCredentials`.
    UnknownUser,
    Conflict(String),
    Upstream(anyhow::Error),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials".to_string(),
                None,
            ),
            Self::UnknownUser => (
                StatusCode::NOT_FOUND,
                "Invalid credentials".to_string(),
                None,
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            Self::Upstream(err) => {
                eprintln!("Upstream AI error: {err:#}");
                let details = if std::env::var("MONEYWISE_DEBUG").is_ok() {
                    Some(format!("{err:#}"))
                } else {
                    None
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred with the AI service.".to_string(),
                    details,
                )
            }
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };
        (status, Json(ErrorResponse { error: message, details })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Handlers ---

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthOk>), ApiError> {
    validate_registration(&req.name, &req.email, &req.password)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let password_hash = hash_password(&req.password).context("failed to hash password")?;

    let db = state
        .db
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    if db.email_exists(&req.email).context("database error")? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = db
        .create_user(req.name.trim(), &req.email, &password_hash)
        .context("failed to create user")?;

    Ok((
        StatusCode::CREATED,
        Json(AuthOk {
            success: true,
            user: WireUser {
                id: user.id,
                name: user.name,
            },
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthOk>, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let user = {
        let db = state
            .db
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        db.get_user_by_email(&req.email).context("database error")?
    };

    let Some(user) = user else {
        return Err(ApiError::UnknownUser);
    };

    let valid =
        verify_password(&req.password, &user.password_hash).context("failed to verify password")?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    Ok(Json(AuthOk {
        success: true,
        user: WireUser {
            id: user.id,
            name: user.name,
        },
    }))
}

async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Some(user_id) = params.user_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    };

    let db = state
        .db
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let messages = db.list_chat_messages(&user_id).context("database error")?;

    Ok(Json(
        messages
            .into_iter()
            .map(|m| HistoryEntry {
                role: m.role.as_str().to_string(),
                content: m.content,
                timestamp: m.timestamp,
            })
            .collect(),
    ))
}

async fn append_history(
    State(state): State<AppState>,
    Json(req): Json<AppendMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut missing = Vec::new();
    if req.user_id.is_empty() {
        missing.push("user_id");
    }
    if req.role.is_empty() {
        missing.push("role");
    }
    if req.content.is_empty() {
        missing.push("content");
    }
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "{} {} required",
            missing.join(", "),
            if missing.len() == 1 { "is" } else { "are" }
        )));
    }

    let role = parse_role(&req.role).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let db = state
        .db
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    db.append_chat_message(&req.user_id, role, &req.content)
        .context("failed to save message")?;

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatOk>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required.".to_string()));
    }

    let reply = state
        .ai
        .generate_async(&req.message, &req.history)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(ChatOk { response: reply }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "moneywise-api" }))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/chat/history", get(list_history).post(append_history))
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        // Browser clients call this API cross-origin; answer preflights
        // permissively.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    db: Database,
    ai: GeminiClient,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        ai: Arc::new(ai),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
