//! HTTP handlers.
//!
//! Thin translation layer: deserialize the wire request, call into the core
//! library, serialize the result. All domain rules live in the library.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use cognisphere::{ChatRequest, Claims, MemoryCategory, PERSONALITIES};

use crate::models::*;
use crate::state::AppState;

/// Library error adapted to an HTTP response
pub struct ApiError(cognisphere::Error);

impl From<cognisphere::Error> for ApiError {
    fn from(err: cognisphere::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Verified bearer-token claims for protected routes
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            ApiError(cognisphere::Error::Unauthenticated(
                "Access denied. No token provided.".to_string(),
            ))
        })?;
        let claims = state.system.tokens().verify(token)?;
        Ok(AuthUser(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "CogniSphere API Server" }))
}

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state
        .system
        .users()
        .register(&body.name, &body.email, &body.password)
        .await?;
    let tokens = state.system.tokens().issue(&user)?;

    tracing::info!(email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", user, tokens)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state.system.users().login(&body.email, &body.password).await?;
    let tokens = state.system.tokens().issue(&user)?;

    tracing::info!(email = %user.email, "user logged in");
    Ok(Json(AuthResponse::new("Login successful", user, tokens)))
}

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state.system.users().profile(&email).await?;
    Ok(Json(ProfileResponse { user: user.into() }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> ApiResult<Json<ChatResponse>> {
    let reply = state
        .system
        .conversation()
        .respond(ChatRequest {
            thread_id: body.thread_id,
            user_id: body.user_id,
            user_email: body.user_email,
            message: body.message,
            image: body.image,
            personality: body.personality,
        })
        .await?;

    Ok(Json(ChatResponse { reply }))
}

pub async fn list_threads(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Json<Vec<ThreadSummaryResponse>>> {
    let threads = state.system.threads().list(&query.user_id).await?;
    Ok(Json(threads.into_iter().map(Into::into).collect()))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Json<ThreadMessagesResponse>> {
    let messages = state.system.threads().get(&thread_id, &query.user_id).await?;
    Ok(Json(ThreadMessagesResponse { thread_id, messages }))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.system.threads().delete(&thread_id, &query.user_id).await?;
    Ok(Json(json!({ "success": "Thread deleted successfully" })))
}

pub async fn debate(
    State(state): State<AppState>,
    Json(body): Json<DebateRequest>,
) -> ApiResult<Json<DebateResponse>> {
    let rounds = body.rounds.unwrap_or(5);
    let outcome = state.system.debate().run(&body.topic, rounds).await?;

    let debate: Vec<DebateTurnResponse> =
        outcome.transcript.into_iter().map(Into::into).collect();
    let total_arguments = debate.len();

    Ok(Json(DebateResponse {
        topic: body.topic.trim().to_string(),
        rounds,
        debate,
        total_arguments,
    }))
}

pub async fn upsert_memory(
    State(state): State<AppState>,
    Json(body): Json<MemoryUpsertRequest>,
) -> ApiResult<Json<MemoryUpsertResponse>> {
    if body.user_id.trim().is_empty() || body.key.trim().is_empty() || body.value.trim().is_empty()
    {
        return Err(cognisphere::Error::InvalidRequest(
            "userId, key, and value are required".to_string(),
        )
        .into());
    }

    let category = body.category.unwrap_or(MemoryCategory::Other);
    let importance = body.importance.unwrap_or(3);
    let profile = state
        .system
        .memory()
        .upsert(
            &body.user_id,
            body.user_email.as_deref(),
            &body.key,
            &body.value,
            category,
            importance,
        )
        .await?;

    Ok(Json(MemoryUpsertResponse {
        message: "Memory saved successfully",
        memory: SavedMemory {
            key: body.key,
            value: body.value,
            category,
            importance: importance.clamp(1, 5),
        },
        total_memories: profile.total_memories,
    }))
}

pub async fn get_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MemoryProfileResponse>> {
    let profile = state.system.memory().get(&user_id).await?;
    Ok(Json(profile.into()))
}

pub async fn memory_context(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ContextResponse>> {
    let context = state.system.memory().render_context(&user_id).await?;
    Ok(Json(ContextResponse { context }))
}

pub async fn delete_memory(
    State(state): State<AppState>,
    Path((user_id, key)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.system.memory().remove(&user_id, &key).await?;
    Ok(Json(json!({ "message": "Memory deleted successfully" })))
}

pub async fn personalities() -> Json<Vec<PersonalityResponse>> {
    Json(
        PERSONALITIES
            .iter()
            .map(|p| PersonalityResponse {
                id: p.key,
                name: p.name,
                emoji: p.emoji,
            })
            .collect(),
    )
}
