use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use muse_core::services::CreationService;
use muse_core::util::{compact_text, user_fingerprint};
use muse_core::{Creation, CreationId, Error as CoreError};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, JwksVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{EndpointRateLimiter, ProtectedEndpoint, RateLimitMetricsSnapshot};

const CREATION_NOT_FOUND: &str = "Creation not found";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    creations: CreationService,
    jwt_verifier: Arc<JwksVerifier>,
    endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>, creations: CreationService) -> Self {
        Self {
            jwt_verifier: Arc::new(JwksVerifier::new(config.clone())),
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            creations,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes =
        user_routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/user", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// Routes that expect an [`AuthenticatedUser`] extension
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/get-user-creations", get(get_user_creations))
        .route("/get-published-creations", get(get_published_creations))
        .route("/toggle-like-creations", post(toggle_like_creation))
        .route("/toggle-publish-creation", post(toggle_publish_creation))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.jwt_verifier.verify_session_token(token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// `{ success, creations?, message? }`
#[derive(Debug, Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    creations: Option<Vec<Creation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiResponse {
    const fn creations(creations: Vec<Creation>) -> Self {
        Self {
            success: true,
            creations: Some(creations),
            message: None,
        }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            creations: None,
            message: Some(message.into()),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            creations: None,
            message: Some(message.into()),
        }
    }

    fn from_error(endpoint: &'static str, error: &CoreError) -> Self {
        match error {
            CoreError::NotFound(_) => Self::failure(CREATION_NOT_FOUND),
            other => {
                tracing::error!(
                    endpoint,
                    error = %compact_text(&other.to_string()),
                    "Request failed"
                );
                Self::failure(other.to_string())
            }
        }
    }
}

async fn get_user_creations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Feed, &user.user_id)
        .await?;

    let response = match state.creations.list_user_creations(&user.user_id).await {
        Ok(creations) => ApiResponse::creations(creations),
        Err(error) => ApiResponse::from_error("get_user_creations", &error),
    };
    Ok(Json(response))
}

async fn get_published_creations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Feed, &user.user_id)
        .await?;

    let response = match state.creations.list_published_creations().await {
        Ok(creations) => ApiResponse::creations(creations),
        Err(error) => ApiResponse::from_error("get_published_creations", &error),
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ToggleLikeRequest {
    id: String,
}

async fn toggle_like_creation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<ToggleLikeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::ToggleLike, &user.user_id)
        .await?;
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let Ok(id) = request.id.parse::<CreationId>() else {
        return Ok(Json(ApiResponse::failure(CREATION_NOT_FOUND)));
    };

    let response = match state.creations.toggle_like(&id, &user.user_id).await {
        Ok(toggle) => {
            tracing::info!(
                endpoint = "toggle_like",
                user = user_fingerprint(&user.user_id),
                session = user.session_id.as_deref().unwrap_or("none"),
                creation = %id,
                outcome = toggle.message(),
                "Toggled like"
            );
            ApiResponse::ok(toggle.message())
        }
        Err(error) => ApiResponse::from_error("toggle_like", &error),
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct TogglePublishRequest {
    id: String,
    publish: bool,
}

async fn toggle_publish_creation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<TogglePublishRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let Ok(id) = request.id.parse::<CreationId>() else {
        return Ok(Json(ApiResponse::failure(CREATION_NOT_FOUND)));
    };

    let response = match state
        .creations
        .set_publish(&id, &user.user_id, request.publish)
        .await
    {
        Ok(()) if request.publish => ApiResponse::ok("Creation published"),
        Ok(()) => ApiResponse::ok("Creation unpublished"),
        Err(error) => ApiResponse::from_error("toggle_publish", &error),
    };
    Ok(Json(response))
}
