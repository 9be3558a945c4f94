use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::{StatusCode, Uri},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chefgen::classify::RecipeParser;
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthKeys;
use crate::database::Database;
use crate::errors::WebResult;
use crate::generation::Generator;
use crate::models::{current_timestamp, AppStats, User};

pub mod accounts;
pub mod recipes;
pub mod users;

/// Request bodies carry base64 profile pictures of up to 5MB.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Everything a handler might need, cloned into each request.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: Database,
    pub generator: Generator,
    pub parser: Arc<dyn RecipeParser>,
    pub auth: AuthKeys,
}

/// The `{success: true, message?, data?}` envelope around every successful response.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // `GET /health` goes to `health`
        .route("/health", get(health))
        .route("/api/stats", get(app_stats))
        .nest("/api/auth", accounts::routes())
        .nest("/api/recipes", recipes::routes())
        .nest("/api/users", users::routes())
        // Older clients still post here
        .route("/generate", post(legacy_generate))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// Just reply that everything is okay
async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": current_timestamp(),
        "environment": if cfg!(debug_assertions) { "development" } else { "production" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn app_stats(State(db): State<Database>) -> WebResult<Json<ApiResponse<AppStats>>> {
    Ok(ApiResponse::data(User::app_stats(&db)?))
}

/// 307 keeps the method and body, so the POST is replayed against the new path.
async fn legacy_generate() -> Redirect {
    Redirect::temporary("/api/recipes/generate")
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    let path = uri.path_and_query().map_or(uri.path(), |p| p.as_str());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "API endpoint not found",
            "path": path,
            "availableEndpoints": {
                "auth": "/api/auth",
                "recipes": "/api/recipes",
                "users": "/api/users",
                "health": "/health",
            },
        })),
    )
}
