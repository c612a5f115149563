use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stockpile_core::db::Database;
use stockpile_core::engine::{CreateOutcome, WriteEngine};
use stockpile_core::envelope::{ErrorCode, ErrorEnvelope};
use stockpile_core::models::{Actor, ProductDraft, ProductId, UpdateRequest, RESOURCE};

use crate::auth::{extract_bearer_token, TokenRegistry};
use crate::config::AppConfig;
use crate::error::{envelope_response, AppError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Database>,
    registry: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Arc<Database>, registry: TokenRegistry) -> Self {
        Self {
            config,
            db,
            registry: Arc::new(registry),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/products", post(create_product).get(list_products))
        .route(
            "/products/{id}",
            put(update_product).get(get_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let actor = state.registry.resolve(token)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn parse_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse().map_err(|_| {
        envelope_response(ErrorEnvelope::new(
            &ErrorCode::NotFound,
            format!("No product with id {raw}"),
            serde_json::json!({ "resource": "product", "id": raw }),
        ))
    })
}

/// Map a body-extraction failure to the shared validation envelope;
/// malformed JSON never reaches the engine, but the wire shape must not
/// differ from an engine-level validation rejection
fn invalid_body(rejection: &JsonRejection, required_fields: &[&str]) -> Response {
    envelope_response(ErrorEnvelope::new(
        &ErrorCode::ValidationError,
        rejection.body_text(),
        serde_json::json!({ "resource": RESOURCE, "required_fields": required_fields }),
    ))
}

async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(draft) = match payload {
        Ok(json) => json,
        Err(rejection) => return Ok(invalid_body(&rejection, &["name"])),
    };

    let engine = WriteEngine::new(state.db.connection());
    match engine.create(&actor, draft).await? {
        CreateOutcome::Created(product) => {
            tracing::info!(
                endpoint = "create_product",
                actor = %actor.id,
                product = %product.id,
                "Created product"
            );
            Ok((StatusCode::CREATED, Json(product)).into_response())
        }
        CreateOutcome::Invalid(failure) => {
            Ok(envelope_response(ErrorEnvelope::validation(&failure)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

const fn default_limit() -> usize {
    50
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let engine = WriteEngine::new(state.db.connection());
    let products = engine.list(query.limit, query.offset).await?;
    Ok(Json(products).into_response())
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let engine = WriteEngine::new(state.db.connection());
    match engine.get(id).await? {
        Some(product) => Ok(Json(product).into_response()),
        None => Ok(envelope_response(ErrorEnvelope::not_found(id))),
    }
}

async fn update_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return Ok(invalid_body(&rejection, &["version"])),
    };

    let engine = WriteEngine::new(state.db.connection());
    let outcome = engine.update(&actor, id, request).await?;

    match ErrorEnvelope::from_write_outcome(&outcome, id) {
        None => {
            let stockpile_core::engine::WriteOutcome::Updated(product) = outcome else {
                return Err(AppError::internal("Success outcome without record"));
            };
            tracing::info!(
                endpoint = "update_product",
                actor = %actor.id,
                product = %id,
                version = product.version,
                "Applied update"
            );
            Ok(Json(product).into_response())
        }
        Some(envelope) => {
            tracing::debug!(
                endpoint = "update_product",
                actor = %actor.id,
                product = %id,
                code = %envelope.error.code,
                "Rejected update"
            );
            Ok(envelope_response(envelope))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    version: i64,
}

async fn delete_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return Ok(invalid_body(&rejection, &["version"])),
    };

    let engine = WriteEngine::new(state.db.connection());
    let outcome = engine.delete(&actor, id, request.version).await?;

    match ErrorEnvelope::from_delete_outcome(&outcome, id) {
        None => {
            tracing::info!(
                endpoint = "delete_product",
                actor = %actor.id,
                product = %id,
                "Deleted product"
            );
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Some(envelope) => Ok(envelope_response(envelope)),
    }
}
