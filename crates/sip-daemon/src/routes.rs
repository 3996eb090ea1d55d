//! Axum router and all HTTP handlers for sip-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sip_runtime::CatalogError;
use sip_schemas::{BeverageId, UserId};
use tracing::{error, info, warn};

use crate::{
    api_types::{BeverageRequest, ErrorResponse, HealthResponse, SearchResponse},
    state::{AppState, Denied},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/beverages", post(create_beverage))
        .route("/v1/beverages/search/:term", get(search_beverages))
        .route(
            "/v1/beverages/:id",
            get(get_beverage).put(update_beverage).delete(delete_beverage),
        )
        .route("/v1/users/:id/favorites", get(list_favorites))
        .route("/v1/users/:id/favorites/:beverage_id", post(add_favorite))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(Denied),
    /// The body was not a well-formed `BeverageRequest`.
    MalformedBody(String),
    Catalog(CatalogError),
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Catalog(e)
    }
}

impl From<Denied> for ApiError {
    fn from(d: Denied) -> Self {
        ApiError::Unauthorized(d)
    }
}

fn body(code: &str, message: String, field: Option<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: code.to_string(),
        message,
        field,
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(d) => {
                let msg = match d {
                    Denied::MissingToken => "missing bearer token",
                    Denied::UnknownToken => "bearer token not accepted",
                };
                (StatusCode::UNAUTHORIZED, body("UNAUTHORIZED", msg.to_string(), None))
                    .into_response()
            }
            ApiError::MalformedBody(msg) => (
                StatusCode::BAD_REQUEST,
                body("VALIDATION", msg, Some("body".to_string())),
            )
                .into_response(),
            ApiError::Catalog(e) => catalog_error_response(e),
        }
    }
}

fn catalog_error_response(e: CatalogError) -> Response {
    let message = e.to_string();
    match e {
        CatalogError::DuplicateName { .. } => {
            (StatusCode::CONFLICT, body("DUPLICATE_NAME", message, None)).into_response()
        }
        CatalogError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, body("NOT_FOUND", message, None)).into_response()
        }
        CatalogError::Validation { field, .. } => {
            (StatusCode::BAD_REQUEST, body("VALIDATION", message, Some(field))).into_response()
        }
        CatalogError::ConcurrentModification { .. } => (
            StatusCode::CONFLICT,
            body("CONCURRENT_MODIFICATION", message, None),
        )
            .into_response(),
        CatalogError::PersistenceFailure(cause) => {
            error!(error = %cause, "persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("PERSISTENCE_FAILURE", "storage failed; nothing was changed".to_string(), None),
            )
                .into_response()
        }
    }
}

fn parse_body(
    payload: Result<Json<BeverageRequest>, JsonRejection>,
) -> Result<BeverageRequest, ApiError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rej| ApiError::MalformedBody(rej.body_text()))
}

/// Path segments that must be numeric keys answer 400 VALIDATION like any
/// other bad input instead of axum's plain-text rejection.
fn path_keys<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    path.map(|Path(v)| v)
        .map_err(|rej| CatalogError::validation("id", rej.body_text()).into())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            store: st.service.store().backend_name(),
            catalog: st.service.source_name(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Beverages
// ---------------------------------------------------------------------------

pub(crate) async fn search_beverages(
    State(st): State<Arc<AppState>>,
    Path(term): Path<String>,
) -> Result<Json<SearchResponse>, ApiError> {
    let out = st.service.search(&term).await?;
    Ok(Json(out.into()))
}

pub(crate) async fn get_beverage(
    State(st): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_keys(path)?;
    let b = st.service.get(BeverageId(id)).await?;
    Ok((StatusCode::OK, Json(b)).into_response())
}

pub(crate) async fn create_beverage(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<BeverageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.auth.authorize(&headers)?;
    let req = parse_body(payload)?;
    let payload = req.into_payload()?;

    let created = st.service.create(&payload).await?;
    let id = created.id.map_or(0, |i| i.0);
    info!(beverage_id = id, name = %created.name, "POST /v1/beverages");

    let mut resp = (StatusCode::CREATED, Json(created)).into_response();
    if let Ok(loc) = HeaderValue::from_str(&format!("/v1/beverages/{id}")) {
        resp.headers_mut().insert(LOCATION, loc);
    }
    Ok(resp)
}

pub(crate) async fn update_beverage(
    State(st): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<BeverageRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    st.auth.authorize(&headers)?;
    let id = path_keys(path)?;
    let req = parse_body(payload)?;
    if let Some(body_id) = req.body_id() {
        if body_id.0 != id {
            warn!(path_id = id, body_id = body_id.0, "update id mismatch");
            return Err(CatalogError::validation(
                "beverage_id",
                format!("body id {body_id} does not match path id {id}"),
            )
            .into());
        }
    }
    let payload = req.into_payload()?;

    st.service.update(BeverageId(id), &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete_beverage(
    State(st): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    st.auth.authorize(&headers)?;
    let id = path_keys(path)?;
    st.service.delete(BeverageId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

pub(crate) async fn list_favorites(
    State(st): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let user = path_keys(path)?;
    let list = st.service.favorites(UserId(user)).await?;
    Ok((StatusCode::OK, Json(list)).into_response())
}

pub(crate) async fn add_favorite(
    State(st): State<Arc<AppState>>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    st.auth.authorize(&headers)?;
    let (user, beverage) = path_keys(path)?;
    st.service
        .add_favorite(UserId(user), BeverageId(beverage))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
