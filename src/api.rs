// 🌐 HTTP API - axum router over the shipment store
//
// JSON envelope on every route: { success, data?, error? }.
// The store sits behind one Mutex (single writer); AI calls happen after the
// guard is released so a slow model never blocks other requests.

use crate::ai::{AiGateway, ChatTurn};
use crate::db::KeyValueStorage;
use crate::entities::{parse_date, EventDraft, Shipment, ShipmentDraft, ShipmentStatus};
use crate::error::{DraftError, GatewayError, StoreError, StoreResult};
use crate::query::{DateRange, ShipmentFilter, StatusFilter};
use crate::store::ShipmentStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const NOT_FOUND_MESSAGE: &str =
    "Tracking number not found. Please check your number and try again.";
const DEFAULT_UPDATE_DETAILS: &str = "Standard update";

// ============================================================================
// STATE + ENVELOPE
// ============================================================================

/// Shared application state
pub struct ApiState<S: KeyValueStorage> {
    pub store: Arc<Mutex<ShipmentStore<S>>>,
    pub gateway: AiGateway,
}

impl<S: KeyValueStorage> ApiState<S> {
    pub fn new(store: ShipmentStore<S>, gateway: AiGateway) -> Self {
        ApiState {
            store: Arc::new(Mutex::new(store)),
            gateway,
        }
    }

    /// Run `f` with the store locked; the guard never outlives this call
    ///
    /// A poisoned lock is recovered. Store writes are single blob sets.
    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut ShipmentStore<S>) -> StoreResult<T>,
    ) -> Result<T, ApiError> {
        let mut store = self.store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("store lock was poisoned, recovering");
            poisoned.into_inner()
        });
        Ok(f(&mut *store)?)
    }
}

impl<S: KeyValueStorage> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        ApiState {
            store: Arc::clone(&self.store),
            gateway: self.gateway.clone(),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Invalid(String),
    /// AI credential missing
    Unavailable(String),
    /// AI service failed or answered garbage
    Upstream(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => ApiError::NotFound(format!("Shipment not found: {}", id)),
            StoreError::Draft(e) => ApiError::Invalid(e.to_string()),
            e @ StoreError::Invariant { .. } => ApiError::Invalid(e.to_string()),
            e => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        ApiError::Invalid(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured => ApiError::Unavailable(err.to_string()),
            e => ApiError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(m)
            | ApiError::Invalid(m)
            | ApiError::Unavailable(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m) => m,
        };
        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

// ============================================================================
// REQUEST / RESPONSE BODIES
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: String,
    pub version: String,
    pub ai_configured: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ListParams {
    fn to_filter(&self) -> Result<ShipmentFilter, DraftError> {
        let mut filter = ShipmentFilter::new();

        if let Some(q) = &self.q {
            filter = filter.with_text(q.clone());
        }

        match self.status.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(s) if s.eq_ignore_ascii_case("all") => {}
            Some(s) => filter = filter.with_status(StatusFilter::Only(s.parse::<ShipmentStatus>()?)),
        }

        let day = |s: &Option<String>| -> Result<_, DraftError> {
            match s.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(d) => parse_date(d).map(Some),
            }
        };
        Ok(filter.with_dates(DateRange::new(day(&self.from)?, day(&self.to)?)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(flatten)]
    pub draft: EventDraft,
    /// Replace the description with an AI-drafted message
    #[serde(default)]
    pub use_ai: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Removed {
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/health
async fn health<S: KeyValueStorage>(State(state): State<ApiState<S>>) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health {
        status: "OK".to_string(),
        version: crate::VERSION.to_string(),
        ai_configured: state.gateway.is_configured(),
    }))
}

/// GET /api/track/:tracking_number - public lookup
async fn track<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Path(tracking_number): Path<String>,
) -> ApiResult<Shipment> {
    match state.with_store(|store| store.find_by_tracking_number(&tracking_number))? {
        Some(shipment) => ok(shipment),
        None => Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())),
    }
}

/// GET /api/shipments?q=&status=&from=&to=
async fn list_shipments<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Shipment>> {
    let filter = params.to_filter()?;
    let shipments = state.with_store(|store| store.list_all())?;
    ok(filter.apply(&shipments).into_iter().cloned().collect())
}

/// POST /api/shipments
async fn create_shipment<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Json(draft): Json<ShipmentDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Shipment>>), ApiError> {
    let shipment = state.with_store(|store| store.create(draft))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(shipment))))
}

/// GET /api/shipments/:id
async fn get_shipment<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Shipment> {
    state
        .with_store(|store| store.find_by_id(&id))?
        .map(|s| Json(ApiResponse::ok(s)))
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {}", id)))
}

/// DELETE /api/shipments/:id
async fn delete_shipment<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Removed> {
    let removed = state.with_store(|store| store.remove_many([id.as_str()]))?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!("Shipment not found: {}", id)));
    }
    ok(Removed { removed })
}

/// POST /api/shipments/bulk-delete
async fn bulk_delete<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<Removed> {
    let removed = state.with_store(|store| store.remove_many(&request.ids))?;
    ok(Removed { removed })
}

/// POST /api/shipments/:id/events
async fn record_event<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Path(id): Path<String>,
    Json(request): Json<EventRequest>,
) -> ApiResult<Shipment> {
    let mut draft = request.draft.validate()?;

    if request.use_ai && state.gateway.is_configured() {
        if state.with_store(|store| store.find_by_id(&id))?.is_none() {
            return Err(StoreError::NotFound { id }.into());
        }

        let details = if draft.description.trim().is_empty() {
            DEFAULT_UPDATE_DETAILS.to_string()
        } else {
            draft.description.clone()
        };
        let drafted = state
            .gateway
            .draft_status_message(draft.status, &draft.location, &details)
            .await;
        draft.description = drafted;
    }

    ok(state.with_store(|store| store.record_event(&id, draft))?)
}

/// GET /api/shipments/:id/suggestion
async fn suggestion<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Path(id): Path<String>,
) -> ApiResult<SuggestionResponse> {
    let status = state
        .with_store(|store| store.find_by_id(&id))?
        .map(|s| s.current_status)
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {}", id)))?;

    let suggestion = state.gateway.suggest_next_action(status).await;
    ok(SuggestionResponse { suggestion })
}

/// POST /api/import - AI manifest import
async fn import_manifest<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Shipment>>>), ApiError> {
    if request.text.trim().is_empty() {
        return Err(DraftError::MissingField("text").into());
    }

    let records = state.gateway.parse_manifest(&request.text).await?;
    let imported = state.with_store(|store| store.import_manifest(records))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(imported))))
}

/// POST /api/support/chat
async fn support_chat<S: KeyValueStorage>(
    State(state): State<ApiState<S>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if request.message.trim().is_empty() {
        return Err(DraftError::MissingField("message").into());
    }
    let reply = state
        .gateway
        .support_reply(&request.history, &request.message)
        .await;
    ok(ChatResponse { reply })
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes under /api, with CORS and request tracing
pub fn router<S>(state: ApiState<S>) -> Router
where
    S: KeyValueStorage + Send + 'static,
{
    let api_routes = Router::new()
        .route("/health", get(health::<S>))
        .route("/track/:tracking_number", get(track::<S>))
        .route("/shipments", get(list_shipments::<S>).post(create_shipment::<S>))
        .route("/shipments/bulk-delete", post(bulk_delete::<S>))
        .route(
            "/shipments/:id",
            get(get_shipment::<S>).delete(delete_shipment::<S>),
        )
        .route("/shipments/:id/events", post(record_event::<S>))
        .route("/shipments/:id/suggestion", get(suggestion::<S>))
        .route("/import", post(import_manifest::<S>))
        .route("/support/chat", post(support_chat::<S>))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
