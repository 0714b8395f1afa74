//! REST API for the stowage simulator.
//!
//! Provides HTTP endpoints for placement, retrieval, waste handling, time
//! simulation, CSV interchange and the action log. Uses Axum as the web
//! framework and supports CORS. The station lives behind one async mutex, so
//! every request runs as a single-writer transaction.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::action_log::{ActionKind, Actor, LogEntry, LogFilter};
use crate::config::ApiConfig;
use crate::manifest::{self, ImportReport, RowError};
use crate::model::{Astronaut, Container, Item, ValidationError, WasteReason, Zone, parse_calendar_date};
use crate::placement::{
    Coordinates, PlacementOutcome, PlacementRecord, place_item, place_items,
};
use crate::rearrangement::{
    RearrangementPlan, RearrangementStep, execute_rearrangement, plan_rearrangement,
};
use crate::retrieval::{RetrievalOutcome, RetrievalStep, StepAction, plan_retrieval, retrieve_item};
use crate::search::search;
use crate::simulation::{MoveRecord, SimulationError, SimulationState};
use crate::waste::{
    self, DisposalManifest, ItemRef, ItemUsage, ManifestItem, ReturnPlan, ReturnStep,
    SimulationEvent, TimeAdvanceReport, TimeSpan, UsageEvent, WasteRecord,
};

#[derive(Clone)]
struct ApiState {
    simulation: Arc<Mutex<SimulationState>>,
}

impl ApiState {
    fn new(simulation: SimulationState) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(simulation)),
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>Stowage Simulator API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Who performs a request. Both fields are optional; the system actor and the
/// wall clock are used when absent.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorFields {
    #[serde(default)]
    pub astronaut_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2025-06-01T08:00:00Z")]
    pub timestamp: Option<Timestamp>,
}

impl ActorFields {
    fn to_actor(&self) -> Actor {
        let actor = match self.astronaut_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Actor::new(id.trim()),
            _ => Actor::system(),
        };
        match self.timestamp {
            Some(timestamp) => actor.at(timestamp),
            None => actor,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "items": [{
            "id": "item100",
            "name": "Spare Gloves",
            "width": 10.0, "depth": 10.0, "height": 5.0,
            "mass": 0.5,
            "priority": 40,
            "expiryDate": null,
            "usageLimit": 20,
            "preferredZone": "Crew Quarters"
        }],
        "containers": [],
        "astronautId": "ast1"
    })
)]
pub struct PlacementRequest {
    pub items: Vec<Item>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
pub struct PlacementResponse {
    pub success: bool,
    pub outcomes: Vec<PlacementOutcome>,
    /// Stowed items taken out because a replaced container shrank
    pub unstowed: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub item_id: String,
    pub container_id: String,
    pub position: Coordinates,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
pub struct PlaceResponse {
    pub success: bool,
    pub placement: PlacementRecord,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Exact item identifier
    pub item_id: Option<String>,
    /// Case-insensitive name fragment
    pub item_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub found: bool,
    pub item: Option<Item>,
    pub retrieval_steps: Vec<RetrievalStep>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemActionRequest {
    pub item_id: String,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
pub struct RetrieveResponse {
    pub success: bool,
    pub retrieval: RetrievalOutcome,
}

#[derive(Serialize, ToSchema)]
pub struct MarkWasteResponse {
    pub success: bool,
    /// `false` when the item already was waste
    pub changed: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WasteListResponse {
    pub success: bool,
    pub waste_items: Vec<WasteRecord>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlanRequest {
    pub undocking_container_id: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2025-06-15")]
    pub undocking_date: Option<Date>,
    pub max_weight: f64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlanResponse {
    pub success: bool,
    pub return_plan: ReturnPlan,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub undocking_container_id: String,
    pub max_weight: f64,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
pub struct StageResponse {
    pub success: bool,
    pub manifest: DisposalManifest,
    pub moves: Vec<MoveRecord>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UndockingRequest {
    pub undocking_container_id: String,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UndockingResponse {
    pub success: bool,
    pub items_removed: usize,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "numOfDays": 3,
        "itemsToBeUsedPerDay": [{ "itemId": "item001" }, { "name": "Camera" }]
    })
)]
pub struct SimulateRequest {
    #[serde(default)]
    pub num_of_days: Option<u32>,
    /// Target date; takes precedence over `numOfDays`
    #[serde(default)]
    pub to_timestamp: Option<String>,
    #[serde(default)]
    pub items_to_be_used_per_day: Vec<UsageEvent>,
    #[serde(flatten)]
    pub actor: ActorFields,
}

impl SimulateRequest {
    fn span(&self) -> Result<TimeSpan, ValidationError> {
        if let Some(raw) = self.to_timestamp.as_deref() {
            return parse_calendar_date("toTimestamp", raw).map(TimeSpan::Until);
        }
        self.num_of_days
            .map(TimeSpan::Days)
            .ok_or(ValidationError::MissingField("numOfDays"))
    }
}

#[derive(Serialize, ToSchema)]
pub struct SimulateResponse {
    pub success: bool,
    pub report: TimeAdvanceReport,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RearrangementResponse {
    pub success: bool,
    pub rearrangement_plan: RearrangementPlan,
}

#[derive(Deserialize, ToSchema)]
pub struct ExecuteRearrangementRequest {
    /// Plan to apply; the current suggestion is used when absent
    #[serde(default)]
    pub plan: Option<RearrangementPlan>,
    #[serde(flatten)]
    pub actor: ActorFields,
}

#[derive(Serialize, ToSchema)]
pub struct MovesResponse {
    pub success: bool,
    pub moves: Vec<MoveRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ImportReport,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Inclusive lower bound, RFC 3339 timestamp or calendar date
    pub start_date: Option<String>,
    /// Inclusive upper bound, RFC 3339 timestamp or calendar date
    pub end_date: Option<String>,
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    /// Return the most recent entries first
    #[serde(default)]
    pub newest_first: bool,
}

impl LogQuery {
    fn into_filter(self) -> Result<(LogFilter, bool), ValidationError> {
        let filter = LogFilter {
            start: self
                .start_date
                .as_deref()
                .map(|raw| parse_time_bound("startDate", raw, false))
                .transpose()?,
            end: self
                .end_date
                .as_deref()
                .map(|raw| parse_time_bound("endDate", raw, true))
                .transpose()?,
            item_id: self.item_id,
            astronaut_id: self.user_id,
            action: self
                .action_type
                .as_deref()
                .map(str::parse::<ActionKind>)
                .transpose()?,
        };
        Ok((filter, self.newest_first))
    }
}

/// A plain date bound covers the whole UTC day.
fn parse_time_bound(field: &'static str, raw: &str, end_of_day: bool) -> Result<Timestamp, ValidationError> {
    if let Ok(timestamp) = raw.trim().parse::<Timestamp>() {
        return Ok(timestamp);
    }
    let date = parse_calendar_date(field, raw)?;
    let datetime = if end_of_day {
        date.at(23, 59, 59, 999_999_999)
    } else {
        date.at(0, 0, 0, 0)
    };
    datetime
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

#[derive(Serialize, ToSchema)]
pub struct LogResponse {
    pub success: bool,
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn query_error(err: QueryRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid query parameters",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn simulation_error(err: SimulationError) -> Response {
    if err.is_not_found() {
        return error_response(StatusCode::NOT_FOUND, "Not found", err.to_string());
    }
    let error = match err {
        SimulationError::Csv(_) => "Invalid CSV data",
        SimulationError::Validation(_) => "Invalid input data",
        _ => "Operation rejected",
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, err.to_string())
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(value)| value).map_err(json_deserialize_error)
}

fn ok_json<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn csv_response(filename: &str, result: Result<String, SimulationError>) -> Response {
    match result {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={filename}"),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => simulation_error(err),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_placement,
        handle_place,
        handle_search,
        handle_retrieve,
        handle_mark_waste,
        handle_identify_waste,
        handle_return_plan,
        handle_stage_disposal,
        handle_complete_undocking,
        handle_simulate_day,
        handle_simulate_stream,
        handle_rearrangement,
        handle_execute_rearrangement,
        handle_import_items,
        handle_import_containers,
        handle_export_items,
        handle_export_containers,
        handle_export_arrangement,
        handle_logs,
        handle_state
    ),
    components(
        schemas(
            ActorFields,
            PlacementRequest,
            PlacementResponse,
            PlacementOutcome,
            PlacementRecord,
            Coordinates,
            PlaceRequest,
            PlaceResponse,
            SearchResponse,
            ItemActionRequest,
            RetrieveResponse,
            RetrievalOutcome,
            RetrievalStep,
            StepAction,
            MarkWasteResponse,
            WasteListResponse,
            WasteRecord,
            WasteReason,
            ReturnPlanRequest,
            ReturnPlanResponse,
            ReturnPlan,
            ReturnStep,
            DisposalManifest,
            ManifestItem,
            StageRequest,
            StageResponse,
            MoveRecord,
            UndockingRequest,
            UndockingResponse,
            SimulateRequest,
            SimulateResponse,
            TimeAdvanceReport,
            SimulationEvent,
            ItemUsage,
            ItemRef,
            UsageEvent,
            RearrangementResponse,
            RearrangementPlan,
            RearrangementStep,
            ExecuteRearrangementRequest,
            MovesResponse,
            ImportResponse,
            ImportReport,
            RowError,
            LogResponse,
            LogEntry,
            ActionKind,
            SimulationState,
            Item,
            Container,
            Astronaut,
            Zone,
            ErrorResponse
        )
    ),
    tags(
        (name = "stowage", description = "Placement, search and retrieval"),
        (name = "waste", description = "Waste identification and disposal"),
        (name = "simulation", description = "Simulated time"),
        (name = "interchange", description = "CSV import and export"),
        (name = "logs", description = "Action log and state")
    )
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/placement", post(handle_placement))
        .route("/api/place", post(handle_place))
        .route("/api/search", get(handle_search))
        .route("/api/retrieve", post(handle_retrieve))
        .route("/api/waste/mark", post(handle_mark_waste))
        .route("/api/waste/identify", get(handle_identify_waste))
        .route("/api/waste/return-plan", post(handle_return_plan))
        .route("/api/waste/stage", post(handle_stage_disposal))
        .route("/api/waste/complete-undocking", post(handle_complete_undocking))
        .route("/api/simulate/day", post(handle_simulate_day))
        .route("/api/simulate/stream", post(handle_simulate_stream))
        .route("/api/rearrangement", get(handle_rearrangement))
        .route("/api/rearrangement/execute", post(handle_execute_rearrangement))
        .route("/api/import/items", post(handle_import_items))
        .route("/api/import/containers", post(handle_import_containers))
        .route("/api/export/items", get(handle_export_items))
        .route("/api/export/containers", get(handle_export_containers))
        .route("/api/export/arrangement", get(handle_export_arrangement))
        .route("/api/logs", get(handle_logs))
        .route("/api/state", get(handle_state))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and serves `simulation` until terminated.
///
/// Configures CORS for cross-origin requests from the frontend.
pub async fn start_api_server(config: ApiConfig, simulation: SimulationState) -> std::io::Result<()> {
    let app = router(ApiState::new(simulation));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        host = config.display_host(),
        port = config.port(),
        "server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("local access: http://localhost:{}", config.port());
    }
    info!("documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /api/placement.
///
/// Upserts the given containers and stows each new item.
#[utoipa::path(
    post,
    path = "/api/placement",
    request_body = PlacementRequest,
    responses(
        (status = 200, description = "Per-item placement outcomes", body = PlacementResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request or container", body = ErrorResponse)
    ),
    tag = "stowage"
)]
async fn handle_placement(
    State(state): State<ApiState>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        items = request.items.len(),
        containers = request.containers.len(),
        "placement request"
    );

    let mut simulation = state.simulation.lock().await;
    match place_items(
        &mut simulation,
        request.items,
        request.containers,
        &request.actor.to_actor(),
    ) {
        Ok(report) => ok_json(PlacementResponse {
            success: true,
            outcomes: report.outcomes,
            unstowed: report.unstowed,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/place: stows an item at an explicit position.
#[utoipa::path(
    post,
    path = "/api/place",
    request_body = PlaceRequest,
    responses(
        (status = 200, description = "Item placed", body = PlaceResponse),
        (status = NOT_FOUND, description = "Unknown item or container", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Position outside the container", body = ErrorResponse)
    ),
    tag = "stowage"
)]
async fn handle_place(
    State(state): State<ApiState>,
    payload: Result<Json<PlaceRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut simulation = state.simulation.lock().await;
    match place_item(
        &mut simulation,
        &request.item_id,
        &request.container_id,
        request.position.into(),
        &request.actor.to_actor(),
    ) {
        Ok(placement) => ok_json(PlaceResponse {
            success: true,
            placement,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for GET /api/search.
///
/// A miss is not an error: the response carries `found: false`.
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Best match and how to retrieve it", body = SearchResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Neither itemId nor itemName given", body = ErrorResponse)
    ),
    tag = "stowage"
)]
async fn handle_search(
    State(state): State<ApiState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(err) => return query_error(err),
    };
    let Some(needle) = query.item_id.or(query.item_name) else {
        return validation_error("Either itemId or itemName is required");
    };

    let simulation = state.simulation.lock().await;
    let response = match search(&needle, &simulation.items) {
        Some(item) => SearchResponse {
            success: true,
            found: true,
            retrieval_steps: plan_retrieval(item, &simulation.items).steps,
            item: Some(item.clone()),
        },
        None => SearchResponse {
            success: true,
            found: false,
            item: None,
            retrieval_steps: Vec::new(),
        },
    };
    ok_json(response)
}

/// Handler for POST /api/retrieve.
#[utoipa::path(
    post,
    path = "/api/retrieve",
    request_body = ItemActionRequest,
    responses(
        (status = 200, description = "Item retrieved and one use counted", body = RetrieveResponse),
        (status = NOT_FOUND, description = "Unknown item", body = ErrorResponse)
    ),
    tag = "stowage"
)]
async fn handle_retrieve(
    State(state): State<ApiState>,
    payload: Result<Json<ItemActionRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut simulation = state.simulation.lock().await;
    match retrieve_item(&mut simulation, &request.item_id, &request.actor.to_actor()) {
        Ok(retrieval) => ok_json(RetrieveResponse {
            success: true,
            retrieval,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/waste/mark.
#[utoipa::path(
    post,
    path = "/api/waste/mark",
    request_body = ItemActionRequest,
    responses(
        (status = 200, description = "Item flagged as waste", body = MarkWasteResponse),
        (status = NOT_FOUND, description = "Unknown item", body = ErrorResponse)
    ),
    tag = "waste"
)]
async fn handle_mark_waste(
    State(state): State<ApiState>,
    payload: Result<Json<ItemActionRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut simulation = state.simulation.lock().await;
    match waste::mark_waste(&mut simulation, &request.item_id, &request.actor.to_actor()) {
        Ok(changed) => ok_json(MarkWasteResponse {
            success: true,
            changed,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for GET /api/waste/identify.
#[utoipa::path(
    get,
    path = "/api/waste/identify",
    responses(
        (status = 200, description = "All waste items with reasons", body = WasteListResponse)
    ),
    tag = "waste"
)]
async fn handle_identify_waste(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    ok_json(WasteListResponse {
        success: true,
        waste_items: waste::identify_waste(&simulation),
    })
}

/// Handler for POST /api/waste/return-plan. Read-only.
#[utoipa::path(
    post,
    path = "/api/waste/return-plan",
    request_body = ReturnPlanRequest,
    responses(
        (status = 200, description = "Manifest with return and retrieval steps", body = ReturnPlanResponse),
        (status = NOT_FOUND, description = "Unknown disposal container", body = ErrorResponse)
    ),
    tag = "waste"
)]
async fn handle_return_plan(
    State(state): State<ApiState>,
    payload: Result<Json<ReturnPlanRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if !request.max_weight.is_finite() || request.max_weight < 0.0 {
        return validation_error("maxWeight must be a non-negative number");
    }

    let simulation = state.simulation.lock().await;
    match waste::plan_return(
        &simulation,
        &request.undocking_container_id,
        request.undocking_date,
        request.max_weight,
    ) {
        Ok(return_plan) => ok_json(ReturnPlanResponse {
            success: true,
            return_plan,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/waste/stage: moves selected waste into the
/// disposal container.
#[utoipa::path(
    post,
    path = "/api/waste/stage",
    request_body = StageRequest,
    responses(
        (status = 200, description = "Waste staged", body = StageResponse),
        (status = NOT_FOUND, description = "Unknown disposal container", body = ErrorResponse)
    ),
    tag = "waste"
)]
async fn handle_stage_disposal(
    State(state): State<ApiState>,
    payload: Result<Json<StageRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if !request.max_weight.is_finite() || request.max_weight < 0.0 {
        return validation_error("maxWeight must be a non-negative number");
    }

    let mut simulation = state.simulation.lock().await;
    let manifest = match waste::plan_disposal(
        &simulation,
        &request.undocking_container_id,
        None,
        request.max_weight,
    ) {
        Ok(manifest) => manifest,
        Err(err) => return simulation_error(err),
    };
    match waste::stage_disposal(&mut simulation, &manifest, &request.actor.to_actor()) {
        Ok(moves) => ok_json(StageResponse {
            success: true,
            manifest,
            moves,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/waste/complete-undocking.
#[utoipa::path(
    post,
    path = "/api/waste/complete-undocking",
    request_body = UndockingRequest,
    responses(
        (status = 200, description = "Container emptied", body = UndockingResponse),
        (status = NOT_FOUND, description = "Unknown container", body = ErrorResponse)
    ),
    tag = "waste"
)]
async fn handle_complete_undocking(
    State(state): State<ApiState>,
    payload: Result<Json<UndockingRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut simulation = state.simulation.lock().await;
    match waste::complete_undocking(
        &mut simulation,
        &request.undocking_container_id,
        &request.actor.to_actor(),
    ) {
        Ok(items_removed) => ok_json(UndockingResponse {
            success: true,
            items_removed,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/simulate/day.
#[utoipa::path(
    post,
    path = "/api/simulate/day",
    request_body = SimulateRequest,
    responses(
        (status = 200, description = "Time advanced", body = SimulateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Missing span or target date in the past", body = ErrorResponse)
    ),
    tag = "simulation"
)]
async fn handle_simulate_day(
    State(state): State<ApiState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let span = match request.span() {
        Ok(span) => span,
        Err(err) => return validation_error(err.to_string()),
    };

    let mut simulation = state.simulation.lock().await;
    match waste::advance_time(
        &mut simulation,
        span,
        &request.items_to_be_used_per_day,
        &request.actor.to_actor(),
    ) {
        Ok(report) => ok_json(SimulateResponse {
            success: true,
            report,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/simulate/stream (SSE).
///
/// Streams simulation events in real time as Server-Sent Events. The state
/// stays locked until the final event has been produced.
#[utoipa::path(
    post,
    path = "/api/simulate/stream",
    request_body = SimulateRequest,
    responses(
        (
            status = 200,
            description = "Streams simulation events in real time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Missing span", body = ErrorResponse)
    ),
    tag = "simulation"
)]
async fn handle_simulate_stream(
    State(state): State<ApiState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let span = match request.span() {
        Ok(span) => span,
        Err(err) => return validation_error(err.to_string()),
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let guard = state.simulation.clone().lock_owned().await;
    let actor = request.actor.to_actor();
    let usage = request.items_to_be_used_per_day;

    tokio::task::spawn_blocking(move || {
        let mut simulation = guard;
        let result = waste::advance_time_with_progress(&mut simulation, span, &usage, &actor, |evt| {
            if let Ok(json) = serde_json::to_string(&evt) {
                // A closed receiver only means nobody is listening any more.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = result {
            warn!(%err, "streamed simulation rejected");
            let payload = json!({ "type": "error", "message": err.to_string() });
            let _ = tx.blocking_send(payload.to_string());
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /api/rearrangement.
#[utoipa::path(
    get,
    path = "/api/rearrangement",
    responses(
        (status = 200, description = "Suggested moves", body = RearrangementResponse)
    ),
    tag = "stowage"
)]
async fn handle_rearrangement(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    ok_json(RearrangementResponse {
        success: true,
        rearrangement_plan: plan_rearrangement(
            &simulation.containers,
            &simulation.items,
            &simulation.config,
        ),
    })
}

/// Handler for POST /api/rearrangement/execute.
#[utoipa::path(
    post,
    path = "/api/rearrangement/execute",
    request_body = ExecuteRearrangementRequest,
    responses(
        (status = 200, description = "Moves applied", body = MovesResponse),
        (status = NOT_FOUND, description = "Plan references unknown items or containers", body = ErrorResponse)
    ),
    tag = "stowage"
)]
async fn handle_execute_rearrangement(
    State(state): State<ApiState>,
    payload: Result<Json<ExecuteRearrangementRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut simulation = state.simulation.lock().await;
    let plan = request.plan.unwrap_or_else(|| {
        plan_rearrangement(&simulation.containers, &simulation.items, &simulation.config)
    });
    match execute_rearrangement(&mut simulation, &plan, &request.actor.to_actor()) {
        Ok(moves) => ok_json(MovesResponse {
            success: true,
            moves,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/import/items (CSV body).
#[utoipa::path(
    post,
    path = "/api/import/items",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Rows imported; bad rows are listed", body = ImportResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Unreadable CSV", body = ErrorResponse)
    ),
    tag = "interchange"
)]
async fn handle_import_items(State(state): State<ApiState>, body: String) -> Response {
    let mut simulation = state.simulation.lock().await;
    match manifest::import_items(&mut simulation, &body, &Actor::system()) {
        Ok(report) => ok_json(ImportResponse {
            success: true,
            report,
        }),
        Err(err) => simulation_error(err),
    }
}

/// Handler for POST /api/import/containers (CSV body).
#[utoipa::path(
    post,
    path = "/api/import/containers",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Rows imported; bad rows are listed", body = ImportResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Unreadable CSV", body = ErrorResponse)
    ),
    tag = "interchange"
)]
async fn handle_import_containers(State(state): State<ApiState>, body: String) -> Response {
    let mut simulation = state.simulation.lock().await;
    match manifest::import_containers(&mut simulation, &body, &Actor::system()) {
        Ok(report) => ok_json(ImportResponse {
            success: true,
            report,
        }),
        Err(err) => simulation_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/export/items",
    responses((status = 200, description = "Items as CSV", content_type = "text/csv", body = String)),
    tag = "interchange"
)]
async fn handle_export_items(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    csv_response("items.csv", manifest::export_items(&simulation.items))
}

#[utoipa::path(
    get,
    path = "/api/export/containers",
    responses((status = 200, description = "Containers as CSV", content_type = "text/csv", body = String)),
    tag = "interchange"
)]
async fn handle_export_containers(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    csv_response("containers.csv", manifest::export_containers(&simulation.containers))
}

#[utoipa::path(
    get,
    path = "/api/export/arrangement",
    responses((status = 200, description = "Stowed items with corner coordinates", content_type = "text/csv", body = String)),
    tag = "interchange"
)]
async fn handle_export_arrangement(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    csv_response("arrangement.csv", manifest::export_arrangement(&simulation.items))
}

/// Handler for GET /api/logs.
#[utoipa::path(
    get,
    path = "/api/logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Matching log entries", body = LogResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid filter", body = ErrorResponse)
    ),
    tag = "logs"
)]
async fn handle_logs(
    State(state): State<ApiState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(err) => return query_error(err),
    };
    let (filter, newest_first) = match query.into_filter() {
        Ok(parsed) => parsed,
        Err(err) => return validation_error(err.to_string()),
    };

    let simulation = state.simulation.lock().await;
    let logs: Vec<LogEntry> = simulation
        .logs
        .query(&filter, newest_first)
        .into_iter()
        .cloned()
        .collect();
    ok_json(LogResponse {
        success: true,
        logs,
    })
}

/// Handler for GET /api/state: the full station snapshot.
#[utoipa::path(
    get,
    path = "/api/state",
    responses((status = 200, description = "Current simulation state", body = SimulationState)),
    tag = "logs"
)]
async fn handle_state(State(state): State<ApiState>) -> Response {
    let simulation = state.simulation.lock().await;
    match serde_json::to_value(&*simulation) {
        Ok(value) => ok_json(value),
        Err(err) => {
            error!(%err, "state serialization failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Serialization failed",
                err.to_string(),
            )
        }
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
