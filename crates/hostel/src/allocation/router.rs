use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::admin::{AdminError, DirectoryAdmin};
use super::directory::{DirectoryStore, FetchError, PersistError};
use super::domain::{
    AccountRole, AllocationContext, AssignmentProposal, NewRoom, Occupant, OccupantId, Room,
    RoomId,
};
use super::occupancy::{OccupancySummary, ResidentRoster};
use super::service::{AllocationError, AllocationOutcome, RoomAllocator};

/// Header carrying the caller's role, set by the identity gateway in front of the service.
pub const ACTING_ROLE_HEADER: &str = "x-acting-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Shared handles for the allocation endpoints.
pub struct AllocationState<S> {
    pub allocator: Arc<RoomAllocator<S>>,
    pub admin: Arc<DirectoryAdmin<S>>,
}

impl<S> Clone for AllocationState<S> {
    fn clone(&self) -> Self {
        Self {
            allocator: self.allocator.clone(),
            admin: self.admin.clone(),
        }
    }
}

impl<S> AllocationState<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(allocator: Arc<RoomAllocator<S>>) -> Self {
        let admin = Arc::new(DirectoryAdmin::new(allocator.store().clone()));
        Self { allocator, admin }
    }
}

/// Router builder exposing allocation, occupancy, and manual directory edits.
pub fn allocation_router<S>(state: AllocationState<S>) -> Router
where
    S: DirectoryStore + 'static,
{
    Router::new()
        .route("/api/v1/allocations", post(allocate_handler::<S>))
        .route("/api/v1/rooms", post(create_room_handler::<S>))
        .route("/api/v1/rooms/occupancy", get(occupancy_handler::<S>))
        .route("/api/v1/occupants", get(residents_handler::<S>))
        .route(
            "/api/v1/occupants/:occupant_id/room",
            put(assign_handler::<S>).delete(unassign_handler::<S>),
        )
        .with_state(state)
}

/// Absent or unrecognised role headers are treated as a resident.
pub fn context_from_headers(headers: &HeaderMap) -> AllocationContext {
    let role = headers
        .get(ACTING_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(AccountRole::parse)
        .unwrap_or(AccountRole::Resident);
    let actor = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();
    AllocationContext { actor, role }
}

#[derive(Debug, Serialize)]
pub(crate) struct AllocationResponse {
    #[serde(flatten)]
    outcome: AllocationOutcome,
    assignments: Vec<AssignmentProposal>,
    unplaced: Vec<OccupantId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

impl ExportQuery {
    fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("csv"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRoomRequest {
    room_id: RoomId,
}

pub(crate) async fn allocate_handler<S>(
    State(state): State<AllocationState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let ctx = context_from_headers(&headers);
    let result = state.allocator.allocate(&ctx).await;
    let outcome = AllocationOutcome::from_result(&result);

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => allocation_status(err),
    };

    let (assignments, unplaced) = match result {
        Ok(report) => (report.assignments, report.unplaced),
        Err(_) => (Vec::new(), Vec::new()),
    };

    let body = AllocationResponse {
        outcome,
        assignments,
        unplaced,
    };
    (status, axum::Json(body)).into_response()
}

pub(crate) async fn occupancy_handler<S>(
    State(state): State<AllocationState<S>>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let (occupants, rooms) = match directory_records(state.allocator.store().as_ref()).await {
        Ok(records) => records,
        Err(err) => return error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    };

    let summary = OccupancySummary::build(&occupants, &rooms);
    if !query.wants_csv() {
        return (StatusCode::OK, axum::Json(summary)).into_response();
    }
    csv_response(summary.to_csv_string())
}

pub(crate) async fn residents_handler<S>(
    State(state): State<AllocationState<S>>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let (occupants, rooms) = match directory_records(state.allocator.store().as_ref()).await {
        Ok(records) => records,
        Err(err) => return error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    };

    let roster = ResidentRoster::build(&occupants, &rooms);
    if !query.wants_csv() {
        return (StatusCode::OK, axum::Json(roster)).into_response();
    }
    csv_response(roster.to_csv_string())
}

async fn directory_records<S>(store: &S) -> Result<(Vec<Occupant>, Vec<Room>), FetchError>
where
    S: DirectoryStore,
{
    let occupants = store.fetch_occupants().await?;
    let rooms = store.fetch_rooms().await?;
    Ok((occupants, rooms))
}

fn csv_response(rendered: Result<String, csv::Error>) -> Response {
    match rendered {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn create_room_handler<S>(
    State(state): State<AllocationState<S>>,
    headers: HeaderMap,
    axum::Json(room): axum::Json<NewRoom>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let ctx = context_from_headers(&headers);
    match state.admin.add_room(&ctx, room).await {
        Ok(created) => (StatusCode::CREATED, axum::Json(created)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

pub(crate) async fn assign_handler<S>(
    State(state): State<AllocationState<S>>,
    headers: HeaderMap,
    Path(occupant_id): Path<String>,
    axum::Json(request): axum::Json<AssignRoomRequest>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let ctx = context_from_headers(&headers);
    let occupant_id = OccupantId(occupant_id);
    match state
        .admin
        .assign_room(&ctx, &occupant_id, request.room_id)
        .await
    {
        Ok(pair) => (StatusCode::OK, axum::Json(pair)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

pub(crate) async fn unassign_handler<S>(
    State(state): State<AllocationState<S>>,
    headers: HeaderMap,
    Path(occupant_id): Path<String>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let ctx = context_from_headers(&headers);
    let occupant_id = OccupantId(occupant_id);
    match state.admin.unassign_room(&ctx, &occupant_id).await {
        Ok(previous_room) => {
            let payload = json!({
                "occupant_id": occupant_id,
                "previous_room_id": previous_room,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_error_response(err),
    }
}

/// HTTP status for a failed allocation run.
pub(crate) fn allocation_status(err: &AllocationError) -> StatusCode {
    match err {
        AllocationError::Unauthorized => StatusCode::FORBIDDEN,
        AllocationError::RunInProgress => StatusCode::CONFLICT,
        AllocationError::Fetch(_) => StatusCode::SERVICE_UNAVAILABLE,
        AllocationError::Persist(_) => StatusCode::BAD_GATEWAY,
    }
}

/// HTTP status for a rejected manual directory edit.
pub(crate) fn admin_status(err: &AdminError) -> StatusCode {
    match err {
        AdminError::Unauthorized => StatusCode::FORBIDDEN,
        AdminError::UnknownOccupant(_) | AdminError::UnknownRoom(_) => StatusCode::NOT_FOUND,
        AdminError::InvalidRoom(_)
        | AdminError::NotResident(_)
        | AdminError::Incompatible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AdminError::AlreadyAssigned { .. }
        | AdminError::RoomFull(_)
        | AdminError::Duplicate(_)
        | AdminError::Persist(PersistError::Conflict(_)) => StatusCode::CONFLICT,
        AdminError::Fetch(_) => StatusCode::SERVICE_UNAVAILABLE,
        AdminError::Persist(_) => StatusCode::BAD_GATEWAY,
    }
}

fn admin_error_response(err: AdminError) -> Response {
    error_response(admin_status(&err), err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}
