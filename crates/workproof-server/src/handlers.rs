use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use workproof_ledger::Block;
use workproof_tracker::{Attestation, SessionEvent};
use workproof_types::{Stats, TaskMetrics, TaskType, WorkRecord, WorkproofError};

use crate::state::AppState;

const DEFAULT_RECORDS_LIMIT: usize = 50;
const DEFAULT_PROOF_LIMIT: usize = 100;

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/records", get(list_records))
        .route("/api/records/{id}", get(get_record))
        .route("/api/proof", get(get_proof))
        .route("/api/tasks", post(start_task))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/tasks/{id}/fail", post(fail_task))
        .route("/api/sessions", post(record_session))
        .route("/api/chain", get(get_chain))
        .route("/api/chain/verify", get(verify_chain))
        .route("/api/balance/{address}", get(get_balance))
        .route("/api/mining", get(mining_status))
        .route("/api/mining/start", post(start_mining))
        .route("/api/mining/stop", post(stop_mining))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_status(e: &WorkproofError) -> StatusCode {
    match e {
        WorkproofError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        WorkproofError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
        WorkproofError::SealExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(e: WorkproofError) -> (StatusCode, String) {
    (error_status(&e), e.to_string())
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.tracker.stats().await)
}

async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<WorkRecord>> {
    let limit = q.limit.unwrap_or(DEFAULT_RECORDS_LIMIT);
    Json(state.tracker.records(limit).await)
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkRecord>> {
    state.tracker.record(id).await.map(Json).map_err(api_error)
}

async fn get_proof(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Json<Attestation> {
    let limit = q.limit.unwrap_or(DEFAULT_PROOF_LIMIT);
    Json(state.tracker.attestation(limit).await)
}

#[derive(Deserialize)]
struct StartTaskRequest {
    agent_id: String,
    description: String,
    task_type: TaskType,
}

async fn start_task(
    State(state): State<AppState>,
    Json(req): Json<StartTaskRequest>,
) -> (StatusCode, Json<WorkRecord>) {
    let record = state
        .tracker
        .start_task(req.agent_id, req.description, req.task_type)
        .await;
    (StatusCode::CREATED, Json(record))
}

async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(metrics): Json<TaskMetrics>,
) -> ApiResult<Json<WorkRecord>> {
    state
        .tracker
        .complete_task(id, metrics)
        .await
        .map(Json)
        .map_err(api_error)
}

#[derive(Deserialize)]
struct FailTaskRequest {
    message: String,
}

async fn fail_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FailTaskRequest>,
) -> ApiResult<Json<WorkRecord>> {
    state
        .tracker
        .fail_task(id, &req.message)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn record_session(
    State(state): State<AppState>,
    Json(event): Json<SessionEvent>,
) -> ApiResult<(StatusCode, Json<WorkRecord>)> {
    state
        .tracker
        .record_session(&state.agent_id, &event)
        .await
        .map(|record| (StatusCode::CREATED, Json(record)))
        .map_err(api_error)
}

async fn get_chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.miner.blocks().await)
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
    height: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn verify_chain(State(state): State<AppState>) -> Json<VerifyResponse> {
    let result = state.miner.verify().await;
    Json(VerifyResponse {
        valid: result.is_ok(),
        height: state.miner.height().await,
        error: result.err().map(|e| e.to_string()),
    })
}

#[derive(Serialize)]
struct BalanceResponse {
    address: String,
    balance: f64,
}

async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let balance = state.miner.balance(&address).await;
    Json(BalanceResponse { address, balance })
}

#[derive(Serialize)]
struct MiningStatus {
    working: bool,
    address: String,
    height: u64,
    latest_hash: Option<String>,
}

async fn mining_status(State(state): State<AppState>) -> Json<MiningStatus> {
    Json(MiningStatus {
        working: state.miner.is_working().await,
        address: state.miner.address().to_string(),
        height: state.miner.height().await,
        latest_hash: state.miner.latest_hash().await,
    })
}

async fn start_mining(State(state): State<AppState>) -> Json<MiningStatus> {
    state.miner.start().await;
    mining_status(State(state)).await
}

async fn stop_mining(State(state): State<AppState>) -> Json<MiningStatus> {
    state.miner.stop().await;
    mining_status(State(state)).await
}
