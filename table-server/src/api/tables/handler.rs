//! Dining Table API Handlers
//!
//! State-changing calls run inside [`with_retry`]: a `StaleState` from a
//! concurrent terminal is retried against the refreshed replica before it
//! reaches the client.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{
    DiningSession, DiningTable, DiningTableCreate, DiningTableUpdate, SeatRequest, TableFilter,
    TableStats, TableStatus,
};

use crate::core::ServerState;
use crate::floor::with_retry;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct PartyQuery {
    pub party_size: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TableStatus,
}

/// GET /api/tables - 桌台列表 (?area_id=&status=)
pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<TableFilter>,
) -> AppResult<Json<Vec<DiningTable>>> {
    Ok(Json(state.floor.list_tables(&filter)))
}

/// GET /api/tables/stats - 各状态桌台数量
pub async fn stats(State(state): State<ServerState>) -> AppResult<Json<TableStats>> {
    Ok(Json(state.floor.get_table_stats()))
}

/// GET /api/tables/available?party_size=n - 可入座桌台 (最贴合优先)
pub async fn available(
    State(state): State<ServerState>,
    Query(query): Query<PartyQuery>,
) -> AppResult<Json<Vec<DiningTable>>> {
    let tables = state.floor.get_available_tables_for_party(query.party_size)?;
    Ok(Json(tables))
}

/// GET /api/tables/:id - 获取单个桌台
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.floor.get_table(id).await?))
}

/// POST /api/tables - 创建桌台
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.floor.create_table(payload).await?))
}

/// PUT /api/tables/:id - 更新桌台 (不含状态)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<DiningTableUpdate>,
) -> AppResult<Json<DiningTable>> {
    let table = with_retry(&state.retry, || state.floor.update_table(id, payload.clone())).await?;
    Ok(Json(table))
}

/// POST /api/tables/:id/seat - 入座
pub async fn seat(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<SeatRequest>,
) -> AppResult<Json<DiningSession>> {
    let session = with_retry(&state.retry, || state.floor.seat_guests(id, payload.clone())).await?;
    Ok(Json(session))
}

/// POST /api/tables/:id/clear - 清台
pub async fn clear(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiningTable>> {
    let table = with_retry(&state.retry, || state.floor.clear_table(id)).await?;
    Ok(Json(table))
}

/// POST /api/tables/:id/ready - 清洁完成
pub async fn ready(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiningTable>> {
    let table = with_retry(&state.retry, || state.floor.mark_ready(id)).await?;
    Ok(Json(table))
}

/// POST /api/tables/:id/status - 手动覆盖状态
pub async fn set_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<DiningTable>> {
    let table = with_retry(&state.retry, || state.floor.set_status(id, payload.status)).await?;
    Ok(Json(table))
}

/// GET /api/tables/:id/session - 当前活跃会话
pub async fn active_session(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Option<DiningSession>>> {
    Ok(Json(state.floor.get_active_session(id).await?))
}

/// GET /api/tables/:id/sessions - 会话历史 (最新在前)
pub async fn sessions(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<DiningSession>>> {
    Ok(Json(state.floor.list_sessions(id).await?))
}
