//! Area API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{Area, AreaCreate, AreaUpdate};

use crate::core::ServerState;
use crate::floor::with_retry;
use crate::utils::AppResult;

#[derive(Debug, Default, Deserialize)]
pub struct AreaQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/areas - 区域列表 (按排序)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<AreaQuery>,
) -> AppResult<Json<Vec<Area>>> {
    Ok(Json(state.floor.list_areas(query.include_inactive)))
}

/// POST /api/areas - 创建区域
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<AreaCreate>,
) -> AppResult<Json<Area>> {
    let area = state.floor.create_area(payload).await?;
    Ok(Json(area))
}

/// PUT /api/areas/:id - 更新区域
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AreaUpdate>,
) -> AppResult<Json<Area>> {
    let area = with_retry(&state.retry, || state.floor.update_area(id, payload.clone())).await?;
    Ok(Json(area))
}

/// DELETE /api/areas/:id - 停用区域 (软删除)
pub async fn deactivate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Area>> {
    let area = with_retry(&state.retry, || state.floor.deactivate_area(id)).await?;
    Ok(Json(area))
}
