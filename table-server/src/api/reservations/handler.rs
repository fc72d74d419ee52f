//! Reservation API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{Reservation, ReservationCreate, ReservationFilter, ReservationStatus};

use crate::core::ServerState;
use crate::floor::{SweepReport, with_retry};
use crate::utils::AppResult;
use crate::utils::time;

#[derive(Debug, Default, Deserialize)]
pub struct ReservationQuery {
    pub table_id: Option<i64>,
    pub status: Option<ReservationStatus>,
    /// 营业日 YYYY-MM-DD (门店时区)
    pub date: Option<String>,
}

/// GET /api/reservations - 预订列表 (?table_id=&status=&date=)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    let mut filter = ReservationFilter {
        table_id: query.table_id,
        status: query.status,
        ..ReservationFilter::default()
    };
    if let Some(date) = query.date.as_deref() {
        let date = time::parse_date(date)?;
        let tz = state.config.store.timezone;
        filter.from = Some(time::day_start_millis(date, tz));
        filter.until = Some(time::day_end_millis(date, tz));
    }

    Ok(Json(state.floor.list_reservations(&filter).await?))
}

/// POST /api/reservations - 创建预订
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<Json<Reservation>> {
    let reservation =
        with_retry(&state.retry, || state.floor.create_reservation(payload.clone())).await?;
    Ok(Json(reservation))
}

/// POST /api/reservations/:id/cancel - 取消预订
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let reservation = with_retry(&state.retry, || state.floor.cancel_reservation(id)).await?;
    Ok(Json(reservation))
}

/// POST /api/reservations/expire - 立即执行一次过期扫描
pub async fn expire(State(state): State<ServerState>) -> AppResult<Json<SweepReport>> {
    Ok(Json(state.floor.expire_stale_reservations().await?))
}
