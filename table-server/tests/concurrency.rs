mod common;

use common::{Floor, assert_floor_consistent, at, booking, party, table};
use shared::models::{ReservationFilter, ReservationStatus, TableStatus};
use table_server::FloorError;
use table_server::floor::{RetryPolicy, with_retry};

#[tokio::test]
async fn two_terminals_seating_one_table() {
    let floor = Floor::new();
    let a = floor.terminal().await;
    let t = table(&a, 4, 1, None).await;
    let b = floor.terminal().await;

    let (left, right) = tokio::join!(a.seat_guests(t.id, party(2)), b.seat_guests(t.id, party(3)));

    let outcomes = [left.is_ok(), right.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if left.is_ok() { right } else { left };
    assert!(matches!(loser, Err(FloorError::StaleState { .. })));
    assert_floor_consistent(floor.gateway.as_ref()).await;
}

#[tokio::test]
async fn retry_surfaces_the_real_conflict() {
    let floor = Floor::new();
    let a = floor.terminal().await;
    let t = table(&a, 4, 1, None).await;
    let b = floor.terminal().await;

    a.seat_guests(t.id, party(2)).await.unwrap();

    // b still believes the table is available
    let policy = RetryPolicy::default();
    let result = with_retry(&policy, || b.seat_guests(t.id, party(2))).await;
    assert!(matches!(result, Err(FloorError::Conflict { status: TableStatus::Occupied, .. })));
    assert_eq!(b.get_table(t.id).await.unwrap().status, TableStatus::Occupied);
    assert_floor_consistent(floor.gateway.as_ref()).await;
}

#[tokio::test]
async fn stale_replica_succeeds_after_refresh() {
    let floor = Floor::new();
    let a = floor.terminal().await;
    let t = table(&a, 4, 1, None).await;
    let b = floor.terminal().await;

    a.seat_guests(t.id, party(2)).await.unwrap();
    a.clear_table(t.id).await.unwrap();
    a.mark_ready(t.id).await.unwrap();

    let first = b.set_status(t.id, TableStatus::OutOfService).await;
    assert!(matches!(first, Err(FloorError::StaleState { .. })));

    let policy = RetryPolicy::default();
    let table = with_retry(&policy, || b.set_status(t.id, TableStatus::OutOfService))
        .await
        .unwrap();
    assert_eq!(table.status, TableStatus::OutOfService);
    assert_eq!(a.refresh_table(t.id).await.unwrap().unwrap().status, TableStatus::OutOfService);
}

#[tokio::test]
async fn concurrent_overlapping_bookings() {
    let floor = Floor::new();
    let a = floor.terminal().await;
    let t = table(&a, 4, 1, None).await;
    let b = floor.terminal().await;

    let (left, right) = tokio::join!(
        a.create_reservation(booking(t.id, at(18, 0), 90)),
        b.create_reservation(booking(t.id, at(18, 30), 60)),
    );
    assert_eq!([left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if left.is_ok() { right } else { left };
    assert!(matches!(
        loser,
        Err(FloorError::StaleState { .. } | FloorError::ReservationConflict { .. })
    ));

    let confirmed = a
        .list_reservations(&ReservationFilter {
            table_id: Some(t.id),
            status: Some(ReservationStatus::Confirmed),
            ..ReservationFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
}

#[tokio::test]
async fn duplicate_sweeps_are_harmless() {
    let floor = Floor::new();
    let a = floor.terminal().await;
    let t = table(&a, 4, 1, None).await;
    a.create_reservation(booking(t.id, at(13, 0), 60)).await.unwrap();
    let b = floor.terminal().await;

    floor.set_time(16, 0);
    let (left, right) = tokio::join!(a.expire_stale_reservations(), b.expire_stale_reservations());
    let (left, right) = (left.unwrap(), right.unwrap());

    assert_eq!(left.expired + right.expired, 1);
    assert_eq!(left.released_tables + right.released_tables, 1);
    assert_eq!(left.failed + right.failed, 0);
    assert_eq!(a.refresh_table(t.id).await.unwrap().unwrap().status, TableStatus::Available);
}
