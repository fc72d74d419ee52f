mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Floor, at, booking, table};
use shared::models::{ReservationFilter, ReservationStatus, TableStatus};
use table_server::floor::ReservationSweeper;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn no_show_releases_the_table() {
    let floor = Floor::new();
    let terminal = floor.terminal().await;
    let t = table(&terminal, 4, 1, None).await;
    let reservation = terminal.create_reservation(booking(t.id, at(16, 30), 90)).await.unwrap();
    assert_eq!(terminal.get_table(t.id).await.unwrap().status, TableStatus::Reserved);

    // window ended at 18:00, two hours ago
    floor.set_time(20, 0);
    let report = terminal.expire_stale_reservations().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.released_tables, 1);

    let all = terminal.list_reservations(&ReservationFilter::default()).await.unwrap();
    assert_eq!(all[0].id, reservation.id);
    assert_eq!(all[0].status, ReservationStatus::NoShow);
    assert_eq!(terminal.get_table(t.id).await.unwrap().status, TableStatus::Available);

    let second = terminal.expire_stale_reservations().await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn table_stays_reserved_for_the_next_booking() {
    let floor = Floor::new();
    let terminal = floor.terminal().await;
    let t = table(&terminal, 4, 1, None).await;
    terminal.create_reservation(booking(t.id, at(13, 0), 60)).await.unwrap();
    terminal.create_reservation(booking(t.id, at(21, 0), 60)).await.unwrap();

    floor.set_time(15, 0);
    let report = terminal.expire_stale_reservations().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.released_tables, 0);
    assert_eq!(terminal.get_table(t.id).await.unwrap().status, TableStatus::Reserved);
}

#[tokio::test]
async fn sweep_leaves_occupied_tables_alone() {
    let floor = Floor::new();
    let terminal = floor.terminal().await;
    let t = table(&terminal, 4, 1, None).await;
    terminal.create_reservation(booking(t.id, at(13, 0), 60)).await.unwrap();

    // the host releases the hold by hand and seats walk-ins
    terminal.set_status(t.id, TableStatus::Available).await.unwrap();
    terminal.seat_guests(t.id, common::party(2)).await.unwrap();

    floor.set_time(15, 0);
    let report = terminal.expire_stale_reservations().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.released_tables, 0);
    assert_eq!(terminal.get_table(t.id).await.unwrap().status, TableStatus::Occupied);
    common::assert_floor_consistent(floor.gateway.as_ref()).await;
}

#[tokio::test]
async fn sweeper_task_runs_until_cancelled() {
    let floor = Floor::new();
    let terminal = floor.terminal().await;
    let t = table(&terminal, 4, 1, None).await;
    terminal.create_reservation(booking(t.id, at(12, 30), 15)).await.unwrap();
    floor.set_time(13, 0);

    let shutdown = CancellationToken::new();
    let sweeper = ReservationSweeper::new(Arc::clone(&terminal), Duration::from_millis(10), shutdown.clone());
    let handle = tokio::spawn(sweeper.run());

    let mut released = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if terminal.get_table(t.id).await.unwrap().status == TableStatus::Available {
            released = true;
            break;
        }
    }
    shutdown.cancel();
    handle.await.unwrap();
    assert!(released);
}
