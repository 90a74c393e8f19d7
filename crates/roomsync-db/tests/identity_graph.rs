//! Integration tests for the identity graph.
//!
//! Require a live PostgreSQL reachable via DATABASE_URL.

#![cfg(feature = "integration")]

use chrono::{TimeZone, Utc};
use roomsync_core::Configuration;
use roomsync_db::models::{
    Asset, BookingGroupRow, BookingOccurrenceRow, ConfigurationRow, RoomBookingRow,
};
use roomsync_db::{run_migrations, upsert_group_tree, DbPool, GroupTree, OccurrenceNode, RoomBookingNode};
use sqlx::PgPool;

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = DbPool::connect(&url).await.expect("connect");
    run_migrations(pool.inner()).await.expect("migrate");
    pool.inner().clone()
}

async fn seed_asset(pool: &PgPool, suffix: &str) -> Asset {
    let config = ConfigurationRow::insert(
        pool,
        &Configuration {
            service_user_upn: format!("svc-{suffix}@x.test"),
            booking_url: "http://booking.test".into(),
            refresh_interval: 60,
            request_timeout: 120,
            ..Configuration::default()
        },
    )
    .await
    .expect("insert config");
    Asset::insert(
        pool,
        config.id.unwrap(),
        "proj",
        &format!("exchange_room_{suffix}@x.test"),
        &format!("{suffix}@x.test"),
        rand_id(),
    )
    .await
    .expect("insert asset")
}

fn rand_id() -> i32 {
    (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos()
        % 1_000_000) as i32
}

fn tree(uid: &str, asset_row_id: i64, indexes: &[i32]) -> GroupTree {
    GroupTree {
        exchange_uid: uid.into(),
        organizer_mailbox: "alice@x.test".into(),
        downstream_id: None,
        occurrences: indexes
            .iter()
            .map(|&i| OccurrenceNode {
                instance_index: i,
                start: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap(),
                cancelled: false,
                downstream_id: Some(rand_id()),
                room_bookings: vec![RoomBookingNode {
                    asset_row_id,
                    exchange_id: format!("{uid}-item-{i}"),
                }],
            })
            .collect(),
    }
}

#[tokio::test]
async fn upsert_replay_is_a_noop() {
    let pool = setup().await;
    let asset = seed_asset(&pool, &format!("replay{}", rand_id())).await;
    let uid = format!("AA{}", rand_id());

    let tree = tree(&uid, asset.id, &[1, 2]);
    let first = upsert_group_tree(&pool, &tree).await.expect("first upsert");
    let second = upsert_group_tree(&pool, &tree).await.expect("replay");
    assert_eq!(first, second);

    let occurrences = BookingOccurrenceRow::in_group(&pool, first).await.unwrap();
    assert_eq!(occurrences.len(), 2);
    let room_bookings = RoomBookingRow::for_occurrence(&pool, occurrences[0].id)
        .await
        .unwrap();
    assert_eq!(room_bookings.len(), 1);
}

#[tokio::test]
async fn room_event_id_resolves_to_owning_group() {
    let pool = setup().await;
    let asset = seed_asset(&pool, &format!("resolve{}", rand_id())).await;
    let uid = format!("BB{}", rand_id());

    let tree = tree(&uid, asset.id, &[0]);
    let group_id = upsert_group_tree(&pool, &tree).await.unwrap();

    let found = BookingGroupRow::by_exchange_room_event_id(&pool, &format!("{uid}-item-0"))
        .await
        .expect("resolves");
    assert_eq!(found.id, group_id);
    assert_eq!(found.exchange_uid, uid);

    let missing = BookingGroupRow::by_exchange_room_event_id(&pool, "unknown-item").await;
    assert!(missing.is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn in_group_except_finds_dropped_instances() {
    let pool = setup().await;
    let asset = seed_asset(&pool, &format!("except{}", rand_id())).await;
    let uid = format!("CC{}", rand_id());

    let tree = tree(&uid, asset.id, &[1, 2, 3]);
    let group_id = upsert_group_tree(&pool, &tree).await.unwrap();

    let dropped = BookingOccurrenceRow::in_group_except(&pool, group_id, &[1, 3])
        .await
        .unwrap();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].exchange_instance_index, 2);
}

#[tokio::test]
async fn sync_state_round_trips() {
    let pool = setup().await;
    let asset = seed_asset(&pool, &format!("state{}", rand_id())).await;

    assert_eq!(Asset::sync_state(&pool, asset.id).await.unwrap(), "");
    Asset::persist_sync_state(&pool, asset.id, "cookie-1")
        .await
        .unwrap();
    assert_eq!(
        Asset::sync_state(&pool, asset.id).await.unwrap(),
        "cookie-1"
    );
}
