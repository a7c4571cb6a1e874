//! SnapshotStore contract tests.

use eventstorage::storage::{Session, Stores};

use super::{make_snapshot, unique, AGGREGATE_TYPE};

pub async fn test_snapshot_find_max<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    for seq in [100, 300, 200] {
        stores
            .snapshots
            .create(conn, &make_snapshot(&tenant, &aggregate_id, seq))
            .await
            .expect("create should succeed");
    }

    let latest = stores
        .snapshots
        .find_by_max_sequence_number(conn, &tenant, &aggregate_id, AGGREGATE_TYPE)
        .await
        .unwrap()
        .expect("snapshot exists");
    assert_eq!(latest.sequence_number, 300);
    assert_eq!(latest.aggregate_data, serde_json::json!({ "total": 3000 }));

    let all = stores
        .snapshots
        .find_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap();
    let sequences: Vec<u64> = all.iter().map(|s| s.sequence_number).collect();
    assert_eq!(sequences, vec![100, 200, 300]);
}

pub async fn test_snapshot_missing_is_none<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let mut handle = session.acquire().await.expect("acquire");
    let latest = stores
        .snapshots
        .find_by_max_sequence_number(&mut *handle, &unique("tenant"), "missing", AGGREGATE_TYPE)
        .await
        .expect("absence is not an error");
    assert!(latest.is_none());
}

pub async fn test_snapshot_update<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let mut snapshot = make_snapshot(&tenant, &unique("order"), 10);
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.snapshots.create(conn, &snapshot).await.unwrap();

    snapshot.aggregate_version = "2.0".to_string();
    stores.snapshots.update(conn, &snapshot).await.unwrap();

    let latest = stores
        .snapshots
        .find_by_max_sequence_number(conn, &tenant, &snapshot.aggregate_id, AGGREGATE_TYPE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest, snapshot);
}

pub async fn test_snapshot_delete_by_aggregate_id<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores
        .snapshots
        .create(conn, &make_snapshot(&tenant, &aggregate_id, 5))
        .await
        .unwrap();

    stores
        .snapshots
        .delete_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap();
    assert!(stores
        .snapshots
        .find_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .is_empty());
}

/// Run all SnapshotStore contract tests.
#[macro_export]
macro_rules! run_snapshot_store_tests {
    ($session:expr, $stores:expr) => {
        use $crate::storage::snapshot_store_tests::*;

        test_snapshot_find_max($session, $stores).await;
        println!("  test_snapshot_find_max: PASSED");

        test_snapshot_missing_is_none($session, $stores).await;
        println!("  test_snapshot_missing_is_none: PASSED");

        test_snapshot_update($session, $stores).await;
        println!("  test_snapshot_update: PASSED");

        test_snapshot_delete_by_aggregate_id($session, $stores).await;
        println!("  test_snapshot_delete_by_aggregate_id: PASSED");
    };
}
