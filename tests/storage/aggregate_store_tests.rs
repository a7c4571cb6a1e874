//! AggregateStore contract tests.

use eventstorage::storage::{Session, Stores};
use eventstorage::StorageError;

use super::{make_aggregate, unique};

pub async fn test_create_and_find<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate = make_aggregate(&tenant, &unique("order"), 2);
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores
        .aggregates
        .create(conn, &aggregate)
        .await
        .expect("create should succeed");

    let found = stores
        .aggregates
        .find_by_id(conn, &tenant, &aggregate.aggregate_id)
        .await
        .expect("find should succeed");
    assert_eq!(found, Some(aggregate.clone()));
    assert!(stores
        .aggregates
        .exists(conn, &tenant, &aggregate.aggregate_id)
        .await
        .unwrap());
}

pub async fn test_create_duplicate_fails<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 1))
        .await
        .unwrap();
    let result = stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 1))
        .await;
    assert!(
        matches!(result, Err(StorageError::AlreadyExists { .. })),
        "second create should fail with AlreadyExists, got {result:?}"
    );
}

pub async fn test_find_missing_is_none<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let mut handle = session.acquire().await.expect("acquire");
    let found = stores
        .aggregates
        .find_by_id(&mut *handle, &unique("tenant"), "missing")
        .await
        .expect("absence is not an error");
    assert!(found.is_none());
}

pub async fn test_next_sequence_number_reserves_ranges<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 0))
        .await
        .unwrap();

    let first = stores
        .aggregates
        .next_sequence_number(conn, &tenant, &aggregate_id, 3)
        .await
        .unwrap()
        .expect("aggregate exists");
    assert_eq!(first.first, 1);
    assert_eq!(first.aggregate.sequence_number, 0);

    let second = stores
        .aggregates
        .next_sequence_number(conn, &tenant, &aggregate_id, 2)
        .await
        .unwrap()
        .expect("aggregate exists");
    assert_eq!(second.first, 4);
    assert_eq!(second.aggregate.sequence_number, 3);

    let stored = stores
        .aggregates
        .find_by_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sequence_number, 5);
}

pub async fn test_next_sequence_number_missing<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let mut handle = session.acquire().await.expect("acquire");
    let reservation = stores
        .aggregates
        .next_sequence_number(&mut *handle, &unique("tenant"), "missing", 1)
        .await
        .unwrap();
    assert!(reservation.is_none());
}

pub async fn test_delete_and_next_sequence_number<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 1))
        .await
        .unwrap();

    let prior = stores
        .aggregates
        .delete_and_next_sequence_number(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .expect("aggregate exists");
    assert!(!prior.deleted);
    assert_eq!(prior.sequence_number, 1);

    let stored = stores
        .aggregates
        .find_by_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.deleted);
    assert_eq!(stored.sequence_number, 2);

    // A second delete sees the aggregate already deleted and moves nothing.
    let again = stores
        .aggregates
        .delete_and_next_sequence_number(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .expect("aggregate exists");
    assert!(again.deleted);
    assert_eq!(again.sequence_number, 2);
}

pub async fn test_set_deleted_keeps_counter<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 4))
        .await
        .unwrap();

    let prior = stores
        .aggregates
        .set_deleted(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!prior.deleted);

    let stored = stores
        .aggregates
        .find_by_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.deleted);
    assert_eq!(stored.sequence_number, 4);
}

pub async fn test_delete_by_aggregate_id<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores
        .aggregates
        .create(conn, &make_aggregate(&tenant, &aggregate_id, 1))
        .await
        .unwrap();

    stores
        .aggregates
        .delete_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap();
    assert!(!stores
        .aggregates
        .exists(conn, &tenant, &aggregate_id)
        .await
        .unwrap());
}

pub async fn test_same_id_in_two_tenants<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let aggregate_id = unique("order");
    let (t1, t2) = (unique("tenant"), unique("tenant"));
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores
        .aggregates
        .create(conn, &make_aggregate(&t1, &aggregate_id, 1))
        .await
        .unwrap();
    stores
        .aggregates
        .create(conn, &make_aggregate(&t2, &aggregate_id, 7))
        .await
        .expect("aggregate ids are scoped by tenant");

    stores
        .aggregates
        .next_sequence_number(conn, &t1, &aggregate_id, 1)
        .await
        .unwrap();
    let other = stores
        .aggregates
        .find_by_id(conn, &t2, &aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(other.sequence_number, 7);
}

/// Run all AggregateStore contract tests.
#[macro_export]
macro_rules! run_aggregate_store_tests {
    ($session:expr, $stores:expr) => {
        use $crate::storage::aggregate_store_tests::*;

        test_create_and_find($session, $stores).await;
        println!("  test_create_and_find: PASSED");

        test_create_duplicate_fails($session, $stores).await;
        println!("  test_create_duplicate_fails: PASSED");

        test_find_missing_is_none($session, $stores).await;
        println!("  test_find_missing_is_none: PASSED");

        test_next_sequence_number_reserves_ranges($session, $stores).await;
        println!("  test_next_sequence_number_reserves_ranges: PASSED");

        test_next_sequence_number_missing($session, $stores).await;
        println!("  test_next_sequence_number_missing: PASSED");

        test_delete_and_next_sequence_number($session, $stores).await;
        println!("  test_delete_and_next_sequence_number: PASSED");

        test_set_deleted_keeps_counter($session, $stores).await;
        println!("  test_set_deleted_keeps_counter: PASSED");

        test_delete_by_aggregate_id($session, $stores).await;
        println!("  test_delete_by_aggregate_id: PASSED");

        test_same_id_in_two_tenants($session, $stores).await;
        println!("  test_same_id_in_two_tenants: PASSED");
    };
}
