//! EventStore contract tests.

use eventstorage::paging::PagingQuery;
use eventstorage::storage::{Session, Stores};
use eventstorage::StorageError;

use super::{make_event, make_events, unique, AGGREGATE_TYPE};

pub async fn test_event_create_and_find_by_id<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let event = make_event(&tenant, &unique("order"), 1, "Created");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores.events.create(conn, &event).await.expect("create should succeed");

    let found = stores
        .events
        .find_by_id(conn, &tenant, &event.id)
        .await
        .expect("find should succeed");
    assert_eq!(found, Some(event.clone()), "event should round-trip unchanged");

    let other_tenant = stores
        .events
        .find_by_id(conn, &unique("tenant"), &event.id)
        .await
        .unwrap();
    assert!(other_tenant.is_none());
}

pub async fn test_event_validation_rejects_before_write<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let mut event = make_event(&tenant, &unique("order"), 1, "Created");
    event.topic.clear();
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    let result = stores.events.create(conn, &event).await;
    assert!(
        matches!(result, Err(StorageError::Validation { field: "topic", .. })),
        "missing topic should be a validation error, got {result:?}"
    );
    assert!(stores
        .events
        .find_by_id(conn, &tenant, &event.id)
        .await
        .unwrap()
        .is_none());
}

pub async fn test_event_duplicate_sequence<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores
        .events
        .create(conn, &make_event(&tenant, &aggregate_id, 1, "Created"))
        .await
        .unwrap();
    let result = stores
        .events
        .create(conn, &make_event(&tenant, &aggregate_id, 1, "Created"))
        .await;
    assert!(
        matches!(result, Err(ref e) if e.is_duplicate()),
        "same sequence number should be a duplicate, got {result:?}"
    );
}

pub async fn test_event_duplicate_event_id<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let first = make_event(&tenant, &aggregate_id, 1, "Created");
    let mut replay = make_event(&tenant, &aggregate_id, 2, "Created");
    replay.event_id = first.event_id.clone();
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores.events.create(conn, &first).await.unwrap();
    let result = stores.events.create(conn, &replay).await;
    assert!(
        matches!(result, Err(StorageError::DuplicateEvent { ref event_id }) if *event_id == first.event_id),
        "reused event id should be a duplicate, got {result:?}"
    );
}

pub async fn test_event_find_by_sequence_number<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let events = make_events(&tenant, &aggregate_id, 5);
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    // Insert out of order; reads come back ascending.
    for event in events.iter().rev() {
        stores.events.create(conn, event).await.unwrap();
    }

    let all = stores
        .events
        .find_by_sequence_number(conn, &tenant, &aggregate_id, AGGREGATE_TYPE, 0)
        .await
        .unwrap();
    assert_eq!(all, events);

    let tail = stores
        .events
        .find_by_sequence_number(conn, &tenant, &aggregate_id, AGGREGATE_TYPE, 3)
        .await
        .unwrap();
    let sequences: Vec<u64> = tail.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![4, 5]);

    let none = stores
        .events
        .find_by_sequence_number(conn, &tenant, &aggregate_id, AGGREGATE_TYPE, 5)
        .await
        .unwrap();
    assert!(none.is_empty());

    let history = stores
        .events
        .find_by_aggregate_id(conn, &tenant, &aggregate_id, AGGREGATE_TYPE)
        .await
        .unwrap();
    assert_eq!(history.len(), 5);

    let wrong_type = stores
        .events
        .find_by_aggregate_id(conn, &tenant, &aggregate_id, "Invoice")
        .await
        .unwrap();
    assert!(wrong_type.is_empty());
}

pub async fn test_event_update<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let mut event = make_event(&tenant, &unique("order"), 1, "Created");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.events.create(conn, &event).await.unwrap();

    event.event_data = serde_json::json!({ "corrected": true });
    stores.events.update(conn, &event).await.expect("update should succeed");

    let found = stores
        .events
        .find_by_id(conn, &tenant, &event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.event_data, serde_json::json!({ "corrected": true }));

    let mut missing = make_event(&tenant, &unique("order"), 1, "Created");
    missing.id = unique("missing");
    assert!(stores.events.update(conn, &missing).await.is_err());
}

pub async fn test_event_delete_by_aggregate_id<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let keep = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    for event in make_events(&tenant, &aggregate_id, 3) {
        stores.events.create(conn, &event).await.unwrap();
    }
    for event in make_events(&tenant, &keep, 2) {
        stores.events.create(conn, &event).await.unwrap();
    }

    stores
        .events
        .delete_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap();

    let gone = stores
        .events
        .find_by_aggregate_id(conn, &tenant, &aggregate_id, AGGREGATE_TYPE)
        .await
        .unwrap();
    assert!(gone.is_empty());
    let kept = stores
        .events
        .find_by_aggregate_id(conn, &tenant, &keep, AGGREGATE_TYPE)
        .await
        .unwrap();
    assert_eq!(kept.len(), 2);
}

pub async fn test_event_find_paging<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    for event in make_events(&tenant, &aggregate_id, 5) {
        stores.events.create(conn, &event).await.unwrap();
    }
    // Same aggregate id under another tenant must never leak in.
    for event in make_events(&unique("tenant"), &aggregate_id, 5) {
        stores.events.create(conn, &event).await.unwrap();
    }

    let query = PagingQuery::new(&tenant)
        .with_filter(format!("aggregateId=='{aggregate_id}' and sequenceNumber>=2"))
        .with_sort("sequenceNumber:desc")
        .with_page(0, 3)
        .with_total_rows(true);
    let page = stores.events.find_paging(conn, &query).await.unwrap();

    assert!(page.is_found);
    assert_eq!(page.total_rows, Some(4));
    assert_eq!(page.total_pages, Some(2));
    let sequences: Vec<u64> = page.data.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![5, 4, 3]);
    assert!(page.data.iter().all(|e| e.tenant_id == tenant));

    let second = stores
        .events
        .find_paging(conn, &query.clone().with_page(1, 3))
        .await
        .unwrap();
    let sequences: Vec<u64> = second.data.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![2]);

    let in_list = PagingQuery::new(&tenant)
        .with_filter("eventType=in=('Event1','Event3')")
        .with_sort("sequenceNumber");
    let page = stores.events.find_paging(conn, &in_list).await.unwrap();
    let sequences: Vec<u64> = page.data.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![1, 3]);
    assert_eq!(page.total_rows, None);

    let nothing = PagingQuery::new(&tenant).with_filter("eventType=='Nope'");
    let page = stores.events.find_paging(conn, &nothing).await.unwrap();
    assert!(!page.is_found);
}

pub async fn test_event_find_paging_bad_filter<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let mut handle = session.acquire().await.expect("acquire");
    let query = PagingQuery::new(unique("tenant")).with_filter("eventType==");
    let result = stores.events.find_paging(&mut *handle, &query).await;
    assert!(
        matches!(
            result,
            Err(StorageError::Parse { .. }) | Err(StorageError::Lex { .. })
        ),
        "incomplete filter should be rejected, got {result:?}"
    );
}

/// Run all EventStore contract tests.
#[macro_export]
macro_rules! run_event_store_tests {
    ($session:expr, $stores:expr) => {
        use $crate::storage::event_store_tests::*;

        test_event_create_and_find_by_id($session, $stores).await;
        println!("  test_event_create_and_find_by_id: PASSED");

        test_event_validation_rejects_before_write($session, $stores).await;
        println!("  test_event_validation_rejects_before_write: PASSED");

        test_event_duplicate_sequence($session, $stores).await;
        println!("  test_event_duplicate_sequence: PASSED");

        test_event_duplicate_event_id($session, $stores).await;
        println!("  test_event_duplicate_event_id: PASSED");

        test_event_find_by_sequence_number($session, $stores).await;
        println!("  test_event_find_by_sequence_number: PASSED");

        test_event_update($session, $stores).await;
        println!("  test_event_update: PASSED");

        test_event_delete_by_aggregate_id($session, $stores).await;
        println!("  test_event_delete_by_aggregate_id: PASSED");

        test_event_find_paging($session, $stores).await;
        println!("  test_event_find_paging: PASSED");

        test_event_find_paging_bad_filter($session, $stores).await;
        println!("  test_event_find_paging_bad_filter: PASSED");
    };
}
