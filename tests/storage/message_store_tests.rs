//! MessageStore contract tests.

use std::time::Duration;

use eventstorage::model::timestamp;
use eventstorage::storage::{Session, Stores};

use super::{make_message, unique};

const ALL: u64 = 10_000;

pub async fn test_message_create_and_delete<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let message = make_message(&tenant, &unique("order"));
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores.messages.create(conn, &message).await.expect("create should succeed");
    let pending = stores.messages.find_all(conn, ALL).await.unwrap();
    let ours: Vec<_> = pending.iter().filter(|m| m.tenant_id == tenant).collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(*ours[0], message, "message should round-trip with its event");

    stores
        .messages
        .delete(conn, &tenant, &message.id)
        .await
        .unwrap();
    let pending = stores.messages.find_all(conn, ALL).await.unwrap();
    assert!(pending.iter().all(|m| m.tenant_id != tenant));
}

pub async fn test_message_duplicate<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let message = make_message(&tenant, &unique("order"));
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    stores.messages.create(conn, &message).await.unwrap();
    let result = stores.messages.create(conn, &message).await;
    assert!(matches!(result, Err(ref e) if e.is_duplicate()), "got {result:?}");
}

pub async fn test_message_find_all_oldest_first<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let message = make_message(&tenant, &aggregate_id);
        stores.messages.create(conn, &message).await.unwrap();
        ids.push(message.id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let pending = stores.messages.find_all(conn, ALL).await.unwrap();
    let ours: Vec<String> = pending
        .into_iter()
        .filter(|m| m.tenant_id == tenant)
        .map(|m| m.id)
        .collect();
    assert_eq!(ours, ids);
}

pub async fn test_message_find_pending_and_retry<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let message = make_message(&tenant, &unique("order"));
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.messages.create(conn, &message).await.unwrap();

    let later = timestamp::now() + chrono::Duration::seconds(1);
    let earlier = message.create_time - chrono::Duration::seconds(1);
    let ours = |messages: Vec<eventstorage::model::Message>| {
        messages
            .into_iter()
            .filter(|m| m.tenant_id == tenant)
            .collect::<Vec<_>>()
    };

    let too_young = stores
        .messages
        .find_pending(conn, earlier, 2, ALL)
        .await
        .unwrap();
    assert!(ours(too_young).is_empty());

    let eligible = ours(stores.messages.find_pending(conn, later, 2, ALL).await.unwrap());
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].retry_count, 0);

    stores
        .messages
        .increment_retry(conn, &tenant, &message.id)
        .await
        .unwrap();
    let eligible = ours(stores.messages.find_pending(conn, later, 2, ALL).await.unwrap());
    assert_eq!(eligible[0].retry_count, 1);

    stores
        .messages
        .increment_retry(conn, &tenant, &message.id)
        .await
        .unwrap();
    let exhausted = ours(stores.messages.find_pending(conn, later, 2, ALL).await.unwrap());
    assert!(exhausted.is_empty(), "messages at max_retries are skipped");
}

pub async fn test_message_delete_by_aggregate_id<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    for _ in 0..2 {
        stores
            .messages
            .create(conn, &make_message(&tenant, &aggregate_id))
            .await
            .unwrap();
    }
    let other = make_message(&tenant, &unique("order"));
    stores.messages.create(conn, &other).await.unwrap();

    stores
        .messages
        .delete_by_aggregate_id(conn, &tenant, &aggregate_id)
        .await
        .unwrap();

    let left: Vec<String> = stores
        .messages
        .find_all(conn, ALL)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.tenant_id == tenant)
        .map(|m| m.id)
        .collect();
    assert_eq!(left, vec![other.id]);
}

/// Run all MessageStore contract tests.
#[macro_export]
macro_rules! run_message_store_tests {
    ($session:expr, $stores:expr) => {
        use $crate::storage::message_store_tests::*;

        test_message_create_and_delete($session, $stores).await;
        println!("  test_message_create_and_delete: PASSED");

        test_message_duplicate($session, $stores).await;
        println!("  test_message_duplicate: PASSED");

        test_message_find_all_oldest_first($session, $stores).await;
        println!("  test_message_find_all_oldest_first: PASSED");

        test_message_find_pending_and_retry($session, $stores).await;
        println!("  test_message_find_pending_and_retry: PASSED");

        test_message_delete_by_aggregate_id($session, $stores).await;
        println!("  test_message_delete_by_aggregate_id: PASSED");
    };
}
