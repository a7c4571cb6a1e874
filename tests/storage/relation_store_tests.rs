//! RelationStore contract tests.

use eventstorage::paging::PagingQuery;
use eventstorage::storage::{Session, Stores};
use eventstorage::StorageError;

use super::{make_relations, unique, AGGREGATE_TYPE};

pub async fn test_relation_ensure_target<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    let name = stores
        .relations
        .ensure_target(conn, AGGREGATE_TYPE)
        .await
        .expect("ensure_target should succeed");
    assert_eq!(name, "rel_order_item");

    // Idempotent.
    let again = stores
        .relations
        .ensure_target(conn, AGGREGATE_TYPE)
        .await
        .unwrap();
    assert_eq!(again, name);

    let invalid = stores.relations.ensure_target(conn, "Order; drop").await;
    assert!(matches!(invalid, Err(StorageError::InvalidTargetName(_))));
}

pub async fn test_relation_empty_batch_is_noop<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let mut handle = session.acquire().await.expect("acquire");
    stores
        .relations
        .create_many(&mut *handle, &unique("tenant"), &[])
        .await
        .expect("empty batch is not an error");
}

pub async fn test_relation_invalid_batch_rejected<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut relations = make_relations(&tenant, &aggregate_id, "c-1");
    relations[1].aggregate_id.clear();
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.relations.ensure_target(conn, AGGREGATE_TYPE).await.unwrap();

    let result = stores.relations.create_many(conn, &tenant, &relations).await;
    assert!(matches!(
        result,
        Err(StorageError::Validation { field: "aggregate_id", .. })
    ));

    let page = stores
        .relations
        .find_paging(conn, AGGREGATE_TYPE, &PagingQuery::new(&tenant))
        .await
        .unwrap();
    assert!(!page.is_found, "no row of a rejected batch is written");
}

pub async fn test_relation_create_and_find<S: Session>(session: &S, stores: &Stores<S::Conn>) {
    let tenant = unique("tenant");
    let (first, second) = (unique("order"), unique("order"));
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.relations.ensure_target(conn, AGGREGATE_TYPE).await.unwrap();

    stores
        .relations
        .create_many(conn, &tenant, &make_relations(&tenant, &first, "c-1"))
        .await
        .unwrap();
    stores
        .relations
        .create_many(conn, &tenant, &make_relations(&tenant, &second, "c-2"))
        .await
        .unwrap();
    stores
        .relations
        .create_many(conn, &tenant, &make_relations(&unique("tenant"), &first, "c-1"))
        .await
        .unwrap();

    let query = PagingQuery::new(&tenant)
        .with_filter("relName=='customer_id' and relValue=='c-1'")
        .with_total_rows(true);
    let page = stores
        .relations
        .find_paging(conn, AGGREGATE_TYPE, &query)
        .await
        .unwrap();
    assert_eq!(page.total_rows, Some(1));
    assert_eq!(page.data[0].aggregate_id, first);
    assert_eq!(page.data[0].table_name, "rel_order_item");

    let warehouse = PagingQuery::new(&tenant)
        .with_filter("relName=='warehouse'")
        .with_sort("aggregateId");
    let page = stores
        .relations
        .find_paging(conn, AGGREGATE_TYPE, &warehouse)
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
}

pub async fn test_relation_delete_by_aggregate_id<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let aggregate_id = unique("order");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;
    stores.relations.ensure_target(conn, AGGREGATE_TYPE).await.unwrap();
    stores
        .relations
        .create_many(conn, &tenant, &make_relations(&tenant, &aggregate_id, "c-9"))
        .await
        .unwrap();

    stores
        .relations
        .delete_by_aggregate_id(conn, &tenant, &aggregate_id, AGGREGATE_TYPE)
        .await
        .unwrap();

    let page = stores
        .relations
        .find_paging(conn, AGGREGATE_TYPE, &PagingQuery::new(&tenant))
        .await
        .unwrap();
    assert!(!page.is_found);
}

/// Run all RelationStore contract tests.
pub async fn test_relation_unknown_type_is_empty<S: Session>(
    session: &S,
    stores: &Stores<S::Conn>,
) {
    let tenant = unique("tenant");
    let mut handle = session.acquire().await.expect("acquire");
    let conn = &mut *handle;

    let page = stores
        .relations
        .find_paging(conn, "NeverRelated", &PagingQuery::new(&tenant).with_total_rows(true))
        .await
        .expect("paging over an unknown type should succeed");
    assert!(!page.is_found);
    assert_eq!(page.total_rows, Some(0));

    stores
        .relations
        .delete_by_aggregate_id(conn, &tenant, &unique("order"), "NeverRelated")
        .await
        .expect("delete over an unknown type should succeed");
}

#[macro_export]
macro_rules! run_relation_store_tests {
    ($session:expr, $stores:expr) => {
        use $crate::storage::relation_store_tests::*;

        test_relation_ensure_target($session, $stores).await;
        println!("  test_relation_ensure_target: PASSED");

        test_relation_empty_batch_is_noop($session, $stores).await;
        println!("  test_relation_empty_batch_is_noop: PASSED");

        test_relation_invalid_batch_rejected($session, $stores).await;
        println!("  test_relation_invalid_batch_rejected: PASSED");

        test_relation_create_and_find($session, $stores).await;
        println!("  test_relation_create_and_find: PASSED");

        test_relation_delete_by_aggregate_id($session, $stores).await;
        println!("  test_relation_delete_by_aggregate_id: PASSED");

        test_relation_unknown_type_is_empty($session, $stores).await;
        println!("  test_relation_unknown_type_is_empty: PASSED");
    };
}
