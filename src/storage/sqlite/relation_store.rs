//! SQLite RelationStore implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_query::{Alias, Condition, Expr, Query, SimpleExpr, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info};

use super::dao::{get_bool, get_text, SqlRecord, SqlTable};
use super::execute_ddl;
use crate::error::Result;
use crate::model::Relation;
use crate::paging::{PagingQuery, PagingResult};
use crate::rsql::as_target_name;
use crate::storage::schema::{relation_table, RelationColumn};
use crate::storage::{RelationStore, TargetCache};

impl SqlRecord for Relation {
    type Column = RelationColumn;

    const ID: RelationColumn = RelationColumn::Id;
    const TENANT_ID: RelationColumn = RelationColumn::TenantId;

    fn columns() -> Vec<RelationColumn> {
        use RelationColumn::*;
        vec![
            Id,
            TenantId,
            TableName,
            AggregateId,
            AggregateType,
            EventId,
            EventType,
            IsDeleted,
            RelName,
            RelValue,
        ]
    }

    fn values(&self) -> Result<Vec<SimpleExpr>> {
        Ok(vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.table_name.clone().into(),
            self.aggregate_id.clone().into(),
            self.aggregate_type.clone().into(),
            self.event_id.clone().into(),
            self.event_type.clone().into(),
            self.is_deleted.into(),
            self.rel_name.clone().into(),
            self.rel_value.clone().into(),
        ])
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            tenant_id: get_text(row, "tenant_id")?,
            table_name: get_text(row, "table_name")?,
            aggregate_id: get_text(row, "aggregate_id")?,
            aggregate_type: get_text(row, "aggregate_type")?,
            event_id: get_text(row, "event_id")?,
            event_type: get_text(row, "event_type")?,
            is_deleted: get_bool(row, "is_deleted")?,
            rel_name: get_text(row, "rel_name")?,
            rel_value: get_text(row, "rel_value")?,
        })
    }
}

/// SQLite implementation of RelationStore: one table per aggregate type.
#[derive(Default)]
pub struct SqliteRelationStore {
    targets: TargetCache<String>,
}

impl SqliteRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `table` exists without recording it in the cache.
    ///
    /// Used on paths that may run inside a transaction: a table created
    /// there vanishes on rollback, so only [`RelationStore::ensure_target`]
    /// populates the cache.
    async fn prepare(&self, conn: &mut SqliteConnection, table: &str) -> Result<()> {
        if self.targets.get(table).await.is_none() {
            execute_ddl(conn, relation_table(table)).await?;
        }
        Ok(())
    }

    /// Whether `table` exists, without creating it.
    async fn exists(&self, conn: &mut SqliteConnection, table: &str) -> Result<bool> {
        if self.targets.get(table).await.is_some() {
            return Ok(true);
        }
        let (sql, values) = Query::select()
            .expr_as(Expr::cust("count(*)"), Alias::new("total"))
            .from(Alias::new("sqlite_master"))
            .and_where(Expr::col(Alias::new("type")).eq("table"))
            .and_where(Expr::col(Alias::new("name")).eq(table))
            .build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_with(&sql, values).fetch_one(&mut *conn).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total > 0)
    }
}

#[async_trait]
impl RelationStore<SqliteConnection> for SqliteRelationStore {
    async fn ensure_target(
        &self,
        conn: &mut SqliteConnection,
        aggregate_type: &str,
    ) -> Result<String> {
        let table = as_target_name(aggregate_type)?;
        let name = table.clone();
        self.targets
            .get_or_create(&table, || async move {
                execute_ddl(conn, relation_table(&name)).await?;
                info!(table = %name, "Relation table ready");
                Ok(name)
            })
            .await
    }

    async fn create_many(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        relations: &[Relation],
    ) -> Result<()> {
        if relations.is_empty() {
            return Ok(());
        }
        for relation in relations {
            crate::model::Entity::validate(relation)?;
        }

        let mut by_table: BTreeMap<&str, Vec<Relation>> = BTreeMap::new();
        for relation in relations {
            by_table
                .entry(relation.table_name.as_str())
                .or_default()
                .push(relation.clone());
        }
        for (table, rows) in by_table {
            self.prepare(conn, table).await?;
            SqlTable::<Relation>::new(table)
                .insert_many(conn, &rows)
                .await?;
        }

        debug!(tenant_id = %tenant_id, count = relations.len(), "Relations stored");
        Ok(())
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<()> {
        let table = as_target_name(aggregate_type)?;
        if !self.exists(conn, &table).await? {
            return Ok(());
        }
        let condition = Condition::all()
            .add(Expr::col(RelationColumn::TenantId).eq(tenant_id))
            .add(Expr::col(RelationColumn::AggregateId).eq(aggregate_id));
        SqlTable::<Relation>::new(table)
            .delete(conn, condition)
            .await?;
        Ok(())
    }

    async fn find_paging(
        &self,
        conn: &mut SqliteConnection,
        aggregate_type: &str,
        query: &PagingQuery,
    ) -> Result<PagingResult<Relation>> {
        let table = as_target_name(aggregate_type)?;
        if !self.exists(conn, &table).await? {
            // Nothing was ever related for this type.
            query.sort_fields()?;
            let total_rows = query.is_total_rows.then_some(0);
            return PagingResult::new(query, Vec::new(), total_rows);
        }
        SqlTable::<Relation>::new(table)
            .find_paging(conn, query)
            .await
    }
}
