//! Generic table access shared by the SQLite stores.
//!
//! Each record type describes its columns and row mapping once through
//! [`SqlRecord`]; [`SqlTable`] supplies the CRUD and paging statements.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sea_query::{
    Alias, Asterisk, Condition, Expr, Iden, Order, Query, SimpleExpr, SqliteQueryBuilder,
};
use sea_query_binder::SqlxBinder;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::model::{timestamp, Entity};
use crate::paging::{PagingQuery, PagingResult, SortOrder};
use crate::rsql::sql::column_ref;
use crate::rsql::{compile, SqlFilterVisitor};

/// A record stored in one SQL table.
pub(crate) trait SqlRecord: Entity + Sized {
    type Column: Iden + Copy + 'static;

    const ID: Self::Column;
    const TENANT_ID: Self::Column;

    /// Insert column order; [`SqlRecord::values`] follows it.
    fn columns() -> Vec<Self::Column>;

    fn values(&self) -> Result<Vec<SimpleExpr>>;

    fn from_row(row: &SqliteRow) -> Result<Self>;
}

/// One physical table holding records of type `T`.
pub(crate) struct SqlTable<T> {
    name: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: SqlRecord> SqlTable<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> Alias {
        Alias::new(&self.name)
    }

    /// Condition matching one record by tenant and id.
    pub fn by_id(tenant_id: &str, id: &str) -> Condition {
        Condition::all()
            .add(Expr::col(T::TENANT_ID).eq(tenant_id))
            .add(Expr::col(T::ID).eq(id))
    }

    /// Validate and insert `records` in one statement. Empty input is a no-op.
    pub async fn insert_many(&self, conn: &mut SqliteConnection, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            record.validate()?;
        }

        let mut insert = Query::insert();
        insert.into_table(self.table()).columns(T::columns());
        for record in records {
            insert.values_panic(record.values()?);
        }
        let (sql, values) = insert.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&mut *conn).await?;

        debug!(table = %self.name, kind = T::KIND, count = records.len(), "Records inserted");
        Ok(())
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, record: &T) -> Result<()> {
        self.insert_many(conn, std::slice::from_ref(record)).await
    }

    /// Replace every column of the record with the same tenant and id.
    pub async fn update(&self, conn: &mut SqliteConnection, record: &T) -> Result<()> {
        record.validate()?;
        let assignments: Vec<(T::Column, SimpleExpr)> =
            T::columns().into_iter().zip(record.values()?).collect();

        let (sql, values) = Query::update()
            .table(self.table())
            .values(assignments)
            .cond_where(Self::by_id(record.tenant_id(), record.id()))
            .build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values).execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::InvalidRequest(format!(
                "{} '{}' not found",
                T::KIND,
                record.id()
            )));
        }
        debug!(table = %self.name, id = %record.id(), "Record updated");
        Ok(())
    }

    /// Apply `assignments` and return the updated row.
    pub async fn update_returning(
        &self,
        conn: &mut SqliteConnection,
        assignments: Vec<(T::Column, SimpleExpr)>,
        condition: Condition,
    ) -> Result<Option<T>> {
        let (sql, values) = Query::update()
            .table(self.table())
            .values(assignments)
            .cond_where(condition)
            .returning_all()
            .build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(T::from_row).transpose()
    }

    pub async fn find_one(
        &self,
        conn: &mut SqliteConnection,
        condition: Condition,
    ) -> Result<Option<T>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(self.table())
            .cond_where(condition)
            .limit(1)
            .build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(T::from_row).transpose()
    }

    pub async fn find_many(
        &self,
        conn: &mut SqliteConnection,
        condition: Condition,
        order_by: Option<(T::Column, Order)>,
        limit: Option<u64>,
    ) -> Result<Vec<T>> {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(self.table())
            .cond_where(condition);
        if let Some((column, order)) = order_by {
            select.order_by(column, order);
        }
        if let Some(limit) = limit {
            select.limit(limit);
        }
        let (sql, values) = select.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&mut *conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Delete matching rows; returns how many were removed.
    pub async fn delete(&self, conn: &mut SqliteConnection, condition: Condition) -> Result<u64> {
        let (sql, values) = Query::delete()
            .from_table(self.table())
            .cond_where(condition)
            .build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values).execute(&mut *conn).await?;
        debug!(table = %self.name, deleted = result.rows_affected(), "Records deleted");
        Ok(result.rows_affected())
    }

    /// Filter, sort and page through the table within one tenant.
    pub async fn find_paging(
        &self,
        conn: &mut SqliteConnection,
        query: &PagingQuery,
    ) -> Result<PagingResult<T>> {
        let filter = compile(&query.filter, SqlFilterVisitor::new(), &query.tenant_id)?;
        let condition = Expr::cust_with_values(filter.sql, filter.values);

        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(self.table())
            .and_where(condition.clone());
        for field in query.sort_fields()? {
            let order = match field.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            select.order_by_expr(Expr::cust(column_ref(&field.field)), order);
        }
        if let Some((limit, offset)) = query.window() {
            select.limit(limit).offset(offset);
        }

        let (sql, values) = select.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&mut *conn).await?;
        let data = rows.iter().map(T::from_row).collect::<Result<Vec<_>>>()?;

        let total_rows = if query.is_total_rows {
            let (sql, values) = Query::select()
                .expr_as(Expr::cust("count(*)"), Alias::new("total"))
                .from(self.table())
                .and_where(condition)
                .build_sqlx(SqliteQueryBuilder);
            let row = sqlx::query_with(&sql, values).fetch_one(&mut *conn).await?;
            Some(to_u64(row.try_get("total")?))
        } else {
            None
        };

        debug!(
            table = %self.name,
            tenant_id = %query.tenant_id,
            rows = data.len(),
            "Paged query executed"
        );
        PagingResult::new(query, data, total_rows)
    }
}

/// Replace a unique-constraint violation with `mapped()`.
pub(crate) fn on_unique_violation(
    err: StorageError,
    mapped: impl FnOnce() -> StorageError,
) -> StorageError {
    match &err {
        StorageError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => mapped(),
        _ => err,
    }
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

pub(crate) fn get_text(row: &SqliteRow, column: &str) -> Result<String> {
    Ok(row.try_get(column)?)
}

pub(crate) fn get_u64(row: &SqliteRow, column: &str) -> Result<u64> {
    Ok(to_u64(row.try_get(column)?))
}

pub(crate) fn get_bool(row: &SqliteRow, column: &str) -> Result<bool> {
    Ok(row.try_get(column)?)
}

pub(crate) fn get_json<V: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<V> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn get_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    timestamp::parse(&raw).ok_or_else(|| {
        StorageError::Database(sqlx::Error::Decode(
            format!("invalid timestamp '{raw}' in column {column}").into(),
        ))
    })
}
