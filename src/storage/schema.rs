//! Column identifiers for the SQL tables.
//!
//! Table names are configurable, so they are supplied at runtime as
//! `Alias`es; only the column sets are fixed here.

use sea_query::{Alias, ColumnDef, Iden, Index, IndexCreateStatement, Table, TableCreateStatement};

#[derive(Iden, Clone, Copy)]
pub enum AggregateColumn {
    Id,
    TenantId,
    AggregateId,
    AggregateType,
    SequenceNumber,
    Deleted,
}

#[derive(Iden, Clone, Copy)]
pub enum EventColumn {
    Id,
    TenantId,
    CommandId,
    EventId,
    AggregateId,
    AggregateType,
    EventType,
    EventVersion,
    SequenceNumber,
    EventData,
    Metadata,
    Topic,
    PubsubName,
    TimeStamp,
}

#[derive(Iden, Clone, Copy)]
pub enum SnapshotColumn {
    Id,
    TenantId,
    AggregateId,
    AggregateType,
    SequenceNumber,
    AggregateData,
    AggregateVersion,
    Metadata,
    TimeStamp,
}

#[derive(Iden, Clone, Copy)]
pub enum RelationColumn {
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
}

#[derive(Iden, Clone, Copy)]
pub enum MessageColumn {
    Id,
    TenantId,
    AggregateId,
    EventId,
    CreateTime,
    RetryCount,
    Event,
}

fn text(column: impl Iden + 'static) -> ColumnDef {
    ColumnDef::new(column).text().not_null().to_owned()
}

fn integer(column: impl Iden + 'static) -> ColumnDef {
    ColumnDef::new(column).big_integer().not_null().default(0).to_owned()
}

fn boolean(column: impl Iden + 'static) -> ColumnDef {
    ColumnDef::new(column).boolean().not_null().default(false).to_owned()
}

fn index(name: String, table: &str) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(name)
        .table(Alias::new(table))
        .to_owned()
}

/// DDL for the aggregate table.
pub fn aggregate_table(table: &str) -> (TableCreateStatement, Vec<IndexCreateStatement>) {
    use AggregateColumn::*;
    let create = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Id).text().not_null().primary_key())
        .col(text(TenantId))
        .col(text(AggregateId))
        .col(text(AggregateType))
        .col(integer(SequenceNumber))
        .col(boolean(Deleted))
        .to_owned();
    let unique = index(format!("ux_{table}_aggregate"), table)
        .col(TenantId)
        .col(AggregateId)
        .unique()
        .to_owned();
    (create, vec![unique])
}

/// DDL for the event table.
pub fn event_table(table: &str) -> (TableCreateStatement, Vec<IndexCreateStatement>) {
    use EventColumn::*;
    let create = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Id).text().not_null().primary_key())
        .col(text(TenantId))
        .col(text(CommandId))
        .col(text(EventId))
        .col(text(AggregateId))
        .col(text(AggregateType))
        .col(text(EventType))
        .col(text(EventVersion))
        .col(integer(SequenceNumber))
        .col(text(EventData))
        .col(text(Metadata))
        .col(text(Topic))
        .col(text(PubsubName))
        .col(text(TimeStamp))
        .to_owned();
    let sequence = index(format!("ux_{table}_sequence"), table)
        .col(TenantId)
        .col(AggregateId)
        .col(SequenceNumber)
        .unique()
        .to_owned();
    let event_id = index(format!("ux_{table}_event_id"), table)
        .col(EventId)
        .unique()
        .to_owned();
    (create, vec![sequence, event_id])
}

/// DDL for the snapshot table.
pub fn snapshot_table(table: &str) -> (TableCreateStatement, Vec<IndexCreateStatement>) {
    use SnapshotColumn::*;
    let create = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Id).text().not_null().primary_key())
        .col(text(TenantId))
        .col(text(AggregateId))
        .col(text(AggregateType))
        .col(integer(SequenceNumber))
        .col(text(AggregateData))
        .col(text(AggregateVersion))
        .col(text(Metadata))
        .col(text(TimeStamp))
        .to_owned();
    let lookup = index(format!("ix_{table}_sequence"), table)
        .col(TenantId)
        .col(AggregateId)
        .col(SequenceNumber)
        .to_owned();
    (create, vec![lookup])
}

/// DDL for one relation table.
pub fn relation_table(table: &str) -> (TableCreateStatement, Vec<IndexCreateStatement>) {
    use RelationColumn::*;
    let create = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Id).text().not_null().primary_key())
        .col(text(TenantId))
        .col(text(TableName))
        .col(text(AggregateId))
        .col(text(AggregateType))
        .col(text(EventId))
        .col(text(EventType))
        .col(boolean(IsDeleted))
        .col(text(RelName))
        .col(text(RelValue))
        .to_owned();
    let by_value = index(format!("ix_{table}_rel"), table)
        .col(TenantId)
        .col(RelName)
        .col(RelValue)
        .to_owned();
    let by_aggregate = index(format!("ix_{table}_aggregate"), table)
        .col(TenantId)
        .col(AggregateId)
        .to_owned();
    (create, vec![by_value, by_aggregate])
}

/// DDL for the outbox table.
pub fn message_table(table: &str) -> (TableCreateStatement, Vec<IndexCreateStatement>) {
    use MessageColumn::*;
    let create = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Id).text().not_null().primary_key())
        .col(text(TenantId))
        .col(text(AggregateId))
        .col(text(EventId))
        .col(text(CreateTime))
        .col(integer(RetryCount))
        .col(text(Event))
        .to_owned();
    let recovery = index(format!("ix_{table}_create_time"), table)
        .col(CreateTime)
        .to_owned();
    (create, vec![recovery])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::SqliteQueryBuilder;

    #[test]
    fn test_event_table_has_unique_sequence_index() {
        let (create, indexes) = event_table("ddd_event");
        let sql = create.to_string(SqliteQueryBuilder);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"ddd_event\""));
        assert!(sql.contains("\"pubsub_name\" text NOT NULL"));

        let index = indexes[0].to_string(SqliteQueryBuilder);
        assert!(index.contains("UNIQUE"));
        assert!(index.contains("\"tenant_id\", \"aggregate_id\", \"sequence_number\""));
    }

    #[test]
    fn test_relation_table_named_by_argument() {
        let (create, _) = relation_table("sale_order");
        assert!(create
            .to_string(SqliteQueryBuilder)
            .contains("\"sale_order\""));
    }
}
