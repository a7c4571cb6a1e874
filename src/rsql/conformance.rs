//! Cross-backend checks: the SQL and MongoDB compilers must agree on which
//! fields a filter touches, how many values it binds, and tenant scoping.

use mongodb::bson::{Bson, Document};
use sea_query::Value as SqlValue;

use super::mongo::MongoFilterVisitor;
use super::sql::{SqlFilter, SqlFilterVisitor};
use super::{compile, normalize};

const TENANT: &str = "t1";

const FILTERS: &[&str] = &[
    "aggregateId=='a-1'",
    "id!='x' and sequenceNumber>3",
    "(eventType=='Created' or eventType=='Priced') and sequenceNumber<=10",
    "eventType=in=('Created','Priced') or deleted==false",
    "aggregateType=out=('A','B','C')",
    "eventData.userName==~'bo' and metadata.traceId!=~'x.y'",
    "relValue==~'a_c' or relValue!=~'x%y'",
    "timeStamp>=2024-01-02T08:00:00+08:00 and timeStamp<2024-02-01",
    "((a==1 or b==2) and (c==3 or d=in=(4,5)))",
    "",
];

fn sql(source: &str) -> SqlFilter {
    compile(source, SqlFilterVisitor::new(), TENANT).unwrap()
}

fn mongo(source: &str) -> Document {
    compile(source, MongoFilterVisitor::new(), TENANT).unwrap()
}

/// Fields referenced by a SQL condition in textual order, with
/// `json_extract` paths dotted.
fn sql_fields(filter: &SqlFilter) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = filter.sql.as_str();
    while let Some(start) = rest.find('"') {
        let before = &rest[..start];
        let after = &rest[start + 1..];
        let end = after.find('"').unwrap();
        let column = &after[..end];
        rest = &after[end + 1..];

        if before.ends_with("json_extract(") {
            let path_start = rest.find("'$.").unwrap() + 3;
            let path_end = path_start + rest[path_start..].find('\'').unwrap();
            fields.push(format!("{column}.{}", &rest[path_start..path_end]));
            rest = &rest[path_end + 1..];
        } else {
            fields.push(column.to_string());
        }
    }
    fields
}

/// Fields referenced by a MongoDB filter in depth-first order, with `_id`
/// reported as `id`.
fn mongo_fields(filter: &Document, fields: &mut Vec<String>) {
    for (key, value) in filter {
        if let Some(operator) = key.strip_prefix('$') {
            if let Bson::Array(items) = value {
                debug_assert!(operator == "and" || operator == "or");
                for item in items {
                    if let Bson::Document(item) = item {
                        mongo_fields(item, fields);
                    }
                }
            }
        } else if key == "_id" {
            fields.push("id".to_string());
        } else {
            fields.push(key.clone());
        }
    }
}

/// Number of values a MongoDB filter compares against.
fn mongo_values(filter: &Document) -> usize {
    filter
        .iter()
        .map(|(key, value)| match (key.as_str(), value) {
            ("$and" | "$or", Bson::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(item) => mongo_values(item),
                    _ => 0,
                })
                .sum(),
            (_, Bson::Document(condition)) => condition_values(condition),
            _ => 1,
        })
        .sum()
}

fn condition_values(condition: &Document) -> usize {
    condition
        .iter()
        .map(|(operator, value)| match (operator.as_str(), value) {
            ("$options", _) => 0,
            ("$not", Bson::Document(inner)) => condition_values(inner),
            (_, Bson::Array(items)) => items.len(),
            _ => 1,
        })
        .sum()
}

#[test]
fn test_backends_visit_fields_in_the_same_order() {
    for source in FILTERS {
        let mut from_mongo = Vec::new();
        mongo_fields(&mongo(source), &mut from_mongo);
        assert_eq!(sql_fields(&sql(source)), from_mongo, "filter: {source}");
    }
}

#[test]
fn test_backends_bind_the_same_number_of_values() {
    for source in FILTERS {
        assert_eq!(
            sql(source).values.len(),
            mongo_values(&mongo(source)),
            "filter: {source}"
        );
    }
}

#[test]
fn test_backends_scope_to_tenant() {
    for source in FILTERS {
        let sql = sql(source);
        assert!(sql.sql.ends_with("\"tenant_id\" = ?"), "filter: {source}");
        assert_eq!(sql.values.last(), Some(&SqlValue::from(TENANT.to_string())));

        let mongo = mongo(source);
        let tenant = match mongo.get_array("$and") {
            Ok(items) => items.last().and_then(Bson::as_document).cloned(),
            Err(_) => Some(mongo.clone()),
        };
        assert_eq!(
            tenant.and_then(|t| t.get_str("tenant_id").ok().map(str::to_string)),
            Some(TENANT.to_string()),
            "filter: {source}"
        );
    }
}

#[test]
fn test_canonical_text_compiles_identically() {
    for source in FILTERS {
        let canonical = normalize(source).unwrap();
        assert_eq!(sql(&canonical), sql(source), "filter: {source}");
        assert_eq!(mongo(&canonical), mongo(source), "filter: {source}");
    }
}

/// Drop one level of backslash escaping.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

#[test]
fn test_like_matches_the_same_literal() {
    for (source, literal) in [
        ("relValue==~'a_c'", "a_c"),
        ("relValue==~'x%y'", "x%y"),
        ("relValue==~'a.b*'", "a.b*"),
    ] {
        let sql = sql(source);
        let pattern = match &sql.values[0] {
            SqlValue::String(Some(pattern)) => pattern.as_str().to_string(),
            other => panic!("unexpected bind value {other:?}"),
        };
        let inner = pattern
            .strip_prefix('%')
            .and_then(|p| p.strip_suffix('%'))
            .unwrap();
        assert_eq!(unescape(inner), literal, "filter: {source}");
        assert!(sql.sql.contains("like ? escape '\\'"), "filter: {source}");

        let mongo = mongo(source);
        let clause = mongo.get_array("$and").unwrap()[0].as_document().unwrap();
        let regex = clause
            .get_document("rel_value")
            .unwrap()
            .get_str("$regex")
            .unwrap();
        assert_eq!(unescape(regex), literal, "filter: {source}");
    }
}
