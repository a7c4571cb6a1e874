//! MongoDB filter compiler.
//!
//! Builds a nested `$and`/`$or` document. `id` addresses the `_id` primary
//! key; like/not-like become case-insensitive regexes over the escaped
//! literal so they match the SQL `%value%` semantics.

use chrono::Utc;
use mongodb::bson::{doc, Bson, Document};

use super::ast::{Comparator, Value};
use super::visitor::{Process, Visitor};
use crate::model::timestamp;

/// Visitor producing a MongoDB filter document.
#[derive(Debug, Default)]
pub struct MongoFilterVisitor {
    /// Open `$and`/`$or` frames, innermost last.
    frames: Vec<Vec<Document>>,
    root: Option<Document>,
}

impl MongoFilterVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, clause: Document) {
        match self.frames.last_mut() {
            Some(frame) => frame.push(clause),
            None => self.root = Some(clause),
        }
    }

    fn close(&mut self, operator: &str) {
        let items = self.frames.pop().unwrap_or_default();
        self.push(doc! { operator: items });
    }
}

/// Stored field name for a mapped filter field.
pub fn mongo_field(field: &str) -> String {
    if field == "id" {
        "_id".to_string()
    } else {
        field.to_string()
    }
}

pub(crate) fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Integer(i) => Bson::Int64(*i),
        Value::Double(d) => Bson::Double(*d),
        Value::Boolean(b) => Bson::Boolean(*b),
        Value::String(s) => Bson::String(s.clone()),
        Value::Date(d) => Bson::String(timestamp::format_date(d)),
        Value::DateTime(dt) => Bson::String(timestamp::format(&dt.with_timezone(&Utc))),
        Value::List(items) => Bson::Array(items.iter().map(to_bson).collect()),
    }
}

fn regex_text(value: &Value) -> String {
    let text = match to_bson(value) {
        Bson::String(s) => s,
        other => other.to_string(),
    };
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Visitor for MongoFilterVisitor {
    fn on_and_start(&mut self) {
        self.frames.push(Vec::new());
    }

    fn on_and_end(&mut self) {
        self.close("$and");
    }

    fn on_or_start(&mut self) {
        self.frames.push(Vec::new());
    }

    fn on_or_end(&mut self) {
        self.close("$or");
    }

    fn on_comparison(&mut self, field: &str, comparator: Comparator, value: &Value) {
        let field = mongo_field(field);
        let condition = match comparator {
            Comparator::Equals => to_bson(value),
            Comparator::NotEquals => Bson::Document(doc! { "$ne": to_bson(value) }),
            Comparator::Like => Bson::Document(doc! { "$regex": regex_text(value), "$options": "im" }),
            Comparator::NotLike => Bson::Document(doc! {
                "$not": { "$regex": regex_text(value), "$options": "im" }
            }),
            Comparator::GreaterThan => Bson::Document(doc! { "$gt": to_bson(value) }),
            Comparator::GreaterThanOrEquals => Bson::Document(doc! { "$gte": to_bson(value) }),
            Comparator::LessThan => Bson::Document(doc! { "$lt": to_bson(value) }),
            Comparator::LessThanOrEquals => Bson::Document(doc! { "$lte": to_bson(value) }),
            Comparator::In => Bson::Document(doc! { "$in": to_bson(value) }),
            Comparator::NotIn => Bson::Document(doc! { "$nin": to_bson(value) }),
        };
        self.push(doc! { field: condition });
    }
}

impl Process for MongoFilterVisitor {
    type Filter = Document;

    fn into_filter(self, tenant_id: &str) -> Document {
        let tenant = doc! { "tenant_id": tenant_id };
        match self.root {
            Some(filter) => doc! { "$and": [filter, tenant] },
            None => tenant,
        }
    }
}
