//! SQL `WHERE` compiler.
//!
//! Produces a parenthesized boolean expression with `?` placeholders and the
//! matching bind values, ready for `Expr::cust_with_values`. Dotted fields
//! address JSON columns through `json_extract`.

use chrono::Utc;
use sea_query::Value as SqlValue;

use super::ast::{Comparator, Value};
use super::visitor::{Process, Visitor};
use crate::model::timestamp;

/// Compiled SQL condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Visitor producing a [`SqlFilter`].
#[derive(Debug, Default)]
pub struct SqlFilterVisitor {
    sql: String,
    values: Vec<SqlValue>,
}

impl SqlFilterVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, value: &Value) -> String {
        match value {
            Value::List(items) => {
                let placeholders: Vec<String> = items.iter().map(|v| self.bind(v)).collect();
                format!("({})", placeholders.join(", "))
            }
            scalar => {
                self.values.push(to_sql_value(scalar));
                "?".to_string()
            }
        }
    }
}

/// Quote a mapped field name as a column reference.
pub fn column_ref(field: &str) -> String {
    match field.split_once('.') {
        None => format!("\"{field}\""),
        Some((column, path)) => format!("json_extract(\"{column}\", '$.{path}')"),
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Integer(i) => (*i).into(),
        Value::Double(d) => (*d).into(),
        Value::Boolean(b) => (*b).into(),
        Value::String(s) => s.clone().into(),
        Value::Date(d) => timestamp::format_date(d).into(),
        Value::DateTime(dt) => timestamp::format(&dt.with_timezone(&Utc)).into(),
        // Lists are expanded element-wise by `bind`.
        Value::List(_) => SqlValue::String(None),
    }
}

fn like_pattern(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Date(d) => timestamp::format_date(d),
        Value::DateTime(dt) => timestamp::format(&dt.with_timezone(&Utc)),
        Value::List(_) => String::new(),
    };
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Value::String(escaped)
}

impl Visitor for SqlFilterVisitor {
    fn on_and_start(&mut self) {
        self.sql.push('(');
    }

    fn on_and_item(&mut self) {
        self.sql.push_str(" and ");
    }

    fn on_and_end(&mut self) {
        self.sql.push(')');
    }

    fn on_or_start(&mut self) {
        self.sql.push('(');
    }

    fn on_or_item(&mut self) {
        self.sql.push_str(" or ");
    }

    fn on_or_end(&mut self) {
        self.sql.push(')');
    }

    fn on_comparison(&mut self, field: &str, comparator: Comparator, value: &Value) {
        let column = column_ref(field);
        let (op, value) = match comparator {
            Comparator::Equals => ("=", value.clone()),
            Comparator::NotEquals => ("!=", value.clone()),
            Comparator::Like => ("like", like_pattern(value)),
            Comparator::NotLike => ("not like", like_pattern(value)),
            Comparator::GreaterThan => (">", value.clone()),
            Comparator::GreaterThanOrEquals => (">=", value.clone()),
            Comparator::LessThan => ("<", value.clone()),
            Comparator::LessThanOrEquals => ("<=", value.clone()),
            Comparator::In => ("in", value.clone()),
            Comparator::NotIn => ("not in", value.clone()),
        };
        let placeholder = self.bind(&value);
        self.sql.push_str(&format!("{column} {op} {placeholder}"));
        if matches!(comparator, Comparator::Like | Comparator::NotLike) {
            // The pattern is a literal apart from the surrounding `%`.
            self.sql.push_str(" escape '\\'");
        }
    }
}

impl Process for SqlFilterVisitor {
    type Filter = SqlFilter;

    fn into_filter(mut self, tenant_id: &str) -> SqlFilter {
        let tenant = "\"tenant_id\" = ?";
        let sql = if self.sql.is_empty() {
            tenant.to_string()
        } else {
            format!("({}) and {tenant}", self.sql)
        };
        self.values.push(tenant_id.to_string().into());
        SqlFilter {
            sql,
            values: self.values,
        }
    }
}
