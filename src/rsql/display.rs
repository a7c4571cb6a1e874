//! Canonical text rendering of a parsed filter.

use chrono::SecondsFormat;

use super::ast::{Comparator, Expression, Value};
use super::visitor::{walk, Visitor};

/// Renders an expression back into filter syntax.
///
/// Field names are kept as written and every `and`/`or` group is
/// parenthesized, so the output re-parses to the same tree.
#[derive(Debug, Default)]
pub struct DisplayVisitor {
    out: String,
}

impl DisplayVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(expression: &Expression) -> String {
        let mut visitor = Self::new();
        walk(expression, &mut visitor);
        visitor.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => {
            let text = d.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
        Value::Boolean(b) => b.to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("({})", items.join(","))
        }
    }
}

impl Visitor for DisplayVisitor {
    fn on_and_start(&mut self) {
        self.out.push('(');
    }

    fn on_and_item(&mut self) {
        self.out.push_str(" and ");
    }

    fn on_and_end(&mut self) {
        self.out.push(')');
    }

    fn on_or_start(&mut self) {
        self.out.push('(');
    }

    fn on_or_item(&mut self) {
        self.out.push_str(" or ");
    }

    fn on_or_end(&mut self) {
        self.out.push(')');
    }

    fn on_comparison(&mut self, field: &str, comparator: Comparator, value: &Value) {
        self.out.push_str(field);
        self.out.push_str(comparator.symbol());
        self.out.push_str(&literal(value));
    }

    fn map_name(&self, name: &str) -> String {
        name.to_string()
    }
}
