//! Depth-first traversal of a parsed filter.
//!
//! A [`Visitor`] receives one callback per node. `*_item` fires between two
//! children of an `And`/`Or`, never after the last one. A [`Process`] is a
//! visitor that can turn what it collected into a tenant-scoped filter.

use super::ast::{Comparator, Expression, Value};
use super::naming::as_storage_name;
use super::parser::parse;
use crate::error::Result;

pub trait Visitor {
    fn on_and_start(&mut self) {}
    fn on_and_item(&mut self) {}
    fn on_and_end(&mut self) {}
    fn on_or_start(&mut self) {}
    fn on_or_item(&mut self) {}
    fn on_or_end(&mut self) {}

    /// Called for each leaf with the already-mapped field name.
    fn on_comparison(&mut self, field: &str, comparator: Comparator, value: &Value);

    /// Field-name mapping applied before [`Visitor::on_comparison`].
    fn map_name(&self, name: &str) -> String {
        as_storage_name(name)
    }
}

/// Visitor that produces a backend filter.
pub trait Process: Visitor {
    type Filter;

    /// Finish the traversal and AND the tenant scope onto the result.
    ///
    /// The tenant clause is always appended here and can't be supplied or
    /// overridden through the filter string.
    fn into_filter(self, tenant_id: &str) -> Self::Filter;
}

/// Walk `expression` depth-first, invoking `visitor` callbacks.
pub fn walk<V: Visitor + ?Sized>(expression: &Expression, visitor: &mut V) {
    match expression {
        Expression::And(items) => {
            visitor.on_and_start();
            for (i, item) in items.iter().enumerate() {
                walk(item, visitor);
                if i + 1 < items.len() {
                    visitor.on_and_item();
                }
            }
            visitor.on_and_end();
        }
        Expression::Or(items) => {
            visitor.on_or_start();
            for (i, item) in items.iter().enumerate() {
                walk(item, visitor);
                if i + 1 < items.len() {
                    visitor.on_or_item();
                }
            }
            visitor.on_or_end();
        }
        Expression::Comparison(c) => {
            let field = visitor.map_name(&c.identifier);
            visitor.on_comparison(&field, c.comparator, &c.value);
        }
    }
}

/// Compile `source` through `process` and scope it to `tenant_id`.
///
/// Blank input is not an error here: it compiles to the tenant clause alone.
pub fn compile<P: Process>(source: &str, mut process: P, tenant_id: &str) -> Result<P::Filter> {
    if !source.trim().is_empty() {
        let expression = parse(source)?;
        walk(&expression, &mut process);
    }
    Ok(process.into_filter(tenant_id))
}
