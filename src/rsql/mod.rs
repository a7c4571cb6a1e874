//! RSQL-style filter language.
//!
//! Filter strings are lexed, parsed into an [`Expression`] tree, then walked
//! by a backend [`Process`] that emits a native filter:
//!
//! - [`SqlFilterVisitor`]: parenthesized SQL condition with bind values
//! - [`MongoFilterVisitor`]: MongoDB query document
//! - [`DisplayVisitor`]: canonical filter text
//!
//! Example: `name==~'bob' and (age>=18 or status=in=('vip','staff'))`

pub mod ast;
pub mod display;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod token;
pub mod visitor;

#[cfg(feature = "sqlite")]
pub mod sql;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(all(test, feature = "sqlite", feature = "mongodb"))]
mod conformance;

pub use ast::{Comparator, Comparison, Expression, Value};
pub use display::DisplayVisitor;
pub use lexer::{tokenize, Lexer};
pub use naming::{as_storage_name, as_target_name, RELATION_TARGET_PREFIX};
pub use parser::parse;
pub use token::{Token, TokenKind};
pub use visitor::{compile, walk, Process, Visitor};

#[cfg(feature = "sqlite")]
pub use sql::{SqlFilter, SqlFilterVisitor};

#[cfg(feature = "mongodb")]
pub use mongo::MongoFilterVisitor;

/// Canonical rendering of `source`, or an empty string for a blank filter.
pub fn normalize(source: &str) -> crate::error::Result<String> {
    if source.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(DisplayVisitor::render(&parse(source)?))
}
