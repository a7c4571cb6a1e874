//! Recursive-descent parser for the filter language.
//!
//! ```text
//! or         : and ('or' and)*
//! and        : constraint ('and' constraint)*
//! constraint : group | comparison
//! group      : '(' or ')'
//! comparison : identifier comparator arguments
//! arguments  : '(' value (',' value)* ')' | value
//! ```
//!
//! Each level splits its token slice on the top-level separator and parses
//! the segments independently, so `and` binds tighter than `or`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use super::ast::{Comparator, Expression, Value};
use super::lexer::tokenize;
use super::token::{Token, TokenKind};
use crate::error::{Result, StorageError};

/// Parse a filter string into an expression tree.
///
/// Empty or blank input is an error; callers that treat an empty filter as
/// "match everything" check for it before parsing.
pub fn parse(source: &str) -> Result<Expression> {
    let mut tokens = tokenize(source)?;
    let end = tokens.pop().map(|eof| eof.position).unwrap_or(source.len());
    or(Segment {
        tokens: &tokens,
        position: end,
    })
}

/// A token slice plus the position to report when it is empty.
#[derive(Clone, Copy)]
struct Segment<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> Segment<'t> {
    fn new(tokens: &'t [Token], boundary: usize) -> Self {
        let position = tokens.first().map(|t| t.position).unwrap_or(boundary);
        Self { tokens, position }
    }

    fn get(&self, idx: usize) -> Option<&'t Token> {
        self.tokens.get(idx)
    }

    /// Position of the token at `idx`, or of whatever follows the segment.
    fn position_at(&self, idx: usize) -> usize {
        self.get(idx).map(|t| t.position).unwrap_or_else(|| {
            self.tokens
                .last()
                .map(|t| t.position + t.value.len().max(1))
                .unwrap_or(self.position)
        })
    }
}

fn error(position: usize, message: impl Into<String>) -> StorageError {
    StorageError::Parse {
        position,
        message: message.into(),
    }
}

/// Split on `separator` tokens outside parentheses.
///
/// A separator with nothing after it still yields a (empty) trailing
/// segment so that `a==1 and` is rejected rather than silently accepted.
fn split(segment: Segment<'_>, separator: TokenKind) -> Result<Vec<Segment<'_>>> {
    let tokens = segment.tokens;
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut saw_separator = false;

    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(error(token.position, "invalid parentheses"));
                }
            }
            kind if kind == separator && depth == 0 => {
                parts.push(Segment::new(&tokens[start..idx], token.position));
                start = idx + 1;
                saw_separator = true;
            }
            _ => {}
        }
    }

    if start < tokens.len() || saw_separator {
        parts.push(Segment::new(&tokens[start..], segment.position_at(tokens.len())));
    }
    Ok(parts)
}

fn or(segment: Segment<'_>) -> Result<Expression> {
    let parts = split(segment, TokenKind::Or)?;
    let mut items = parts.into_iter().map(and).collect::<Result<Vec<_>>>()?;
    match items.len() {
        0 => Err(error(segment.position, "invalid 'or' section")),
        1 => Ok(items.remove(0)),
        _ => Ok(Expression::Or(items)),
    }
}

fn and(segment: Segment<'_>) -> Result<Expression> {
    let parts = split(segment, TokenKind::And)?;
    let mut items = parts
        .into_iter()
        .map(constraint)
        .collect::<Result<Vec<_>>>()?;
    match items.len() {
        0 => Err(error(segment.position, "invalid 'and' section")),
        1 => Ok(items.remove(0)),
        _ => Ok(Expression::And(items)),
    }
}

fn constraint(segment: Segment<'_>) -> Result<Expression> {
    match segment.get(0) {
        None => Err(error(segment.position, "invalid 'and' section")),
        Some(token) if token.kind == TokenKind::LeftParen => group(segment),
        Some(_) => comparison(segment),
    }
}

fn group(segment: Segment<'_>) -> Result<Expression> {
    let tokens = segment.tokens;
    let mut depth = 0i32;
    let mut close = None;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }

    let close = close.ok_or_else(|| error(segment.position, "closed parentheses don't match"))?;
    let inner = Segment::new(&tokens[1..close], tokens[close].position);
    let expression = or(inner)?;
    expect_end(segment, close + 1)?;
    Ok(expression)
}

fn comparison(segment: Segment<'_>) -> Result<Expression> {
    let identifier = match segment.get(0) {
        Some(token) if token.kind == TokenKind::Identifier => token.value.clone(),
        other => {
            let position = other.map(|t| t.position).unwrap_or(segment.position);
            return Err(error(position, "expected identifier"));
        }
    };

    let comparator = match segment.get(1) {
        Some(token) => comparator(token)?,
        None => return Err(error(segment.position_at(1), "expected comparator")),
    };

    let (value, next) = arguments(segment, 2)?;
    expect_end(segment, next)?;

    let value = match (comparator.takes_list(), value) {
        (true, Value::List(items)) => Value::List(items),
        (true, scalar) => Value::List(vec![scalar]),
        (false, Value::List(mut items)) if items.len() == 1 => items.remove(0),
        (false, Value::List(_)) => {
            return Err(error(
                segment.position_at(2),
                format!("'{}' does not accept a list", comparator.symbol()),
            ))
        }
        (false, scalar) => scalar,
    };

    Ok(Expression::comparison(identifier, comparator, value))
}

fn comparator(token: &Token) -> Result<Comparator> {
    let comparator = match token.kind {
        TokenKind::Equals => Comparator::Equals,
        TokenKind::NotEquals => Comparator::NotEquals,
        TokenKind::Like => Comparator::Like,
        TokenKind::NotLike => Comparator::NotLike,
        TokenKind::Greater => Comparator::GreaterThan,
        TokenKind::GreaterOrEquals => Comparator::GreaterThanOrEquals,
        TokenKind::Less => Comparator::LessThan,
        TokenKind::LessOrEquals => Comparator::LessThanOrEquals,
        TokenKind::In => Comparator::In,
        TokenKind::NotIn => Comparator::NotIn,
        other => {
            return Err(error(
                token.position,
                format!("expected comparator, found {other}"),
            ))
        }
    };
    Ok(comparator)
}

/// Parse the argument starting at `idx`; returns the value and the index
/// just past it.
fn arguments(segment: Segment<'_>, idx: usize) -> Result<(Value, usize)> {
    match segment.get(idx) {
        Some(token) if token.kind == TokenKind::LeftParen => {
            let mut values = Vec::new();
            let mut idx = idx + 1;
            loop {
                let token = segment
                    .get(idx)
                    .ok_or_else(|| error(segment.position_at(idx), "expected value"))?;
                values.push(value(token)?);
                idx += 1;
                match segment.get(idx) {
                    Some(t) if t.kind == TokenKind::Comma => idx += 1,
                    Some(t) if t.kind == TokenKind::RightParen => return Ok((Value::List(values), idx + 1)),
                    _ => return Err(error(segment.position_at(idx), "expected ',' or ')'")),
                }
            }
        }
        Some(token) => Ok((value(token)?, idx + 1)),
        None => Err(error(segment.position_at(idx), "expected value")),
    }
}

fn value(token: &Token) -> Result<Value> {
    let invalid = |what: &str| error(token.position, format!("invalid {what} '{}'", token.value));
    let value = match token.kind {
        TokenKind::Integer => Value::Integer(token.value.parse().map_err(|_| invalid("integer"))?),
        TokenKind::Double => Value::Double(token.value.parse().map_err(|_| invalid("double"))?),
        TokenKind::Boolean => Value::Boolean(token.value == "true"),
        TokenKind::String => Value::String(token.value.clone()),
        TokenKind::Date => Value::Date(
            NaiveDate::parse_from_str(&token.value, "%Y-%m-%d").map_err(|_| invalid("date"))?,
        ),
        TokenKind::DateTime => {
            Value::DateTime(parse_date_time(&token.value).ok_or_else(|| invalid("date-time"))?)
        }
        other => {
            return Err(error(
                token.position,
                format!("expected value, found {other}"),
            ))
        }
    };
    Ok(value)
}

/// `YYYY-MM-DDTHH:MM:SS` with an optional `Z` or `±HH[[:]MM]` suffix; no
/// suffix means UTC.
fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    if text.len() < 19 || !text.is_ascii() {
        return None;
    }
    let (local, zone) = text.split_at(19);
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S").ok()?;

    let offset_secs = match zone {
        "" | "Z" => 0,
        _ => {
            let sign = match zone.as_bytes()[0] {
                b'+' => 1,
                b'-' => -1,
                _ => return None,
            };
            let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
            let hours: i32 = digits.get(0..2)?.parse().ok()?;
            let minutes: i32 = match digits.get(2..) {
                Some("") | None => 0,
                Some(m) => m.parse().ok()?,
            };
            sign * (hours * 3600 + minutes * 60)
        }
    };

    FixedOffset::east_opt(offset_secs)?
        .from_local_datetime(&naive)
        .single()
}

fn expect_end(segment: Segment<'_>, idx: usize) -> Result<()> {
    match segment.get(idx) {
        None => Ok(()),
        Some(token) => Err(error(
            token.position,
            format!("unexpected {} '{}'", token.kind, token.value),
        )),
    }
}
