//! Sort specification parsing.

use crate::error::{Result, StorageError};
use crate::rsql::as_storage_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One sort key with its stored field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

/// Parse `field[:asc|desc], ...`. Order defaults to ascending and is case
/// insensitive; `id` names the primary key.
pub fn parse_sort(source: &str) -> Result<Vec<SortField>> {
    source.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, order) = match item.split_once(':') {
                Some((name, order)) => (name.trim(), order.trim().to_lowercase()),
                None => (item, String::new()),
            };
            let order = match order.as_str() {
                "" | "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                _ => return Err(StorageError::InvalidSort(item.to_string())),
            };
            let plain = name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'));
            if name.is_empty() || !plain {
                return Err(StorageError::InvalidSort(item.to_string()));
            }
            Ok(SortField {
                field: as_storage_name(name),
                order,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        let fields = parse_sort(" sequenceNumber:DESC , id,timeStamp:asc ").unwrap();
        assert_eq!(
            fields,
            vec![
                SortField {
                    field: "sequence_number".into(),
                    order: SortOrder::Desc
                },
                SortField {
                    field: "id".into(),
                    order: SortOrder::Asc
                },
                SortField {
                    field: "time_stamp".into(),
                    order: SortOrder::Asc
                },
            ]
        );
    }

    #[test]
    fn test_empty_sort() {
        assert!(parse_sort("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_order_rejected() {
        assert!(matches!(
            parse_sort("name:up"),
            Err(StorageError::InvalidSort(_))
        ));
        assert!(parse_sort(":desc").is_err());
        assert!(parse_sort("name\"; drop table x").is_err());
    }
}
