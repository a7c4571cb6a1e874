//! Filter + sort + page query surface.
//!
//! Backends compile [`PagingQuery::filter`] with their RSQL visitor, apply
//! [`PagingQuery::sort_fields`] and [`PagingQuery::window`], and run the
//! count query only when `is_total_rows` is set.

mod sort;

pub use sort::{parse_sort, SortField, SortOrder};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Paged query over one table/collection, scoped to a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingQuery {
    pub tenant_id: String,
    /// RSQL filter; blank matches everything in the tenant.
    pub filter: String,
    /// `field[:asc|desc]` list.
    pub sort: String,
    /// Zero-based page index.
    pub page_num: u64,
    /// Rows per page; 0 disables paging.
    pub page_size: u64,
    /// Also run a count query.
    pub is_total_rows: bool,
}

impl PagingQuery {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    pub fn with_page(mut self, page_num: u64, page_size: u64) -> Self {
        self.page_num = page_num;
        self.page_size = page_size;
        self
    }

    pub fn with_total_rows(mut self, is_total_rows: bool) -> Self {
        self.is_total_rows = is_total_rows;
        self
    }

    pub fn sort_fields(&self) -> Result<Vec<SortField>> {
        parse_sort(&self.sort)
    }

    /// `(limit, offset)` when paging is enabled.
    pub fn window(&self) -> Option<(u64, u64)> {
        (self.page_size > 0).then(|| (self.page_size, self.page_size.saturating_mul(self.page_num)))
    }
}

/// Uniform paged result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingResult<T> {
    pub data: Vec<T>,
    pub total_rows: Option<u64>,
    pub total_pages: Option<u64>,
    pub page_num: u64,
    pub page_size: u64,
    /// Canonical rendering of the filter that ran.
    pub filter: String,
    pub sort: String,
    pub is_found: bool,
    pub is_total_rows: bool,
}

impl<T> PagingResult<T> {
    pub fn new(query: &PagingQuery, data: Vec<T>, total_rows: Option<u64>) -> Result<Self> {
        let total_pages = total_rows.map(|rows| total_pages(rows, query.page_size));
        Ok(Self {
            is_found: !data.is_empty(),
            data,
            total_rows,
            total_pages,
            page_num: query.page_num,
            page_size: query.page_size,
            filter: crate::rsql::normalize(&query.filter)?,
            sort: query.sort.clone(),
            is_total_rows: query.is_total_rows,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagingResult<U> {
        PagingResult {
            data: self.data.into_iter().map(f).collect(),
            total_rows: self.total_rows,
            total_pages: self.total_pages,
            page_num: self.page_num,
            page_size: self.page_size,
            filter: self.filter,
            sort: self.sort,
            is_found: self.is_found,
            is_total_rows: self.is_total_rows,
        }
    }
}

/// Page count for `total_rows` rows; a single page when paging is off.
pub fn total_pages(total_rows: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return u64::from(total_rows > 0);
    }
    total_rows.div_ceil(page_size)
}
