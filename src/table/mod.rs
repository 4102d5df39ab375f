//! Client-side table helpers
//!
//! Search, field filters and pagination over lists already fetched from the
//! API.

use crate::session::User;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A row that can be searched and filtered by named field
pub trait TableRow {
    /// Value of a filterable field, `None` if the row has no such field
    fn field(&self, name: &str) -> Option<String>;

    /// Text matched by free-text search
    fn search_text(&self) -> String;
}

/// Search, filters and the requested page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub search: Option<String>,
    pub filters: BTreeMap<String, String>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            search: None,
            filters: BTreeMap::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Filter `rows` and cut out the requested page
    pub fn apply<'a, T: TableRow>(&self, rows: &'a [T]) -> Page<&'a T> {
        let matching = filter_rows(rows, self);
        paginate(matching, self.page, self.page_size)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Rows matching the query's search text and every field filter.
///
/// Matching is case-insensitive. Search is a substring match; filters must
/// equal the field value. Blank search and filter values are ignored.
pub fn filter_rows<'a, T: TableRow>(rows: &'a [T], query: &TableQuery) -> Vec<&'a T> {
    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let filters: Vec<(&str, String)> = query
        .filters
        .iter()
        .map(|(field, value)| (field.as_str(), value.trim().to_lowercase()))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    rows.iter()
        .filter(|row| match &search {
            Some(needle) => row.search_text().to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .filter(|row| {
            filters.iter().all(|(field, expected)| {
                row.field(field)
                    .map(|actual| actual.to_lowercase() == *expected)
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// Cut page `page` (1-based) out of `items`.
///
/// Page 0 is read as page 1 and a page size of 0 as the default. Pages past
/// the end are empty but still report the totals.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

impl TableRow for User {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "role" => Some(self.role.to_string()),
            "email" => Some(self.email.clone()),
            "verified" => Some(self.is_email_verified.to_string()),
            "id" => Some(self.id.clone()),
            _ => None,
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.first_name, self.last_name, self.full_name, self.email
        )
    }
}
