//! Page-based pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters. Missing or out-of-range values are
/// clamped instead of rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// Effective 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size, clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }
}

/// One page of results plus the total count.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
    /// Total matching items across all pages.
    pub total: i64,
}

impl<T> Paginated<T> {
    /// Assemble a page from query parameters and a total count.
    #[must_use]
    pub fn new(items: Vec<T>, query: &PageQuery, total: i64) -> Self {
        Self {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total,
        }
    }

    /// Map the items, keeping paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let q = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), MAX_PER_PAGE);

        let q = PageQuery {
            page: Some(3),
            per_page: Some(0),
        };
        assert_eq!(q.per_page(), 1);
        assert_eq!(q.offset(), 2);
    }

    #[test]
    fn test_offset() {
        let q = PageQuery {
            page: Some(4),
            per_page: Some(25),
        };
        assert_eq!(q.limit(), 25);
        assert_eq!(q.offset(), 75);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let q = PageQuery::default();
        let page = Paginated::new(vec![1, 2, 3], &q, 42).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20, 30]);
        assert_eq!(page.total, 42);
    }
}
