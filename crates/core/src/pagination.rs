//! Page-based pagination helpers shared by list endpoints.
//!
//! Callers speak in 1-based `page` / `limit`; repositories speak in
//! `LIMIT` / `OFFSET`. The conversions live here so every list endpoint
//! clamps the same way.

use serde::Serialize;

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Maximum number of items per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided 1-based page number.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset for a clamped page and limit.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page - 1).saturating_mul(limit)
}

/// Number of pages needed to show `total` rows, `limit` at a time.
///
/// An empty result still reports zero pages rather than one.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// A single page of results with the counters a client needs to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            items,
            total,
            page,
            total_pages: total_pages(total, limit),
        }
    }

    /// Convert every item, keeping the counters.
    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(None, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 10);
        assert_eq!(clamp_limit(Some(0), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 1);
        assert_eq!(clamp_limit(Some(500), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 100);
    }

    #[test]
    fn page_below_one_becomes_first_page() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn map_keeps_counters() {
        let page = Page::new(vec![1, 2], 12, 2, 2).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_pages, 6);
        assert_eq!(page.page, 2);
    }
}
