//! Pagination utilities shared by the service and server layers
//!
//! `Pagination` normalizes user input; `Page` is the serialized listing shape
//! (`items`, `page`, `limit`, `total`, `totalPages`).

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: u32,
    /// items per page
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 { 1 }
fn default_limit() -> u32 { DEFAULT_LIMIT }

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self { Self { page, limit } }

    /// Clamp to sane defaults and convert to a 0-based page index and `u64` limit
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let limit = self.limit.clamp(1, MAX_LIMIT);
        ((page - 1) as u64, limit as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, limit: DEFAULT_LIMIT } }
}

/// `ceil(total / limit)`; zero items means zero pages.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 { return 0; }
    total.div_ceil(limit)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Build a page from already-fetched rows and the normalized request.
    pub fn new(items: Vec<T>, opts: Pagination, total: u64) -> Self {
        let (idx, limit) = opts.normalize();
        Self { items, page: idx + 1, limit, total, total_pages: total_pages(total, limit) }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, limit: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, limit: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 100);
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.limit, 20);
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(101, 10), 11);
    }

    #[test]
    fn page_uses_normalized_limit() {
        let page = Page::new(vec![1, 2, 3], Pagination { page: 0, limit: 500 }, 250);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
        assert_eq!(page.total_pages, 3);
        let v = serde_json::to_value(&page).unwrap();
        assert_eq!(v["totalPages"], 3);
    }

    #[test]
    fn query_defaults_apply() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pagination::default());
    }
}
