//! Pagination envelopes for list endpoints.

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

/// Metadata describing a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Total number of matching rows.
    pub total: u64,
    /// Requested page size.
    pub per_page: u64,
    /// 1-based page number of this page.
    pub current_page: u64,
    /// 1-based number of the last non-empty page (1 when there are no rows).
    pub last_page: u64,
}

impl PageMeta {
    /// Build metadata from a total row count and page coordinates.
    #[must_use]
    pub const fn new(total: u64, per_page: u64, current_page: u64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            total.div_ceil(per_page)
        };
        Self {
            total,
            per_page,
            current_page,
            last_page,
        }
    }
}

/// One page of results plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Page metadata.
    pub meta: PageMeta,
    /// The rows of this page.
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a page of rows with its metadata.
    #[must_use]
    pub const fn new(data: Vec<T>, meta: PageMeta) -> Self {
        Self { meta, data }
    }

    /// Map the rows of the page, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            meta: self.meta,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Raw pagination input as it arrives from a query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    /// Requested 1-based page number.
    pub page: Option<u64>,
    /// Requested page size.
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Resolve the raw input against configured bounds.
    ///
    /// Pages are 1-based; a page of 0 is treated as 1. The limit falls back
    /// to the configured default and is clamped to `[1, max_limit]`.
    #[must_use]
    pub fn resolve(self, config: &PaginationConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit);
        (page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_meta_math() {
        let meta = PageMeta::new(11, 5, 1);
        assert_eq!(meta.last_page, 3);

        let meta = PageMeta::new(10, 5, 2);
        assert_eq!(meta.last_page, 2);

        let meta = PageMeta::new(0, 5, 1);
        assert_eq!(meta.last_page, 1);
    }

    #[test]
    fn test_page_map_keeps_meta() {
        let page = Page::new(vec![1, 2, 3], PageMeta::new(3, 5, 1));
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.data, vec!["1", "2", "3"]);
        assert_eq!(mapped.meta.total, 3);
    }

    #[test]
    fn test_page_query_resolution() {
        let config = PaginationConfig::default();

        let (page, limit) = PageQuery::default().resolve(&config);
        assert_eq!((page, limit), (1, 5));

        let (page, limit) = PageQuery {
            page: Some(0),
            limit: Some(0),
        }
        .resolve(&config);
        assert_eq!((page, limit), (1, 1));

        let (page, limit) = PageQuery {
            page: Some(3),
            limit: Some(1000),
        }
        .resolve(&config);
        assert_eq!((page, limit), (3, 100));
    }
}
