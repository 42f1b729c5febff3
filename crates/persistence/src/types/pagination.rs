//! Pagination types for query results.
//!
//! Paging is offset-based: a request carries `skip`/`take` plus a flag asking
//! for the total number of matches, and a result is a [`DataPage`].

use serde::{Deserialize, Serialize};

/// Default maximum page size used when nothing is configured.
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

/// Paging configuration for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingParams {
    /// Number of matching items to skip.
    #[serde(default)]
    pub skip: Option<u64>,

    /// Maximum number of items to return.
    #[serde(default)]
    pub take: Option<u64>,

    /// Whether to also count every matching item.
    #[serde(default)]
    pub total: bool,
}

impl PagingParams {
    /// Creates paging parameters.
    pub fn new(skip: Option<u64>, take: Option<u64>, total: bool) -> Self {
        Self { skip, take, total }
    }

    /// Sets the number of items to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the page size.
    pub fn with_take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Requests the total count.
    pub fn with_total(mut self) -> Self {
        self.total = true;
        self
    }

    /// Returns the skip, falling back to `min_skip` and never below it.
    pub fn skip_or(&self, min_skip: u64) -> u64 {
        self.skip.map_or(min_skip, |skip| skip.max(min_skip))
    }

    /// Returns the effective page size, capped by `max_take`.
    ///
    /// An absent or zero `take` yields `max_take`.
    pub fn take_or(&self, max_take: u64) -> u64 {
        match self.take {
            Some(take) if take > 0 => take.min(max_take),
            _ => max_take,
        }
    }
}

/// A page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPage<T> {
    /// Items in query result order.
    pub data: Vec<T>,

    /// Total number of matches, present only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> DataPage<T> {
    /// Creates a page.
    pub fn new(data: Vec<T>, total: Option<u64>) -> Self {
        Self { data, total }
    }

    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for DataPage<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults() {
        let paging = PagingParams::default();
        assert_eq!(paging.skip_or(0), 0);
        assert_eq!(paging.take_or(DEFAULT_MAX_PAGE_SIZE), 100);
        assert!(!paging.total);
    }

    #[test]
    fn test_take_is_capped() {
        let paging = PagingParams::default().with_take(500);
        assert_eq!(paging.take_or(100), 100);

        let paging = PagingParams::default().with_take(10);
        assert_eq!(paging.take_or(100), 10);
    }

    #[test]
    fn test_zero_take_means_default() {
        let paging = PagingParams::default().with_take(0);
        assert_eq!(paging.take_or(25), 25);
    }

    #[test]
    fn test_data_page_serialization_omits_missing_total() {
        let page = DataPage::new(vec![1, 2], None);
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(json, r#"{"data":[1,2]}"#);
    }
}
