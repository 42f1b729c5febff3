//! Core types for the persistence layer.
//!
//! - [`FilterParams`] - Key/value filter criteria
//! - [`SortParams`], [`SortField`] - Ordered sort keys
//! - [`PagingParams`], [`DataPage`] - Offset pagination and result pages
//! - [`UpdateMap`] - Partial (field-level) updates
//!
//! # Example
//!
//! ```
//! use mongodb_persistence::types::{FilterParams, PagingParams, SortParams};
//!
//! let filter = FilterParams::from_tuples([("key", "Key 1")]);
//! let paging = PagingParams::default().with_skip(0).with_take(20).with_total();
//! let sort = SortParams::parse("-key");
//!
//! assert_eq!(paging.take_or(100), 20);
//! assert!(!sort.is_empty());
//! assert!(!filter.is_empty());
//! ```

mod filter;
mod pagination;
mod sort;
mod update;

pub use filter::{FilterParams, IDS_FILTER_KEY};
pub(crate) use filter::split_list;
pub use pagination::{DataPage, DEFAULT_MAX_PAGE_SIZE, PagingParams};
pub use sort::{SortField, SortParams};
pub use update::UpdateMap;
