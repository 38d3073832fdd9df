//! Soft-delete aware query composition.

use statedb_driver::{Filter, FindOptions, SortDirection, SortSpec};

use crate::state::IS_DELETED_FIELD;

/// Page size used when a caller passes a non-positive one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index.
    pub index: u64,
    /// Items per page, at least one.
    pub size: u64,
}

impl Page {
    /// Clamps raw caller input: a negative index becomes 0 and a
    /// non-positive size becomes [`DEFAULT_PAGE_SIZE`].
    pub fn clamped(index: i64, size: i64) -> Self {
        Self::clamped_with(index, size, DEFAULT_PAGE_SIZE)
    }

    /// Like [`Page::clamped`] with an explicit fallback size.
    pub fn clamped_with(index: i64, size: i64, default_size: u64) -> Self {
        Self {
            index: u64::try_from(index).unwrap_or(0),
            size: u64::try_from(size)
                .ok()
                .filter(|s| *s > 0)
                .unwrap_or(default_size.max(1)),
        }
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        self.index.saturating_mul(self.size)
    }
}

/// Builds the filters and find options the store sends to the driver.
///
/// Every default read path goes through [`QueryBuilder::active`], which
/// adds `is_deleted == false` in front of the caller's filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// `is_deleted == false AND filter`. [`Filter::All`] adds nothing.
    pub fn active(filter: Filter) -> Filter {
        Filter::eq(IS_DELETED_FIELD, false).and(filter)
    }

    /// Single-key sort.
    pub fn sort(key: &str, ascending: bool) -> SortSpec {
        SortSpec {
            field: key.to_string(),
            direction: SortDirection::from_ascending(ascending),
        }
    }

    /// Options for the first document in sort order.
    pub fn sorted_first(key: &str, ascending: bool) -> FindOptions {
        FindOptions::new().sort(Self::sort(key, ascending)).limit(1)
    }

    /// Options for one sorted page.
    pub fn sorted_page(key: &str, ascending: bool, page: Page) -> FindOptions {
        FindOptions::new()
            .sort(Self::sort(key, ascending))
            .skip(page.skip())
            .limit(page.size)
    }
}
