//! # Mandatory Pagination
//!
//! Every list-returning query in the engine goes through [`PageRequest`],
//! which enforces a hard maximum page size at construction. Returning an
//! unbounded collection to a caller is not expressible with these types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on page size for every list-returning query.
pub const MAX_PAGE_SIZE: usize = 50;

/// Error constructing a page request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Requested page size exceeds [`MAX_PAGE_SIZE`].
    #[error("requested page size {requested} exceeds maximum {max}")]
    PageTooLarge {
        /// Requested size.
        requested: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// A page size of zero was requested.
    #[error("page size must be positive")]
    ZeroPageSize,
}

/// A validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    offset: usize,
    limit: usize,
}

impl PageRequest {
    /// Create a page request, validating the limit against [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageTooLarge`] or [`PageError::ZeroPageSize`].
    pub fn new(offset: usize, limit: usize) -> Result<Self, PageError> {
        if limit == 0 {
            return Err(PageError::ZeroPageSize);
        }
        if limit > MAX_PAGE_SIZE {
            return Err(PageError::PageTooLarge {
                requested: limit,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(Self { offset, limit })
    }

    /// First page with the maximum size.
    pub fn first() -> Self {
        Self {
            offset: 0,
            limit: MAX_PAGE_SIZE,
        }
    }

    /// Starting offset into the result set.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of items returned.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// One page of results plus the total size of the underlying result set.
///
/// An offset at or past `total` yields an empty `items` with `total`
/// still reported, so callers can detect the end of the set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page, at most the requested limit.
    pub items: Vec<T>,
    /// Total items in the result set across all pages.
    pub total: usize,
    /// Offset this page starts at.
    pub offset: usize,
}

impl<T> Page<T> {
    /// Build a page by applying `request` to an already-ordered vector of
    /// the full result set.
    pub fn from_vec(mut all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let offset = request.offset();
        let items = if offset >= total {
            Vec::new()
        } else {
            let end = offset.saturating_add(request.limit()).min(total);
            all.drain(offset..end).collect()
        };
        Self {
            items,
            total,
            offset,
        }
    }

    /// Build a page over an ordered index, materializing items only for
    /// the requested window. `lookup` runs at most `limit` times, keeping
    /// the query cost proportional to the page size.
    pub fn from_index<K, F>(index: &[K], request: PageRequest, mut lookup: F) -> Self
    where
        F: FnMut(&K) -> Option<T>,
    {
        let total = index.len();
        let offset = request.offset();
        let items = if offset >= total {
            Vec::new()
        } else {
            let end = offset.saturating_add(request.limit()).min(total);
            index[offset..end].iter().filter_map(&mut lookup).collect()
        };
        Self {
            items,
            total,
            offset,
        }
    }

    /// Whether this page is the last one in the result set.
    pub fn is_last(&self) -> bool {
        self.offset.saturating_add(self.items.len()) >= self.total
    }
}
