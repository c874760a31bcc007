//! Pagination primitives shared by list operations.

use serde::Serialize;

/// Normalized page/limit pair.
///
/// `page` and `limit` are 1-based; absent or zero values fall back to the
/// defaults (page 1, limit 10). Rejecting present-but-invalid query input is
/// the HTTP layer's job; this type only normalizes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_LIMIT: u64 = 10;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(Self::DEFAULT_PAGE),
            limit: limit.filter(|l| *l >= 1).unwrap_or(Self::DEFAULT_LIMIT),
        }
    }

    /// Number of records to skip: `(page - 1) * limit`.
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a list result.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit.max(1))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
