//! Paging types.

use serde::{Deserialize, Serialize};

/// Computes the row offset of a 1-based page.
///
/// No clamping: `page_number <= 0` yields a zero or negative offset, and callers
/// are expected to have validated `page_number >= 1` already. Results beyond
/// the `i64` range saturate.
pub fn compute_offset(page_number: i64, page_size: u32) -> i64 {
    page_number.saturating_sub(1).saturating_mul(i64::from(page_size))
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// 1-based page number that was requested
    pub page_num: i64,
    /// Requested page size
    pub page_size: u32,
    /// Total number of matching records across all pages
    pub total: u64,
    /// Records on this page
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Creates an empty page carrying `total`.
    pub fn empty(page_num: i64, page_size: u32, total: u64) -> Self {
        Self {
            page_num,
            page_size,
            total,
            items: Vec::new(),
        }
    }

    /// Maps the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_num: self.page_num,
            page_size: self.page_size,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    /// Number of pages needed for `total` records.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(u64::from(self.page_size))
        }
    }
}
