//! Paged listing.

use std::sync::Arc;

use tracing::{debug, instrument};

use roster_core::error::Result;
use roster_core::traits::UserStore;
use roster_core::types::{compute_offset, Page, UserFilter, UserRecord};

/// Count-then-page listing over a [`UserStore`].
pub struct PagedListing {
    store: Arc<dyn UserStore>,
}

impl PagedListing {
    /// Creates a listing over `store`.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Returns page `page_number` (1-based) of records matching `filter`.
    ///
    /// Counts first and skips the page query when nothing matches. The offset is
    /// not clamped: callers validate `page_number >= 1`.
    #[instrument(skip(self, filter))]
    pub async fn list_page(
        &self,
        filter: &UserFilter,
        page_number: i64,
        page_size: u32,
    ) -> Result<Page<UserRecord>> {
        let total = self.store.count_by(filter).await?;
        if total == 0 {
            debug!("No matching records");
            return Ok(Page::empty(page_number, page_size, 0));
        }

        let offset = compute_offset(page_number, page_size);
        let items = self.store.find_page(filter, offset, page_size).await?;
        debug!(total, offset, returned = items.len(), "Page loaded");

        Ok(Page {
            page_num: page_number,
            page_size,
            total,
            items,
        })
    }
}
