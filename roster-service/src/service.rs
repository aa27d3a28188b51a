//! User service facade.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use roster_core::error::Result;
use roster_core::traits::{AuthorizationClient, CacheStore, LockService, UserStore};
use roster_core::types::{Page, RegisterUser, UserFilter, UserRecord, UserStatistics};

use crate::{PagedListing, QueryCache, RegistrationWorkflow, WorkflowConfig};

/// Entry point for every user operation.
///
/// Holds the collaborators once and hands them to the workflow, query cache
/// and listing. Cheap to share behind an `Arc`.
pub struct UserService {
    workflow: RegistrationWorkflow,
    query: QueryCache,
    listing: PagedListing,
    store: Arc<dyn UserStore>,
}

impl UserService {
    /// Creates a service without a cache and with default deadlines.
    pub fn new(
        locks: Arc<dyn LockService>,
        auth: Arc<dyn AuthorizationClient>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            workflow: RegistrationWorkflow::new(locks, auth, Arc::clone(&store)),
            query: QueryCache::uncached(Arc::clone(&store)),
            listing: PagedListing::new(Arc::clone(&store)),
            store,
        }
    }

    /// Serves lookups through `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.query = QueryCache::new(cache, Arc::clone(&self.store));
        self
    }

    /// Replaces the workflow configuration.
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.workflow = self.workflow.with_config(config);
        self
    }

    /// Registers a user. See [`RegistrationWorkflow::register`].
    pub async fn register(&self, request: RegisterUser, actor: &str) -> Result<String> {
        self.workflow.register(request, actor).await
    }

    /// Looks up a live user. See [`QueryCache::get`].
    pub async fn query_by_key(&self, user_key: &str) -> Result<Option<UserRecord>> {
        self.query.get(user_key).await
    }

    /// Lists a page of users. See [`PagedListing::list_page`].
    pub async fn list_page(
        &self,
        filter: &UserFilter,
        page_number: i64,
        page_size: u32,
    ) -> Result<Page<UserRecord>> {
        self.listing.list_page(filter, page_number, page_size).await
    }

    /// Soft-deletes a user and drops it from the cache.
    ///
    /// A lookup racing the delete never leaves the deleted record cached.
    /// Returns false if there was no live record.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_key: &str, actor: &str) -> Result<bool> {
        let removed = self.store.delete(user_key, actor).await?;
        if let Err(e) = self.query.evict(user_key).await {
            warn!(error = %e, "Cache eviction failed");
        }
        if removed {
            info!("User removed");
        }
        Ok(removed)
    }

    /// Aggregate counts.
    pub async fn statistics(&self) -> Result<UserStatistics> {
        self.store.statistics().await
    }

    /// Returns true if lookups go through a cache.
    pub fn is_cached(&self) -> bool {
        self.query.is_cached()
    }
}
