//! Registration workflow.
//!
//! ```text
//! validate → try lock ──busy──▶ Ok(user_key)   (nothing else happens)
//!               │
//!               ▼ held
//!          authorize ──blank──▶ Unauthorized
//!               │
//!               ▼ name
//!          build record → save ──unique──▶ DuplicateKey
//!               │
//!               ▼
//!          release lock → Ok(user_key)
//! ```
//!
//! A busy lock is reported as success: another worker is already registering
//! the same key. Callers that need to know the record exists must look it up.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use roster_core::constants::DEPENDENCY_TIMEOUT_MS;
use roster_core::error::{Result, RosterError};
use roster_core::traits::{AuthorizationClient, LockService, UserStore};
use roster_core::types::{RegisterUser, UserRecord};
use roster_lock::LockGuard;

/// Workflow configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Deadline for each authorization or store call, in milliseconds
    pub dependency_timeout_ms: u64,
}

impl WorkflowConfig {
    /// Per-call deadline.
    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_millis(self.dependency_timeout_ms)
    }

    /// Longest a registration can hold its lock: one authorization call
    /// plus one store call.
    pub fn max_lock_hold(&self) -> Duration {
        Duration::from_millis(self.dependency_timeout_ms.saturating_mul(2))
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            dependency_timeout_ms: DEPENDENCY_TIMEOUT_MS,
        }
    }
}

/// Registers users under a per-key lock.
pub struct RegistrationWorkflow {
    locks: Arc<dyn LockService>,
    auth: Arc<dyn AuthorizationClient>,
    store: Arc<dyn UserStore>,
    config: WorkflowConfig,
}

impl RegistrationWorkflow {
    /// Creates a workflow over the given collaborators.
    pub fn new(
        locks: Arc<dyn LockService>,
        auth: Arc<dyn AuthorizationClient>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            locks,
            auth,
            store,
            config: WorkflowConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers `request` on behalf of `actor` and returns the user key.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed request (the lock is never touched)
    /// - `Unauthorized` when authorization yields no name
    /// - `DuplicateKey` when a live record already has this key
    /// - a transient error when a collaborator fails or misses its deadline
    ///
    /// The lock is released before returning, whatever the outcome.
    #[instrument(skip(self, request), fields(user_key = %request.user_key))]
    pub async fn register(&self, request: RegisterUser, actor: &str) -> Result<String> {
        request.validate()?;
        let user_key = request.user_key.clone();

        let Some(guard) = LockGuard::try_acquire(Arc::clone(&self.locks), &user_key).await? else {
            info!("Registration already in progress, accepting without changes");
            return Ok(user_key);
        };

        let outcome = self.register_locked(request, actor).await;
        guard.release().await;

        match outcome {
            Ok(id) => {
                info!(id, "User registered");
                Ok(user_key)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(error = %e, "Registration failed");
                } else {
                    debug!(error = %e, "Registration rejected");
                }
                Err(e)
            }
        }
    }

    async fn register_locked(&self, request: RegisterUser, actor: &str) -> Result<u64> {
        let display_name = self
            .within_deadline("authorization", self.auth.resolve(&request.user_key))
            .await?
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RosterError::Unauthorized(request.user_key.clone()))?;

        let record = UserRecord::from_registration(request, display_name, actor);
        self.within_deadline("save", self.store.save(record)).await
    }

    async fn within_deadline<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let deadline = self.config.dependency_timeout();
        tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| RosterError::timeout(operation, deadline))?
    }
}
