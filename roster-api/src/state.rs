//! App state: user service, backing stores, config.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use roster_auth::{AuthConfig, HttpAuthorizationClient, StaticAuthorizer};
use roster_cache::{CacheConfig, MemoryCacheStore};
use roster_core::constants::{
    AUTH_TIMEOUT_SECONDS, CACHE_MAX_ENTRIES, CACHE_TTL_SECONDS, DEPENDENCY_TIMEOUT_MS,
    LOCK_LEASE_SECONDS, LOCK_REGISTRY_PREFIX,
};
use roster_core::error::Result;
use roster_core::traits::{AuthorizationClient, UserStore};
use roster_lock::{LockConfig, MemoryLockService};
use roster_service::{UserService, WorkflowConfig};
use roster_store::{FileUserStore, MemoryUserStore};

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub auth_base_url: Option<String>,
    pub auth_allowlist: Option<String>,
    pub auth_timeout_seconds: u64,
    pub store_path: Option<PathBuf>,
    pub lock_lease_seconds: u64,
    pub cache_max_entries: usize,
    pub cache_ttl_seconds: u64,
    pub dependency_timeout_ms: u64,
    pub enable_cache: bool,
    /// Login ids allowed to delete users other than themselves
    pub admin_login_ids: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_base_url: None,
            auth_allowlist: None,
            auth_timeout_seconds: AUTH_TIMEOUT_SECONDS,
            store_path: None,
            lock_lease_seconds: LOCK_LEASE_SECONDS,
            cache_max_entries: CACHE_MAX_ENTRIES,
            cache_ttl_seconds: CACHE_TTL_SECONDS,
            dependency_timeout_ms: DEPENDENCY_TIMEOUT_MS,
            enable_cache: true,
            admin_login_ids: Vec::new(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            auth_base_url: non_empty_var("AUTH_BASE_URL"),
            auth_allowlist: non_empty_var("AUTH_ALLOWLIST"),
            auth_timeout_seconds: parsed_var("AUTH_TIMEOUT_SECONDS", AUTH_TIMEOUT_SECONDS),
            store_path: non_empty_var("STORE_PATH").map(PathBuf::from),
            lock_lease_seconds: parsed_var("LOCK_LEASE_SECONDS", LOCK_LEASE_SECONDS),
            cache_max_entries: parsed_var("CACHE_MAX_ENTRIES", CACHE_MAX_ENTRIES),
            cache_ttl_seconds: parsed_var("CACHE_TTL_SECONDS", CACHE_TTL_SECONDS),
            dependency_timeout_ms: parsed_var("DEPENDENCY_TIMEOUT_MS", DEPENDENCY_TIMEOUT_MS),
            enable_cache: std::env::var("ENABLE_CACHE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            admin_login_ids: non_empty_var("ADMIN_LOGIN_IDS")
                .map(|ids| {
                    ids.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Returns true if `actor` may delete `user_key`: users may delete
    /// themselves, admins may delete anyone.
    pub fn may_remove(&self, actor: &str, user_key: &str) -> bool {
        actor == user_key || self.admin_login_ids.iter().any(|id| id == actor)
    }

    fn authorizer(&self) -> Result<Arc<dyn AuthorizationClient>> {
        if let Some(base_url) = &self.auth_base_url {
            let config = AuthConfig::new(base_url.as_str()).with_timeout(self.auth_timeout_seconds);
            let client = HttpAuthorizationClient::with_config(config)?;
            info!(endpoint = %client.endpoint(), "Using HTTP authorization");
            return Ok(Arc::new(client));
        }

        let table = StaticAuthorizer::from_allowlist(self.auth_allowlist.as_deref().unwrap_or(""))?;
        if table.is_empty() {
            warn!("No AUTH_BASE_URL or AUTH_ALLOWLIST set; every registration will be unauthorized");
        } else {
            info!(entries = table.len(), "Using static authorization table");
        }
        Ok(Arc::new(table))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(setting = name, value = %raw, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

pub struct AppState {
    pub config: ApiConfig,
    pub service: UserService,
    pub cache: Option<Arc<MemoryCacheStore>>,
    pub file_store: Option<Arc<FileUserStore>>,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the service from configuration.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let workflow = WorkflowConfig {
            dependency_timeout_ms: config.dependency_timeout_ms,
        };
        let lock_config = LockConfig {
            prefix: LOCK_REGISTRY_PREFIX.into(),
            lease_seconds: config.lock_lease_seconds,
        };
        lock_config.validate(workflow.max_lock_hold())?;
        let locks = Arc::new(MemoryLockService::with_config(lock_config));

        let (store, file_store): (Arc<dyn UserStore>, Option<Arc<FileUserStore>>) = match &config.store_path {
            Some(path) => {
                let file = Arc::new(FileUserStore::new(path).await?);
                info!(path = %path.display(), users = file.len(), "Opened user file");
                let store: Arc<dyn UserStore> = file.clone();
                (store, Some(file))
            }
            None => (Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>, None),
        };

        let mut service = UserService::new(locks, config.authorizer()?, store).with_config(workflow);

        let cache = if config.enable_cache {
            let cache = Arc::new(MemoryCacheStore::with_config(CacheConfig {
                capacity: config.cache_max_entries,
                ttl_seconds: config.cache_ttl_seconds,
            }));
            service = service.with_cache(cache.clone());
            Some(cache)
        } else {
            None
        };

        Ok(Self {
            config,
            service,
            cache,
            file_store,
            started_at: Instant::now(),
        })
    }

    /// Persists any unsaved store changes.
    pub async fn flush(&self) -> Result<()> {
        match &self.file_store {
            Some(store) => store.flush().await,
            None => Ok(()),
        }
    }
}
