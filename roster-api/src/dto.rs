//! DTOs for API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_cache::CacheStats;
use roster_core::types::{DeleteFlag, UserRecord, UserStatistics};

/// Request to register the calling user.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Invitation code of the inviting user
    #[serde(default)]
    pub invitor_no: String,
}

/// Response for registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Key of the registered (or in-flight) user
    pub user_key: String,
}

/// A user record as exposed over the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: u64,
    pub user_key: String,
    pub display_name: String,
    pub invitor_no: String,
    pub version: u32,
    pub deleted: DeleteFlag,
    pub created_by: String,
    pub modified_by: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<UserRecord> for UserDto {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            user_key: record.user_key,
            display_name: record.display_name,
            invitor_no: record.invitor_no,
            version: record.version,
            deleted: record.deleted,
            created_by: record.created_by,
            modified_by: record.modified_by,
            created_at: record.created_at,
            modified_at: record.modified_at,
        }
    }
}

/// Query parameters for listing users.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size (default 20)
    pub page_size: Option<u32>,
    /// Filter: exact display name
    pub display_name: Option<String>,
    /// Filter: exact invitation code
    pub invitor_no: Option<String>,
}

/// Response for listing users.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    /// Users on this page
    pub items: Vec<UserDto>,
    /// Total matching users
    pub total: u64,
    /// Page number
    pub page: i64,
    /// Page size
    pub page_size: u32,
    /// Number of pages
    pub page_count: u64,
}

/// Response for deleting a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    /// Key of the deleted user
    pub user_key: String,
    /// Always true; a missing user is a 404
    pub deleted: bool,
}

/// Response for user statistics.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Record counts
    #[serde(flatten)]
    pub users: UserStatistics,
    /// Cache counters, when the cache is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Live users in the store
    pub users_count: u64,
    /// Whether lookups go through the cache
    pub cache_enabled: bool,
}
