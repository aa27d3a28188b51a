//! Fixed authorization table.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use roster_core::error::{Result, RosterError};
use roster_core::traits::AuthorizationClient;

/// Authorizer backed by a fixed key → display name table.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthorizer {
    names: HashMap<String, String>,
}

impl StaticAuthorizer {
    /// Creates an empty table; every key is unauthorized.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn with(mut self, user_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.names.insert(user_key.into(), display_name.into());
        self
    }

    /// Parses `key=Name,key2=Name2`.
    ///
    /// Whitespace around entries is trimmed and empty entries are skipped.
    pub fn from_allowlist(list: &str) -> Result<Self> {
        let mut names = HashMap::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, name) = entry
                .split_once('=')
                .ok_or_else(|| RosterError::Config(format!("allowlist entry '{}' is missing '='", entry)))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(RosterError::Config(format!("allowlist entry '{}' has an empty key", entry)));
            }
            names.insert(key.to_string(), name.trim().to_string());
        }
        Ok(Self { names })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no key is authorized.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for StaticAuthorizer {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AuthorizationClient for StaticAuthorizer {
    async fn resolve(&self, user_key: &str) -> Result<Option<String>> {
        let name = self
            .names
            .get(user_key)
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        debug!(user_key, authorized = name.is_some(), "Static authorization");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve() {
        let auth = StaticAuthorizer::new().with("U1", "Alice").with("U2", "  ");

        assert_eq!(auth.resolve("U1").await.unwrap().as_deref(), Some("Alice"));
        assert_eq!(auth.resolve("U2").await.unwrap(), None);
        assert_eq!(auth.resolve("U3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_from_allowlist() {
        let auth = StaticAuthorizer::from_allowlist(" U1=Alice , U2=Bob Smith,, ").unwrap();

        assert_eq!(auth.len(), 2);
        assert_eq!(auth.resolve("U2").await.unwrap().as_deref(), Some("Bob Smith"));
    }

    #[test]
    fn test_from_allowlist_rejects_malformed() {
        assert!(matches!(StaticAuthorizer::from_allowlist("U1"), Err(RosterError::Config(_))));
        assert!(matches!(StaticAuthorizer::from_allowlist("=Alice"), Err(RosterError::Config(_))));
        assert!(StaticAuthorizer::from_allowlist("").unwrap().is_empty());
    }

    #[test]
    fn test_from_iterator() {
        let auth: StaticAuthorizer = vec![("U1".to_string(), "Alice".to_string())].into_iter().collect();
        assert_eq!(auth.len(), 1);
    }
}
