//! Platform account resolution
//!
//! Accounts are fetched once per scheduling operation into an [`AccountMap`]
//! which is then passed explicitly to every item in that operation. Nothing
//! is cached between operations, so a reconnected account is picked up on
//! the next call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchedulingError;
use crate::provider::{ProviderResult, SchedulingProvider};
use crate::types::{Platform, PlatformAccount};

/// Snapshot of active accounts keyed by platform
#[derive(Debug, Clone, Default)]
pub struct AccountMap {
    accounts: HashMap<Platform, PlatformAccount>,
}

impl AccountMap {
    /// Keep the first active account per platform
    pub fn from_accounts(accounts: impl IntoIterator<Item = PlatformAccount>) -> Self {
        let mut map = HashMap::new();
        for account in accounts.into_iter().filter(|a| a.is_active) {
            map.entry(account.platform).or_insert(account);
        }
        Self { accounts: map }
    }

    pub fn resolve(&self, platform: Platform) -> Result<&PlatformAccount, SchedulingError> {
        self.accounts
            .get(&platform)
            .ok_or_else(|| SchedulingError::AccountMissing(platform.as_str().to_string()))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.accounts.keys().copied().collect();
        platforms.sort();
        platforms
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[derive(Clone)]
pub struct AccountRegistry {
    provider: Arc<dyn SchedulingProvider>,
}

impl AccountRegistry {
    pub fn new(provider: Arc<dyn SchedulingProvider>) -> Self {
        Self { provider }
    }

    /// Every connected account, active or not
    pub async fn list(&self) -> ProviderResult<Vec<PlatformAccount>> {
        self.provider.list_accounts().await
    }

    /// Fetch a fresh account snapshot for one operation
    pub async fn snapshot(&self) -> ProviderResult<AccountMap> {
        let accounts = self.provider.list_accounts().await?;
        let map = AccountMap::from_accounts(accounts);
        tracing::debug!(platforms = ?map.platforms(), "Resolved platform accounts");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::active_account;
    use crate::provider::MockProvider;

    #[test]
    fn test_resolve_missing_platform() {
        let map = AccountMap::from_accounts(vec![active_account(Platform::Twitter)]);
        assert_eq!(map.resolve(Platform::Twitter).unwrap().external_id, "acc_twitter");
        let err = map.resolve(Platform::Instagram).unwrap_err();
        assert!(matches!(err, SchedulingError::AccountMissing(ref p) if p == "instagram"));
    }

    #[test]
    fn test_inactive_accounts_are_ignored() {
        let mut inactive = active_account(Platform::Linkedin);
        inactive.is_active = false;
        let map = AccountMap::from_accounts(vec![inactive]);
        assert!(map.is_empty());
        assert!(map.resolve(Platform::Linkedin).is_err());
    }

    #[test]
    fn test_first_active_account_wins() {
        let mut first = active_account(Platform::Facebook);
        first.external_id = "first".to_string();
        let mut second = active_account(Platform::Facebook);
        second.external_id = "second".to_string();
        let map = AccountMap::from_accounts(vec![first, second]);
        assert_eq!(map.resolve(Platform::Facebook).unwrap().external_id, "first");
    }

    #[tokio::test]
    async fn test_snapshot_fetches_each_time() {
        let provider = MockProvider::with_accounts(&[Platform::Twitter, Platform::Facebook]);
        let registry = AccountRegistry::new(Arc::new(provider.clone()));

        let map = registry.snapshot().await.unwrap();
        assert_eq!(map.platforms(), vec![Platform::Twitter, Platform::Facebook]);
        registry.snapshot().await.unwrap();
        assert_eq!(provider.list_accounts_call_count(), 2);
    }
}
