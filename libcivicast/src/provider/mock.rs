//! Configurable in-process scheduling provider
//!
//! Records every call so tests can assert exactly which external requests
//! an operation issued (or that it issued none).

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{CreatePostRequest, ProviderResult, SchedulingProvider, UpdatePostRequest};
use crate::error::SchedulingError;
use crate::types::{Platform, PlatformAccount};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    ListAccounts,
    Create(CreatePostRequest),
    Update(String, UpdatePostRequest),
    Delete(String),
}

#[derive(Debug, Clone)]
pub struct MockProviderConfig {
    pub accounts: Vec<PlatformAccount>,
    /// Platforms whose create calls fail
    pub failing_platforms: HashSet<Platform>,
    /// Error returned by failing calls
    pub error: SchedulingError,
    pub fail_list_accounts: bool,
    pub fail_updates: bool,
    pub fail_deletes: bool,
    /// Accept creates without reporting a post id
    pub omit_post_ids: bool,
    pub delay: Duration,
}

impl Default for MockProviderConfig {
    fn default() -> Self {
        Self {
            accounts: Platform::ALL.iter().map(|p| active_account(*p)).collect(),
            failing_platforms: HashSet::new(),
            error: SchedulingError::Api {
                status: 500,
                message: "Mock provider failure".to_string(),
            },
            fail_list_accounts: false,
            fail_updates: false,
            fail_deletes: false,
            omit_post_ids: false,
            delay: Duration::ZERO,
        }
    }
}

/// An active account with a predictable id, `acc_<platform>`
pub fn active_account(platform: Platform) -> PlatformAccount {
    PlatformAccount {
        external_id: format!("acc_{}", platform.as_str()),
        platform,
        username: Some(format!("civic_{}", platform.as_str())),
        display_name: None,
        is_active: true,
    }
}

#[derive(Clone, Default)]
pub struct MockProvider {
    config: MockProviderConfig,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    pub fn new(config: MockProviderConfig) -> Self {
        Self {
            config,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every platform connected, every call succeeds
    pub fn success() -> Self {
        Self::default()
    }

    /// Only the given platforms have connected accounts
    pub fn with_accounts(platforms: &[Platform]) -> Self {
        Self::new(MockProviderConfig {
            accounts: platforms.iter().map(|p| active_account(*p)).collect(),
            ..Default::default()
        })
    }

    /// Create calls for `platform` fail with `message`
    pub fn failing_for(platform: Platform, message: &str) -> Self {
        Self::new(MockProviderConfig {
            failing_platforms: HashSet::from([platform]),
            error: SchedulingError::Api {
                status: 502,
                message: message.to_string(),
            },
            ..Default::default()
        })
    }

    /// Update and delete calls fail
    pub fn failing_mutations() -> Self {
        Self::new(MockProviderConfig {
            fail_updates: true,
            fail_deletes: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn create_calls(&self) -> Vec<CreatePostRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Create(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn list_accounts_call_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::ListAccounts))
    }

    /// Calls other than account listing
    pub fn mutation_call_count(&self) -> usize {
        self.count(|c| !matches!(c, ProviderCall::ListAccounts))
    }

    fn count(&self, pred: impl Fn(&ProviderCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    async fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl SchedulingProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_accounts(&self) -> ProviderResult<Vec<PlatformAccount>> {
        self.record(ProviderCall::ListAccounts).await;
        if self.config.fail_list_accounts {
            return Err(self.config.error.clone());
        }
        Ok(self.config.accounts.clone())
    }

    async fn create_post(&self, request: &CreatePostRequest) -> ProviderResult<Option<String>> {
        self.record(ProviderCall::Create(request.clone())).await;
        if self.config.failing_platforms.contains(&request.platform) {
            return Err(self.config.error.clone());
        }
        if self.config.omit_post_ids {
            return Ok(None);
        }
        let n = self.create_calls().len();
        Ok(Some(format!("ext_{}_{}", request.platform.as_str(), n)))
    }

    async fn update_post(
        &self,
        external_id: &str,
        request: &UpdatePostRequest,
    ) -> ProviderResult<()> {
        self.record(ProviderCall::Update(external_id.to_string(), request.clone()))
            .await;
        if self.config.fail_updates {
            return Err(self.config.error.clone());
        }
        Ok(())
    }

    async fn delete_post(&self, external_id: &str) -> ProviderResult<()> {
        self.record(ProviderCall::Delete(external_id.to_string())).await;
        if self.config.fail_deletes {
            return Err(self.config.error.clone());
        }
        Ok(())
    }
}
