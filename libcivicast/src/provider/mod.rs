//! Scheduling provider abstraction
//!
//! The provider owns delivery: this crate only submits content with the
//! desired timestamp and never polls for the outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SchedulingError;
use crate::types::{Platform, PlatformAccount};

pub mod late;

// Available outside tests so integration tests and the server tests can use it
pub mod mock;

pub use late::LateClient;
pub use mock::{MockProvider, MockProviderConfig};

pub type ProviderResult<T> = std::result::Result<T, SchedulingError>;

/// When the provider should publish
#[derive(Debug, Clone, PartialEq)]
pub enum PublishTiming {
    Now,
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePostRequest {
    pub content: String,
    pub platform: Platform,
    pub account_id: String,
    pub media_urls: Vec<String>,
    pub link: Option<String>,
    pub timing: PublishTiming,
}

/// Fields to change on an already submitted post
///
/// `None` leaves the remote value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub media_urls: Option<Vec<String>>,
    /// `Some(None)` removes the link
    pub link: Option<Option<String>>,
}

/// A social scheduling service with connected accounts
#[async_trait]
pub trait SchedulingProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Accounts connected at the provider
    async fn list_accounts(&self) -> ProviderResult<Vec<PlatformAccount>>;

    /// Submit a post, returning the provider's post id
    ///
    /// `None` means the provider accepted the post without reporting an id.
    async fn create_post(&self, request: &CreatePostRequest) -> ProviderResult<Option<String>>;

    async fn update_post(&self, external_id: &str, request: &UpdatePostRequest)
        -> ProviderResult<()>;

    async fn delete_post(&self, external_id: &str) -> ProviderResult<()>;
}
