//! Scheduling Orchestrator
//!
//! Every submission attempt walks the same stages:
//!
//! ```text
//! Pending -> AccountResolved | AccountMissing
//!         -> ExternalSubmitted | ExternalFailed
//!         -> Persisted | PersistFailed
//! ```
//!
//! Items are independent. A batch runs them one after another, never rolls
//! back an earlier success, and reports how many succeeded and failed.
//!
//! The local store is authoritative. A failed provider create still leaves
//! a `failed` record behind; provider update and delete calls are best
//! effort and never block the local change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::events::{Event, EventBus};
use super::validation::ValidationService;
use crate::error::{CivicastError, Result, SchedulingError};
use crate::provider::{CreatePostRequest, PublishTiming, SchedulingProvider, UpdatePostRequest};
use crate::registry::{AccountMap, AccountRegistry};
use crate::scheduling::ensure_future;
use crate::types::{Platform, Post, PostStatus};
use crate::Database;

/// Outcome of fetching accounts for one operation
pub type AccountLookup = std::result::Result<AccountMap, SchedulingError>;

/// A single post to submit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleRequest {
    pub platform: Platform,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Publish immediately when absent
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub article_id: Option<String>,
    /// Save locally only, without contacting the provider
    #[serde(default)]
    pub draft: bool,
}

impl ScheduleRequest {
    pub fn new(platform: Platform, content: impl Into<String>) -> Self {
        Self {
            platform,
            content: content.into(),
            image_url: None,
            link: None,
            scheduled_for: None,
            article_id: None,
            draft: false,
        }
    }

    fn normalized(mut self) -> Self {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        self.image_url = blank_to_none(self.image_url);
        self.link = blank_to_none(self.link);
        self.article_id = blank_to_none(self.article_id);
        self
    }
}

/// Changes to an existing post
///
/// For `image_url` and `link`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub platform: Option<Platform>,
    #[serde(default, deserialize_with = "crate::curation::double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::curation::double_option")]
    pub link: Option<Option<String>>,
    /// Reject the update unless the stored version still matches
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStage {
    Pending,
    AccountResolved,
    AccountMissing,
    ExternalSubmitted,
    ExternalFailed,
    Persisted,
    PersistFailed,
}

/// What happened to one item
#[derive(Debug, Serialize)]
pub struct ItemOutcome {
    pub index: usize,
    pub platform: Platform,
    /// Stages passed through, in order
    pub stages: Vec<AttemptStage>,
    /// The stored record, when one was written
    pub post: Option<Post>,
    pub error: Option<String>,
    #[serde(skip)]
    failure: Option<CivicastError>,
}

impl ItemOutcome {
    fn new(index: usize, platform: Platform) -> Self {
        Self {
            index,
            platform,
            stages: vec![AttemptStage::Pending],
            post: None,
            error: None,
            failure: None,
        }
    }

    fn advance(&mut self, stage: AttemptStage) {
        self.stages.push(stage);
    }

    fn fail(&mut self, error: CivicastError) {
        self.error = Some(error.to_string());
        self.failure = Some(error);
    }

    pub fn stage(&self) -> AttemptStage {
        self.stages.last().copied().unwrap_or(AttemptStage::Pending)
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// The stored post, or the error that stopped this item
    pub fn into_result(self) -> Result<Post> {
        if let Some(error) = self.failure {
            return Err(error);
        }
        self.post.ok_or_else(|| {
            CivicastError::InvalidInput("submission produced no post".to_string())
        })
    }
}

/// Aggregate result of a batch
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ItemOutcome>,
}

impl BatchSummary {
    fn from_results(results: Vec<ItemOutcome>) -> Self {
        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// How the provider side of an update or delete went
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum RemoteSync {
    /// The post was never submitted, so there was nothing to sync
    NotSubmitted,
    Synced,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub post: Post,
    pub remote: RemoteSync,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub remote: RemoteSync,
}

#[derive(Clone)]
pub struct SchedulingOrchestrator {
    db: Arc<Database>,
    provider: Arc<dyn SchedulingProvider>,
    registry: AccountRegistry,
    validation: ValidationService,
    event_bus: EventBus,
}

impl SchedulingOrchestrator {
    pub fn new(
        db: Arc<Database>,
        provider: Arc<dyn SchedulingProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            db,
            registry: AccountRegistry::new(Arc::clone(&provider)),
            provider,
            validation: ValidationService::new(),
            event_bus,
        }
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Reject a request before any external call is made
    pub fn validate_request(&self, request: &ScheduleRequest, now: DateTime<Utc>) -> Result<()> {
        if request.content.trim().is_empty() {
            return Err(CivicastError::InvalidInput("Content is required".to_string()));
        }
        self.validation
            .ensure_valid(&request.content, request.platform, request.image_url.is_some())?;
        if let Some(at) = request.scheduled_for {
            ensure_future(at, now)?;
        }
        Ok(())
    }

    /// Submit one manually composed post
    ///
    /// Validation and account lookup failures are returned without writing
    /// anything. A provider failure writes a `failed` record and returns the
    /// provider error.
    pub async fn schedule_post(&self, request: ScheduleRequest) -> Result<Post> {
        let request = request.normalized();
        self.validate_request(&request, Utc::now())?;

        let accounts: AccountLookup = if request.draft {
            Ok(AccountMap::default())
        } else {
            Ok(self.registry.snapshot().await?)
        };

        self.schedule_item(0, request, &accounts).await.into_result()
    }

    /// Submit posts one after another, isolating failures per item
    pub async fn schedule_batch(&self, requests: Vec<ScheduleRequest>) -> BatchSummary {
        let indexed = requests.into_iter().enumerate().collect();
        self.schedule_indexed(indexed).await
    }

    /// Batch over caller-chosen indices, as used for curation sessions
    pub async fn schedule_indexed(&self, requests: Vec<(usize, ScheduleRequest)>) -> BatchSummary {
        self.event_bus.emit(Event::BatchStarted {
            total: requests.len(),
        });
        info!(total = requests.len(), "Starting scheduling batch");

        let needs_accounts = requests.iter().any(|(_, r)| !r.draft);
        let accounts: AccountLookup = if needs_accounts {
            self.registry.snapshot().await
        } else {
            Ok(AccountMap::default())
        };
        if let Err(e) = &accounts {
            warn!("Account lookup failed, non-draft items will fail: {}", e);
        }

        let now = Utc::now();
        let mut results = Vec::with_capacity(requests.len());
        for (index, request) in requests {
            let request = request.normalized();
            let outcome = match self.validate_request(&request, now) {
                Ok(()) => self.schedule_item(index, request, &accounts).await,
                Err(e) => {
                    let mut outcome = ItemOutcome::new(index, request.platform);
                    outcome.fail(e);
                    outcome
                }
            };
            self.emit_item_event(&outcome);
            results.push(outcome);
        }

        let summary = BatchSummary::from_results(results);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Scheduling batch finished"
        );
        self.event_bus.emit(Event::BatchCompleted {
            succeeded: summary.succeeded,
            failed: summary.failed,
        });
        summary
    }

    /// Run one validated request through the stage machine
    pub async fn schedule_item(
        &self,
        index: usize,
        request: ScheduleRequest,
        accounts: &AccountLookup,
    ) -> ItemOutcome {
        let mut outcome = ItemOutcome::new(index, request.platform);
        let now = Utc::now();

        let mut post = Post::new(request.platform, request.content.clone());
        post.image_url = request.image_url.clone();
        post.link = request.link.clone();
        post.scheduled_for = request.scheduled_for.map(|at| at.timestamp());
        post.article_id = request.article_id.clone();
        post.created_at = now.timestamp();
        post.updated_at = post.created_at;

        if request.draft {
            post.status = PostStatus::Draft;
            self.persist(&mut outcome, post, None).await;
            return outcome;
        }

        let account_id = match accounts {
            Ok(map) => map.resolve(request.platform).map(|a| a.external_id.clone()),
            Err(e) => Err(e.clone()),
        };
        let account_id = match account_id {
            Ok(id) => {
                outcome.advance(AttemptStage::AccountResolved);
                id
            }
            Err(e) => {
                warn!(platform = %request.platform, "Account resolution failed: {}", e);
                outcome.advance(AttemptStage::AccountMissing);
                outcome.fail(e.into());
                return outcome;
            }
        };

        let create = CreatePostRequest {
            content: request.content,
            platform: request.platform,
            account_id,
            media_urls: request.image_url.into_iter().collect(),
            link: request.link,
            timing: match request.scheduled_for {
                Some(at) => PublishTiming::At(at),
                None => PublishTiming::Now,
            },
        };

        let mut upstream_error = None;
        match self.provider.create_post(&create).await {
            Ok(external_id) => {
                outcome.advance(AttemptStage::ExternalSubmitted);
                if external_id.is_none() {
                    warn!(
                        post_id = %post.id,
                        platform = %request.platform,
                        "Provider accepted post without an id; later edits stay local"
                    );
                }
                post.external_post_id = external_id;
                if request.scheduled_for.is_some() {
                    post.status = PostStatus::Scheduled;
                } else {
                    post.status = PostStatus::Published;
                    post.published_at = Some(now.timestamp());
                }
            }
            Err(e) => {
                warn!(
                    post_id = %post.id,
                    platform = %request.platform,
                    "Provider rejected post, recording as failed: {}",
                    e
                );
                outcome.advance(AttemptStage::ExternalFailed);
                post.status = PostStatus::Failed;
                post.error_message = Some(e.to_string());
                upstream_error = Some(e);
            }
        }

        self.persist(&mut outcome, post, upstream_error).await;
        outcome
    }

    async fn persist(
        &self,
        outcome: &mut ItemOutcome,
        post: Post,
        upstream_error: Option<SchedulingError>,
    ) {
        match self.db.create_post(&post).await {
            Ok(()) => {
                outcome.advance(AttemptStage::Persisted);
                outcome.post = Some(post);
                if let Some(e) = upstream_error {
                    outcome.fail(e.into());
                }
            }
            Err(e) => {
                warn!(
                    post_id = %post.id,
                    platform = %post.platform,
                    external_post_id = ?post.external_post_id,
                    "Failed to record post locally: {}",
                    e
                );
                outcome.advance(AttemptStage::PersistFailed);
                outcome.fail(e);
            }
        }
    }

    fn emit_item_event(&self, outcome: &ItemOutcome) {
        let event = match (&outcome.error, &outcome.post) {
            (None, Some(post)) => Event::ItemScheduled {
                index: outcome.index,
                platform: outcome.platform,
                post_id: post.id.clone(),
                external_post_id: post.external_post_id.clone(),
            },
            (error, _) => Event::ItemFailed {
                index: outcome.index,
                platform: outcome.platform,
                error: error.clone().unwrap_or_else(|| "unknown failure".to_string()),
            },
        };
        self.event_bus.emit(event);
    }

    /// Load a post and make sure it may still change
    async fn load_mutable(&self, post_id: &str, action: &str) -> Result<Post> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| CivicastError::NotFound(format!("post {}", post_id)))?;
        if !post.status.is_mutable() {
            return Err(CivicastError::Immutable(format!(
                "Cannot {} published posts",
                action
            )));
        }
        Ok(post)
    }

    /// Edit a post that has not been published
    ///
    /// The stored status is re-read first. The provider copy is updated best
    /// effort; the local record is updated regardless.
    pub async fn update(&self, post_id: &str, update: PostUpdate) -> Result<UpdateOutcome> {
        let current = self.load_mutable(post_id, "update").await?;

        if let Some(expected) = update.expected_version {
            if expected != current.version {
                return Err(CivicastError::Conflict(format!(
                    "post {} is at version {}, expected {}",
                    post_id, current.version, expected
                )));
            }
        }

        let now = Utc::now();
        let mut post = current.clone();
        let mut remote_change = UpdatePostRequest::default();

        if let Some(platform) = update.platform.filter(|p| *p != current.platform) {
            let submitted =
                current.external_post_id.is_some() || current.status == PostStatus::Scheduled;
            if submitted {
                return Err(CivicastError::InvalidInput(
                    "Cannot change the platform of a post already submitted".to_string(),
                ));
            }
            post.platform = platform;
        }
        if let Some(content) = update.content {
            if content.trim().is_empty() {
                return Err(CivicastError::InvalidInput("Content is required".to_string()));
            }
            if content != current.content {
                remote_change.content = Some(content.clone());
            }
            post.content = content;
        }
        if let Some(at) = update.scheduled_for {
            ensure_future(at, now)?;
            post.scheduled_for = Some(at.timestamp());
            remote_change.scheduled_for = Some(at);
        }
        if let Some(image_url) = update.image_url {
            post.image_url = image_url.filter(|s| !s.trim().is_empty());
            if post.image_url != current.image_url {
                remote_change.media_urls = Some(post.image_url.iter().cloned().collect());
            }
        }
        if let Some(link) = update.link {
            post.link = link.filter(|s| !s.trim().is_empty());
            if post.link != current.link {
                remote_change.link = Some(post.link.clone());
            }
        }

        self.validation
            .ensure_valid(&post.content, post.platform, post.image_url.is_some())?;

        let remote = match &current.external_post_id {
            None => RemoteSync::NotSubmitted,
            Some(_) if remote_change == UpdatePostRequest::default() => RemoteSync::Synced,
            Some(external_id) => match self.provider.update_post(external_id, &remote_change).await {
                Ok(()) => RemoteSync::Synced,
                Err(e) => {
                    warn!(post_id = %post.id, platform = %post.platform, "Remote update failed, updating locally only: {}", e);
                    RemoteSync::Failed(e.to_string())
                }
            },
        };

        post.updated_at = now.timestamp();
        if !self.db.update_post(&post).await? {
            return Err(CivicastError::Conflict(format!(
                "post {} was modified concurrently",
                post_id
            )));
        }
        post.version += 1;

        info!(post_id = %post.id, version = post.version, "Updated post");
        Ok(UpdateOutcome { post, remote })
    }

    /// Delete a post that has not been published
    ///
    /// Provider cancellation is attempted first and its failure is ignored.
    pub async fn delete(&self, post_id: &str) -> Result<DeleteOutcome> {
        let post = self.load_mutable(post_id, "delete").await?;

        let remote = match &post.external_post_id {
            None => RemoteSync::NotSubmitted,
            Some(external_id) => match self.provider.delete_post(external_id).await {
                Ok(()) => RemoteSync::Synced,
                Err(e) => {
                    warn!(post_id = %post.id, platform = %post.platform, "Remote delete failed, deleting locally anyway: {}", e);
                    RemoteSync::Failed(e.to_string())
                }
            },
        };

        if !self.db.delete_post(post_id).await? {
            return Err(CivicastError::NotFound(format!("post {}", post_id)));
        }

        info!(post_id = %post_id, "Deleted post");
        Ok(DeleteOutcome {
            id: post_id.to_string(),
            remote,
        })
    }
}
