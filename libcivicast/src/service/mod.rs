//! Service layer for Civicast
//!
//! `CivicastService` is the single entry point shared by the HTTP server and
//! the CLI. It owns the shared resources and hands out the sub-services:
//!
//! - `GenerationService`: copy generation and curation session batches
//! - `SchedulingOrchestrator`: create, update and delete against the provider
//! - `HistoryService`: listing, lookup and stats over the post store
//! - `ValidationService`: platform character limits
//! - `EventBus`: batch progress events
//!
//! # Example
//!
//! ```no_run
//! use libcivicast::service::CivicastService;
//! use libcivicast::service::orchestrator::ScheduleRequest;
//! use libcivicast::Platform;
//!
//! # async fn example() -> libcivicast::Result<()> {
//! let service = CivicastService::new().await?;
//!
//! let post = service
//!     .orchestrator()
//!     .schedule_post(ScheduleRequest::new(Platform::Facebook, "The pool reopens today"))
//!     .await?;
//! println!("{} is {}", post.id, post.status);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod generation;
pub mod history;
pub mod orchestrator;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use self::events::{EventBus, EventReceiver};
use self::generation::GenerationService;
use self::history::HistoryService;
use self::orchestrator::{BatchSummary, ScheduleRequest, SchedulingOrchestrator};
use self::validation::ValidationService;
use crate::curation::CurationSession;
use crate::error::{CivicastError, Result};
use crate::generation::{CopyGenerator, OpenAiGenerator, TextGenerator};
use crate::media::MediaStore;
use crate::provider::{LateClient, SchedulingProvider};
use crate::{Config, Database};

/// Options applied to every item when scheduling a session's selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionScheduleOptions {
    /// Publish immediately when absent
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Overrides the session's own article
    pub article_id: Option<String>,
}

pub struct CivicastService {
    db: Arc<Database>,
    config: Arc<Config>,
    generation: GenerationService,
    orchestrator: SchedulingOrchestrator,
    history: HistoryService,
    validation: ValidationService,
    media: MediaStore,
    event_bus: EventBus,
}

impl CivicastService {
    /// Load configuration from the default location and connect everything
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Connect the real collaborators described by `config`
    ///
    /// Fails with a missing-field error when either API key is unset.
    pub async fn from_config(config: Config) -> Result<Self> {
        let provider = LateClient::from_config(&config.scheduling)?;
        let backend = OpenAiGenerator::from_config(&config.generation)?;
        let db = Database::new(&config.database.path).await?;
        Ok(Self::with_components(
            config,
            db,
            Arc::new(provider),
            Arc::new(backend),
        ))
    }

    /// Assemble the service around explicit collaborators
    pub fn with_components(
        config: Config,
        db: Database,
        provider: Arc<dyn SchedulingProvider>,
        backend: Arc<dyn TextGenerator>,
    ) -> Self {
        let db = Arc::new(db);
        let event_bus = EventBus::new(100);

        let generator = CopyGenerator::new(
            backend,
            config.generation.clone(),
            config.default_platforms(),
        );
        let generation = GenerationService::new(Arc::new(generator), Arc::clone(&db));
        let orchestrator =
            SchedulingOrchestrator::new(Arc::clone(&db), provider, event_bus.clone());
        let history = HistoryService::new(Arc::clone(&db), config.server.max_page_size);
        let media = MediaStore::new(&config.media);

        Self {
            db,
            config: Arc::new(config),
            generation,
            orchestrator,
            history,
            validation: ValidationService::new(),
            media,
            event_bus,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn generation(&self) -> &GenerationService {
        &self.generation
    }

    pub fn orchestrator(&self) -> &SchedulingOrchestrator {
        &self.orchestrator
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub fn validation(&self) -> &ValidationService {
        &self.validation
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Receive progress events from batch scheduling
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Schedule every selected, not yet converted entry of `session`
    ///
    /// Entries that produce a post are locked to it. Failed entries stay
    /// selected so the operator can fix and retry them.
    pub async fn schedule_session(
        &self,
        session: &mut CurationSession,
        options: SessionScheduleOptions,
    ) -> Result<BatchSummary> {
        let indices = session.pending_selection();
        if indices.is_empty() {
            return Err(CivicastError::InvalidInput(
                "No variations selected".to_string(),
            ));
        }

        let article_id = options.article_id.or_else(|| session.article_id.clone());
        let mut requests = Vec::with_capacity(indices.len());
        for index in indices {
            let variation = &session.get(index)?.variation;
            requests.push((
                index,
                ScheduleRequest {
                    image_url: variation.image_url.clone(),
                    link: variation.link.clone(),
                    scheduled_for: options.scheduled_for,
                    article_id: article_id.clone(),
                    ..ScheduleRequest::new(variation.platform, variation.text.clone())
                },
            ));
        }

        let summary = self.orchestrator.schedule_indexed(requests).await;
        for outcome in summary.results.iter().filter(|o| o.succeeded()) {
            if let Some(post) = &outcome.post {
                session.mark_converted(outcome.index, post.id.clone())?;
            }
        }

        tracing::info!(
            session_id = %session.id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Scheduled session selection"
        );
        Ok(summary)
    }
}
