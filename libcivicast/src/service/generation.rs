//! Generation service: source resolution and curation session batches

use serde::Deserialize;
use std::ops::Range;
use std::sync::Arc;

use crate::curation::CurationSession;
use crate::error::{CivicastError, Result};
use crate::generation::{CopyGenerator, GenerationRequest};
use crate::types::{Platform, Variation};
use crate::Database;

/// Source and shape of a generation batch
///
/// Either `content` or `article_id` must be given. With an article, its
/// title and body fill whichever of `title`/`content` is absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub article_id: Option<String>,
    pub platforms: Vec<Platform>,
    pub posts_per_platform: Option<usize>,
    pub prior_variations: Vec<Variation>,
    pub steering_prompt: Option<String>,
}

struct Source {
    title: Option<String>,
    content: String,
    article_id: Option<String>,
}

#[derive(Clone)]
pub struct GenerationService {
    generator: Arc<CopyGenerator>,
    db: Arc<Database>,
}

impl GenerationService {
    pub fn new(generator: Arc<CopyGenerator>, db: Arc<Database>) -> Self {
        Self { generator, db }
    }

    async fn resolve_source(&self, params: &GenerateParams) -> Result<Source> {
        let title = non_blank(params.title.as_deref());
        let content = non_blank(params.content.as_deref());

        let Some(article_id) = non_blank(params.article_id.as_deref()) else {
            return Ok(Source {
                title,
                content: content.ok_or_else(|| {
                    CivicastError::InvalidInput("Content or article_id is required".to_string())
                })?,
                article_id: None,
            });
        };

        let article = self
            .db
            .get_article(&article_id)
            .await?
            .ok_or_else(|| CivicastError::NotFound(format!("article {}", article_id)))?;

        let content = match content {
            Some(content) => content,
            None => non_blank(Some(article.source_text())).ok_or_else(|| {
                CivicastError::InvalidInput(format!("Article {} has no content", article_id))
            })?,
        };

        Ok(Source {
            title: title.or(Some(article.title)),
            content,
            article_id: Some(article.id),
        })
    }

    /// One stateless batch
    pub async fn generate(&self, params: GenerateParams) -> Result<Vec<Variation>> {
        let source = self.resolve_source(&params).await?;
        let request = GenerationRequest {
            title: source.title,
            content: source.content,
            platforms: params.platforms,
            posts_per_platform: params.posts_per_platform,
            prior_variations: params.prior_variations,
            steering_prompt: params.steering_prompt,
        };
        self.generator.generate_variations(&request).await
    }

    /// Open a session and fill it with a first batch
    pub async fn start_session(&self, params: GenerateParams) -> Result<CurationSession> {
        let source = self.resolve_source(&params).await?;
        let platforms = self.generator.resolve_platforms(&params.platforms);

        let mut session = CurationSession::new(source.title, source.content, platforms);
        session.article_id = source.article_id;

        let request = GenerationRequest {
            title: session.title.clone(),
            content: session.content.clone(),
            platforms: session.platforms.clone(),
            posts_per_platform: params.posts_per_platform,
            prior_variations: Vec::new(),
            steering_prompt: params.steering_prompt,
        };
        let variations = self.generator.generate_variations(&request).await?;
        session.append(variations);

        tracing::info!(session_id = %session.id, variations = session.len(), "Started curation session");
        Ok(session)
    }

    /// Generate another batch for `session`, appended after existing entries
    ///
    /// Everything already in the session is passed as prior context. Returns
    /// the index range of the new entries. On error the session is unchanged.
    pub async fn generate_more(
        &self,
        session: &mut CurationSession,
        posts_per_platform: Option<usize>,
        steering_prompt: Option<String>,
    ) -> Result<Range<usize>> {
        let request = GenerationRequest {
            title: session.title.clone(),
            content: session.content.clone(),
            platforms: session.platforms.clone(),
            posts_per_platform,
            prior_variations: session.variations(),
            steering_prompt: steering_prompt.filter(|s| !s.trim().is_empty()),
        };
        let variations = self.generator.generate_variations(&request).await?;
        let start = session.append(variations);
        Ok(start..session.len())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
