//! Copy Generator
//!
//! Builds one structured prompt per batch, sends it to a text-generation
//! provider and validates the reply into [`Variation`]s. Provider failures
//! are returned to the caller; malformed replies are never errors and fall
//! back to template copy instead.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::{CivicastError, GenerationError, Result};
use crate::types::{Platform, Variation};

pub mod fallback;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod prompt;

pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;

/// A chat-style completion backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, user: &str)
        -> std::result::Result<String, GenerationError>;
}

/// Input to one generation batch
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub title: Option<String>,
    pub content: String,
    /// Empty means the configured default set
    pub platforms: Vec<Platform>,
    /// `None` means the configured default
    pub posts_per_platform: Option<usize>,
    /// Earlier variations whose angles and openings must not be repeated
    pub prior_variations: Vec<Variation>,
    pub steering_prompt: Option<String>,
}

pub struct CopyGenerator {
    backend: Arc<dyn TextGenerator>,
    config: GenerationConfig,
    default_platforms: Vec<Platform>,
}

impl CopyGenerator {
    pub fn new(
        backend: Arc<dyn TextGenerator>,
        config: GenerationConfig,
        default_platforms: Vec<Platform>,
    ) -> Self {
        Self {
            backend,
            config,
            default_platforms,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate one batch of variations
    ///
    /// Every requested platform receives at least one variation.
    pub async fn generate_variations(&self, request: &GenerationRequest) -> Result<Vec<Variation>> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(CivicastError::InvalidInput("Content is required".to_string()));
        }

        let platforms = self.resolve_platforms(&request.platforms);
        let posts_per_platform = request
            .posts_per_platform
            .unwrap_or(self.config.posts_per_platform);
        if posts_per_platform == 0 || posts_per_platform > self.config.max_variations {
            return Err(CivicastError::InvalidInput(format!(
                "posts_per_platform must be between 1 and {}",
                self.config.max_variations
            )));
        }

        let content = truncate_source(content, self.config.max_source_chars);
        let title = request.title.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let user_prompt = prompt::build_user_prompt(&prompt::PromptInput {
            title,
            content: &content,
            platforms: &platforms,
            posts_per_platform,
            prior: &request.prior_variations,
            steering_prompt: request.steering_prompt.as_deref(),
        });

        tracing::info!(
            platforms = ?platforms,
            posts_per_platform,
            prior = request.prior_variations.len(),
            "Generating variations"
        );

        let raw = self
            .backend
            .complete(prompt::SYSTEM_PROMPT, &user_prompt)
            .await?;

        let options = parse::NormalizeOptions {
            platforms: &platforms,
            posts_per_platform,
            max_variations: self.config.max_variations,
        };

        let mut variations = match parse::extract_json_array(&raw) {
            Some(items) => parse::normalize_items(&items, &options),
            None => {
                tracing::warn!(
                    reply_chars = raw.chars().count(),
                    "Model reply was not a JSON array, using template copy"
                );
                Vec::new()
            }
        };

        let covered: HashSet<Platform> = variations.iter().map(|v| v.platform).collect();
        let missing: Vec<Platform> = platforms
            .iter()
            .copied()
            .filter(|p| !covered.contains(p))
            .collect();
        if !missing.is_empty() {
            if !variations.is_empty() {
                tracing::warn!(platforms = ?missing, "Model reply skipped platforms, adding template copy");
            }
            let extra = fallback::fallback_variations(title, &content, &missing, posts_per_platform);
            let room = self.config.max_variations.saturating_sub(variations.len());
            let extra = dedupe_against(&variations, extra);
            variations.extend(top_up(extra, &missing, room));
        }

        tracing::info!(count = variations.len(), "Generated variations");
        Ok(variations)
    }

    /// Requested platforms deduplicated, or the defaults when none are given
    pub fn resolve_platforms(&self, requested: &[Platform]) -> Vec<Platform> {
        let source = if requested.is_empty() {
            &self.default_platforms
        } else {
            requested
        };
        let mut platforms = Vec::new();
        for p in source {
            if !platforms.contains(p) {
                platforms.push(*p);
            }
        }
        if platforms.is_empty() {
            Platform::ALL.to_vec()
        } else {
            platforms
        }
    }
}

fn dedupe_against(existing: &[Variation], extra: Vec<Variation>) -> Vec<Variation> {
    extra
        .into_iter()
        .filter(|v| {
            !existing
                .iter()
                .any(|e| e.platform == v.platform && e.angle.eq_ignore_ascii_case(&v.angle))
        })
        .collect()
}

/// Template copy to append for uncovered platforms
///
/// Coverage wins over the cap: one template per missing platform is always
/// kept, then the remaining `room` is filled in template order.
fn top_up(extra: Vec<Variation>, missing: &[Platform], room: usize) -> Vec<Variation> {
    let mut chosen: Vec<Variation> = Vec::new();
    let mut rest = Vec::new();
    for variation in extra {
        let first_for_platform = missing.contains(&variation.platform)
            && !chosen.iter().any(|c| c.platform == variation.platform);
        if first_for_platform {
            chosen.push(variation);
        } else {
            rest.push(variation);
        }
    }
    let remaining = room.saturating_sub(chosen.len());
    chosen.extend(rest.into_iter().take(remaining));
    chosen.sort_by_key(|v| missing.iter().position(|p| *p == v.platform));
    chosen
}

/// Limit prompt source text to `max_chars` characters
fn truncate_source(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            tracing::debug!(max_chars, "Truncating source text for prompt");
            content[..byte_index].to_string()
        }
        None => content.to_string(),
    }
}
