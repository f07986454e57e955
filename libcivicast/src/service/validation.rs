//! Content validation against platform rules
//!
//! Errors block scheduling. Warnings are advisory and only reported.

use serde::Serialize;

use crate::error::{CivicastError, Result};
use crate::types::Platform;

/// Share of the character limit above which a warning is issued
const NEAR_LIMIT_RATIO: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub content: String,
    pub platforms: Vec<Platform>,
    pub has_media: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub results: Vec<PlatformValidation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformValidation {
    pub platform: Platform,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Default)]
pub struct ValidationService;

impl ValidationService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, request: &ValidationRequest) -> ValidationResponse {
        let results: Vec<PlatformValidation> = request
            .platforms
            .iter()
            .map(|p| self.validate_for(&request.content, *p, request.has_media))
            .collect();
        ValidationResponse {
            valid: results.iter().all(|r| r.valid),
            results,
        }
    }

    pub fn validate_for(&self, content: &str, platform: Platform, has_media: bool) -> PlatformValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let chars = content.chars().count();
        let limit = platform.character_limit();

        if content.trim().is_empty() {
            errors.push("Content cannot be empty".to_string());
        } else if chars > limit {
            errors.push(format!(
                "Content is {} characters; {} allows at most {}",
                chars,
                platform.display_name(),
                limit
            ));
        } else if chars as f64 > limit as f64 * NEAR_LIMIT_RATIO {
            warnings.push(format!(
                "Content is close to the {} limit ({}/{})",
                platform.display_name(),
                chars,
                limit
            ));
        }

        if platform == Platform::Instagram && !has_media {
            warnings.push("Instagram posts without an image may be rejected by the provider".to_string());
        }

        PlatformValidation {
            platform,
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Fail with the first blocking error for `platform`
    pub fn ensure_valid(&self, content: &str, platform: Platform, has_media: bool) -> Result<()> {
        let result = self.validate_for(content, platform, has_media);
        for warning in &result.warnings {
            tracing::debug!(platform = %platform, "{}", warning);
        }
        match result.errors.into_iter().next() {
            Some(error) => Err(CivicastError::InvalidInput(error)),
            None => Ok(()),
        }
    }
}
