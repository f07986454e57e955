//! Core types for Civicast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rhetorical framings cycled through when generating copy
pub const ANGLES: [&str; 10] = [
    "Question Hook",
    "Statistic/Data",
    "Story/Narrative",
    "Problem/Solution",
    "Hot Take",
    "How-To",
    "List/Thread",
    "Quote/Insight",
    "Behind-the-Scenes",
    "Call-to-Action",
];

// ============================================================================
// Platforms
// ============================================================================

/// A supported social network
///
/// Parsing is case-insensitive and accepts the provider aliases
/// (`x`, `fb`, `ig`, `li`), so every caller normalizes the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Platform {
    Twitter,
    Facebook,
    Linkedin,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Facebook,
        Platform::Linkedin,
        Platform::Instagram,
    ];

    /// Identifier in the scheduling provider's vocabulary
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Linkedin => "linkedin",
            Platform::Instagram => "instagram",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter/X",
            Platform::Facebook => "Facebook",
            Platform::Linkedin => "LinkedIn",
            Platform::Instagram => "Instagram",
        }
    }

    /// Maximum post length in characters
    pub fn character_limit(&self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::Facebook => 63_206,
            Platform::Linkedin => 3_000,
            Platform::Instagram => 2_200,
        }
    }

    /// Parse a comma-separated list, dropping duplicates and keeping order
    pub fn parse_list(input: &str) -> Result<Vec<Platform>, String> {
        let mut platforms = Vec::new();
        for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let platform: Platform = name.parse()?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "facebook" | "fb" => Ok(Platform::Facebook),
            "linkedin" | "li" => Ok(Platform::Linkedin),
            "instagram" | "ig" => Ok(Platform::Instagram),
            other => Err(format!(
                "Unknown platform '{}'. Valid options: twitter, facebook, linkedin, instagram",
                other
            )),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    pub const ALL: [PostStatus; 4] = [
        PostStatus::Draft,
        PostStatus::Scheduled,
        PostStatus::Published,
        PostStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    /// Published posts can no longer be edited or deleted
    pub fn is_mutable(&self) -> bool {
        !matches!(self, PostStatus::Published)
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "published" => Ok(PostStatus::Published),
            "failed" => Ok(PostStatus::Failed),
            other => Err(format!(
                "Unknown status '{}'. Valid options: draft, scheduled, published, failed",
                other
            )),
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one social media submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub platform: Platform,
    pub content: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    /// Unix seconds
    pub scheduled_for: Option<i64>,
    pub published_at: Option<i64>,
    pub external_post_id: Option<String>,
    pub status: PostStatus,
    pub article_id: Option<String>,
    /// Provider error recorded when the external call failed
    pub error_message: Option<String>,
    /// Incremented on every local update
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn new(platform: Platform, content: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            platform,
            content,
            image_url: None,
            link: None,
            scheduled_for: None,
            published_at: None,
            external_post_id: None,
            status: PostStatus::Draft,
            article_id: None,
            error_message: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Variations
// ============================================================================

/// An uncommitted candidate post produced by the copy generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub angle: String,
    pub platform: Platform,
    pub text: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Variation {
    pub fn new(platform: Platform, angle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            angle: angle.into(),
            platform,
            text: text.into(),
            rationale: String::new(),
            selected: false,
            image_url: None,
            link: None,
        }
    }

    pub fn fits_platform(&self) -> bool {
        self.text.chars().count() <= self.platform.character_limit()
    }
}

// ============================================================================
// External records
// ============================================================================

/// A connected account at the scheduling provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAccount {
    pub external_id: String,
    pub platform: Platform,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub is_active: bool,
}

/// Source article used to ground generated copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: String,
    pub created_at: i64,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            slug,
            content: content.into(),
            excerpt: None,
            status: "draft".to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Body text for prompting, falling back to the excerpt
    pub fn source_text(&self) -> &str {
        if self.content.trim().is_empty() {
            self.excerpt.as_deref().unwrap_or("")
        } else {
            &self.content
        }
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
