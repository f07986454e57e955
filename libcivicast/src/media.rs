//! Local media store for images and video attached to posts

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::MediaConfig;
use crate::error::{MediaError, Result};

/// Upload types the scheduling provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    WebP,
    Mp4,
    QuickTime,
    Mpeg,
}

impl MediaType {
    pub fn from_mime_str(s: &str) -> Option<Self> {
        // Ignore parameters such as "; charset=binary"
        let essence = s.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            "video/mp4" => Some(Self::Mp4),
            "video/quicktime" => Some(Self::QuickTime),
            "video/mpeg" => Some(Self::Mpeg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Mp4 => "video/mp4",
            Self::QuickTime => "video/quicktime",
            Self::Mpeg => "video/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Mp4 => "mp4",
            Self::QuickTime => "mov",
            Self::Mpeg => "mpeg",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Mp4 | Self::QuickTime | Self::Mpeg)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMedia {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            dir: PathBuf::from(shellexpand::tilde(&config.dir).to_string()),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check size and type without touching disk
    pub fn validate(&self, content_type: &str, size: usize) -> Result<MediaType> {
        if size > self.max_bytes {
            return Err(MediaError::TooLarge {
                size,
                limit: self.max_bytes,
            }
            .into());
        }
        MediaType::from_mime_str(content_type)
            .ok_or_else(|| MediaError::UnsupportedType(content_type.to_string()).into())
    }

    /// Write the upload under a unique name and return its public URL
    pub async fn store(&self, content_type: &str, bytes: &[u8]) -> Result<StoredMedia> {
        let media_type = self.validate(content_type, bytes.len())?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(MediaError::Io)?;

        let file_name = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            media_type.extension()
        );
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await.map_err(MediaError::Io)?;

        tracing::info!(file = %file_name, size = bytes.len(), content_type = %media_type, "Stored media");

        Ok(StoredMedia {
            url: format!("{}/{}", self.public_base_url, file_name),
            file_name,
            content_type: media_type.as_str().to_string(),
            size: bytes.len(),
        })
    }
}
