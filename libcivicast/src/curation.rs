//! Variation Curation Store
//!
//! An append-only list of generated variations for one operator session.
//! Indices never change: new batches are concatenated, and an entry that
//! has been turned into a post stays in place but is locked.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CivicastError, Result};
use crate::types::{Platform, Variation};

/// A variation plus the post it became, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationEntry {
    #[serde(flatten)]
    pub variation: Variation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
}

impl CurationEntry {
    pub fn is_converted(&self) -> bool {
        self.post_id.is_some()
    }
}

/// Field overrides for [`CurationSession::edit`]
///
/// For `image_url` and `link`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariationEdit {
    pub text: Option<String>,
    pub angle: Option<String>,
    pub platform: Option<Platform>,
    pub rationale: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub link: Option<Option<String>>,
}

/// Distinguish an absent field from an explicit `null`
pub(crate) fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct CurationSession {
    pub id: Uuid,
    /// Source the batches were generated from, reused for "generate more"
    pub title: Option<String>,
    pub content: String,
    pub article_id: Option<String>,
    pub platforms: Vec<Platform>,
    pub entries: Vec<CurationEntry>,
    pub created_at: i64,
}

impl CurationSession {
    pub fn new(title: Option<String>, content: String, platforms: Vec<Platform>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            article_id: None,
            platforms,
            entries: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a batch after existing entries; returns the index of its first item
    pub fn append(&mut self, variations: Vec<Variation>) -> usize {
        let start = self.entries.len();
        self.entries
            .extend(variations.into_iter().map(|variation| CurationEntry {
                variation,
                post_id: None,
            }));
        start
    }

    pub fn variations(&self) -> Vec<Variation> {
        self.entries.iter().map(|e| e.variation.clone()).collect()
    }

    pub fn get(&self, index: usize) -> Result<&CurationEntry> {
        self.entries
            .get(index)
            .ok_or_else(|| CivicastError::NotFound(format!("variation {}", index)))
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut CurationEntry> {
        self.entries
            .get_mut(index)
            .ok_or_else(|| CivicastError::NotFound(format!("variation {}", index)))
    }

    /// Flip selection; returns the new state
    pub fn toggle_select(&mut self, index: usize) -> Result<bool> {
        let entry = self.get_mut(index)?;
        entry.variation.selected = !entry.variation.selected;
        Ok(entry.variation.selected)
    }

    /// Select every entry not yet converted
    pub fn select_all(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| !e.is_converted()) {
            entry.variation.selected = true;
        }
    }

    pub fn deselect_all(&mut self) {
        for entry in &mut self.entries {
            entry.variation.selected = false;
        }
    }

    /// Overwrite fields of an entry that has not been converted yet
    pub fn edit(&mut self, index: usize, edit: VariationEdit) -> Result<&Variation> {
        let entry = self.get_mut(index)?;
        if entry.is_converted() {
            return Err(CivicastError::InvalidInput(format!(
                "Variation {} was already scheduled and can no longer be edited",
                index
            )));
        }

        let v = &mut entry.variation;
        if let Some(text) = edit.text {
            v.text = text;
        }
        if let Some(angle) = edit.angle {
            v.angle = angle;
        }
        if let Some(platform) = edit.platform {
            v.platform = platform;
        }
        if let Some(rationale) = edit.rationale {
            v.rationale = rationale;
        }
        if let Some(image_url) = edit.image_url {
            v.image_url = image_url;
        }
        if let Some(link) = edit.link {
            v.link = link;
        }
        Ok(&entry.variation)
    }

    /// Indices of selected entries still awaiting scheduling
    pub fn pending_selection(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.variation.selected && !e.is_converted())
            .map(|(i, _)| i)
            .collect()
    }

    /// Lock an entry to the post it produced
    pub fn mark_converted(&mut self, index: usize, post_id: String) -> Result<()> {
        let entry = self.get_mut(index)?;
        entry.post_id = Some(post_id);
        entry.variation.selected = false;
        Ok(())
    }
}
