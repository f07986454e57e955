//! Scripted text generator for tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::TextGenerator;
use crate::error::GenerationError;
use crate::types::{Platform, ANGLES};

#[derive(Clone)]
enum Reply {
    Text(String),
    Error(GenerationError),
}

/// Returns a fixed reply and records every user prompt it receives
#[derive(Clone)]
pub struct MockGenerator {
    reply: Reply,
    prompts: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGenerator {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(Reply::Text(text.into()))
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::new(Reply::Error(error))
    }

    /// A fenced JSON reply with one item per angle for every platform
    pub fn well_formed() -> Self {
        let mut items = Vec::new();
        for platform in Platform::ALL {
            for (i, angle) in ANGLES.iter().enumerate() {
                items.push(serde_json::json!({
                    "angle": angle,
                    "platform": platform.as_str(),
                    "text": format!("{} #{} for {} #civictech", angle, i + 1, platform.display_name()),
                    "rationale": format!("{} suits {}", angle, platform.display_name()),
                }));
            }
        }
        let body = serde_json::Value::Array(items).to_string();
        Self::replying(format!("Here are your variations:\n```json\n{}\n```", body))
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, GenerationError> {
        lock(&self.prompts).push(user.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Error(e) => Err(e.clone()),
        }
    }
}
