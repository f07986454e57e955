//! Read side of the Post Record Store: listing, lookup and stats

use serde::Serialize;
use std::sync::Arc;

use crate::db::{PostQuery, PostStats};
use crate::error::{CivicastError, Result};
use crate::{Database, Post};

/// Window counted as "recent" in stats
const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    /// Matches ignoring limit and offset
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone)]
pub struct HistoryService {
    db: Arc<Database>,
    max_page_size: usize,
}

impl HistoryService {
    pub fn new(db: Arc<Database>, max_page_size: usize) -> Self {
        Self { db, max_page_size }
    }

    /// One page of posts, newest first
    pub async fn list(&self, mut query: PostQuery) -> Result<PostPage> {
        if query.limit == 0 {
            return Err(CivicastError::InvalidInput("limit must be at least 1".to_string()));
        }
        if let (Some(since), Some(until)) = (query.since, query.until) {
            if since > until {
                return Err(CivicastError::InvalidInput(
                    "start date must not be after end date".to_string(),
                ));
            }
        }
        query.limit = query.limit.min(self.max_page_size);
        query.search = query.search.filter(|s| !s.trim().is_empty());

        let posts = self.db.query_posts(&query).await?;
        let total = self.db.count_posts(&query).await?;

        Ok(PostPage {
            posts,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    pub async fn get(&self, post_id: &str) -> Result<Post> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| CivicastError::NotFound(format!("post {}", post_id)))
    }

    pub async fn stats(&self) -> Result<PostStats> {
        let since = chrono::Utc::now() - chrono::Duration::days(RECENT_WINDOW_DAYS);
        self.db.stats(since.timestamp()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Platform, PostStatus};
    use tempfile::TempDir;

    async fn setup() -> (HistoryService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("history.db");
        let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());
        (HistoryService::new(Arc::clone(&db), 50), db, temp_dir)
    }

    #[tokio::test]
    async fn test_list_clamps_limit_and_reports_total() {
        let (history, db, _temp_dir) = setup().await;
        for i in 0..3 {
            db.create_post(&Post::new(Platform::Twitter, format!("p{}", i)))
                .await
                .unwrap();
        }

        let page = history
            .list(PostQuery {
                limit: 500,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.limit, 50);
        assert_eq!(page.total, 3);
        assert_eq!(page.posts.len(), 3);
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_range() {
        let (history, _db, _temp_dir) = setup().await;
        let err = history
            .list(PostQuery {
                since: Some(10),
                until: Some(5),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CivicastError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (history, _db, _temp_dir) = setup().await;
        assert!(matches!(
            history.get("missing").await,
            Err(CivicastError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_counts_recent() {
        let (history, db, _temp_dir) = setup().await;
        let mut old = Post::new(Platform::Facebook, "old".to_string());
        old.created_at -= 30 * 24 * 3600;
        old.status = PostStatus::Published;
        db.create_post(&old).await.unwrap();
        db.create_post(&Post::new(Platform::Facebook, "new".to_string()))
            .await
            .unwrap();

        let stats = history.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.recent_posts, 1);
    }
}
