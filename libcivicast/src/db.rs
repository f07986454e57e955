//! Post Record Store backed by sqlite

use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::types::{Article, Platform, Post, PostStatus};

const POST_COLUMNS: &str = "id, platform, content, image_url, link, scheduled_for, published_at, \
     external_post_id, status, article_id, error_message, version, created_at, updated_at";

/// Filters for listing posts
///
/// Empty platform or status sets match everything. `since` and `until`
/// bound `created_at` inclusively.
#[derive(Debug, Clone)]
pub struct PostQuery {
    pub platforms: Vec<Platform>,
    pub statuses: Vec<PostStatus>,
    pub search: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub article_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            statuses: Vec::new(),
            search: None,
            since: None,
            until: None,
            article_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// Aggregate counts over the post store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostStats {
    pub total: i64,
    pub published: i64,
    pub scheduled: i64,
    pub draft: i64,
    pub failed: i64,
    pub platform_counts: BTreeMap<String, i64>,
    /// Posts created at or after the `recent_since` cutoff
    pub recent_posts: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes keep the URL valid on Windows
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    // ------------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------------

    pub async fn create_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO social_posts (id, platform, content, image_url, link, scheduled_for,
                published_at, external_post_id, status, article_id, error_message, version,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(post.platform.as_str())
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.link)
        .bind(post.scheduled_for)
        .bind(post.published_at)
        .bind(&post.external_post_id)
        .bind(post.status.as_str())
        .bind(&post.article_id)
        .bind(&post.error_message)
        .bind(post.version)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let query = format!("SELECT {} FROM social_posts WHERE id = ?", POST_COLUMNS);
        let row = sqlx::query(&query)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(row_to_post).transpose()
    }

    /// Write every mutable field of `post`, guarded by its version
    ///
    /// The stored row must still carry `post.version`; on success the stored
    /// version becomes `post.version + 1`. Returns `false` when the row is
    /// gone or was updated by someone else in the meantime.
    pub async fn update_post(&self, post: &Post) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE social_posts
            SET platform = ?, content = ?, image_url = ?, link = ?, scheduled_for = ?,
                published_at = ?, external_post_id = ?, status = ?, article_id = ?,
                error_message = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(post.platform.as_str())
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.link)
        .bind(post.scheduled_for)
        .bind(post.published_at)
        .bind(&post.external_post_id)
        .bind(post.status.as_str())
        .bind(&post.article_id)
        .bind(&post.error_message)
        .bind(post.updated_at)
        .bind(&post.id)
        .bind(post.version)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_post_status(&self, post_id: &str, status: PostStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE social_posts
            SET status = ?, version = version + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Returns whether a row was removed
    pub async fn delete_post(&self, post_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM social_posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// List posts matching `query`, newest first
    pub async fn query_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM social_posts WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS,
            where_clause(query)
        );

        let mut q = sqlx::query(&sql);
        for value in bind_values(query) {
            q = match value {
                BindValue::Text(s) => q.bind(s),
                BindValue::Int(i) => q.bind(i),
            };
        }
        q = q.bind(query.limit as i64).bind(query.offset as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(DbError::SqlxError)?;
        rows.iter().map(row_to_post).collect()
    }

    /// Number of posts matching `query`, ignoring limit and offset
    pub async fn count_posts(&self, query: &PostQuery) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM social_posts WHERE {}",
            where_clause(query)
        );

        let mut q = sqlx::query(&sql);
        for value in bind_values(query) {
            q = match value {
                BindValue::Text(s) => q.bind(s),
                BindValue::Int(i) => q.bind(i),
            };
        }

        let row = q.fetch_one(&self.pool).await.map_err(DbError::SqlxError)?;
        Ok(row.get("count"))
    }

    pub async fn stats(&self, recent_since: i64) -> Result<PostStats> {
        let mut stats = PostStats::default();

        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM social_posts GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        for row in rows {
            let count: i64 = row.get("count");
            stats.total += count;
            match row.get::<String, _>("status").parse::<PostStatus>() {
                Ok(PostStatus::Published) => stats.published = count,
                Ok(PostStatus::Scheduled) => stats.scheduled = count,
                Ok(PostStatus::Draft) => stats.draft = count,
                Ok(PostStatus::Failed) => stats.failed = count,
                Err(_) => {}
            }
        }

        let rows =
            sqlx::query("SELECT platform, COUNT(*) AS count FROM social_posts GROUP BY platform")
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::SqlxError)?;
        for row in rows {
            stats
                .platform_counts
                .insert(row.get::<String, _>("platform"), row.get::<i64, _>("count"));
        }

        let row = sqlx::query("SELECT COUNT(*) AS count FROM social_posts WHERE created_at >= ?")
            .bind(recent_since)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        stats.recent_posts = row.get("count");

        Ok(stats)
    }

    // ------------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------------

    pub async fn insert_article(&self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO articles (id, title, slug, content, excerpt, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(&article.status)
        .bind(article.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, slug, content, excerpt, status, created_at
            FROM articles WHERE id = ?
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| Article {
            id: r.get("id"),
            title: r.get("title"),
            slug: r.get("slug"),
            content: r.get("content"),
            excerpt: r.get("excerpt"),
            status: r.get("status"),
            created_at: r.get("created_at"),
        }))
    }
}

enum BindValue {
    Text(String),
    Int(i64),
}

fn where_clause(query: &PostQuery) -> String {
    let mut clauses = vec!["1=1".to_string()];

    if !query.platforms.is_empty() {
        clauses.push(format!("platform IN ({})", placeholders(query.platforms.len())));
    }
    if !query.statuses.is_empty() {
        clauses.push(format!("status IN ({})", placeholders(query.statuses.len())));
    }
    if query.search.is_some() {
        // LIKE is case-insensitive for ASCII in sqlite
        clauses.push("content LIKE ? ESCAPE '\\'".to_string());
    }
    if query.since.is_some() {
        clauses.push("created_at >= ?".to_string());
    }
    if query.until.is_some() {
        clauses.push("created_at <= ?".to_string());
    }
    if query.article_id.is_some() {
        clauses.push("article_id = ?".to_string());
    }

    clauses.join(" AND ")
}

/// Make `%`, `_` and `\` match literally inside a `LIKE ... ESCAPE '\'` pattern
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Values in the same order as the placeholders from `where_clause`
fn bind_values(query: &PostQuery) -> Vec<BindValue> {
    let mut values = Vec::new();
    values.extend(
        query
            .platforms
            .iter()
            .map(|p| BindValue::Text(p.as_str().to_string())),
    );
    values.extend(
        query
            .statuses
            .iter()
            .map(|s| BindValue::Text(s.as_str().to_string())),
    );
    if let Some(search) = &query.search {
        values.push(BindValue::Text(format!("%{}%", escape_like(search))));
    }
    if let Some(since) = query.since {
        values.push(BindValue::Int(since));
    }
    if let Some(until) = query.until {
        values.push(BindValue::Int(until));
    }
    if let Some(article_id) = &query.article_id {
        values.push(BindValue::Text(article_id.clone()));
    }
    values
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn row_to_post(row: &SqliteRow) -> Result<Post> {
    let platform: Platform = row
        .get::<String, _>("platform")
        .parse()
        .map_err(|e: String| DbError::SqlxError(sqlx::Error::Decode(e.into())))?;
    let status: PostStatus = row
        .get::<String, _>("status")
        .parse()
        .map_err(|e: String| DbError::SqlxError(sqlx::Error::Decode(e.into())))?;

    Ok(Post {
        id: row.get("id"),
        platform,
        content: row.get("content"),
        image_url: row.get("image_url"),
        link: row.get("link"),
        scheduled_for: row.get("scheduled_for"),
        published_at: row.get("published_at"),
        external_post_id: row.get("external_post_id"),
        status,
        article_id: row.get("article_id"),
        error_message: row.get("error_message"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
