use crate::{
    error::AppError,
    extractors::AuthUser,
    models::{AuthorRef, Category, Post},
    params::{PageParams, Pagination, parse_param},
    slug::slugify,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, title, slug, content, excerpt, image_url, published, author_id, created_at, updated_at";

#[derive(Deserialize, Debug, Default)]
pub struct PostListParams {
    #[serde(flatten)]
    base: PageParams,
    published: Option<String>,
    category_id: Option<String>,
}

impl PostListParams {
    fn published(&self) -> Result<Option<bool>, AppError> {
        parse_param(self.published.as_deref(), "published")
    }

    fn category_id(&self) -> Result<Option<Uuid>, AppError> {
        parse_param(self.category_id.as_deref(), "category_id")
    }
}

#[derive(Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub author_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub categories: Vec<Category>,
    pub author: Option<AuthorRef>,
}

impl PostResponse {
    fn new(post: Post, categories: Vec<Category>, author: Option<AuthorRef>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            image_url: post.image_url,
            published: post.published,
            author_id: post.author_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
            categories,
            author,
        }
    }
}

#[derive(Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: Pagination,
}

async fn attach_relations(pool: &PgPool, post: Post) -> Result<PostResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT c.id, c.name, c.slug, c.description, c.image_url, c.created_at, c.updated_at
        FROM categories c
        JOIN post_categories pc ON pc.category_id = c.id
        WHERE pc.post_id = $1
        ORDER BY c.name
        "#,
    )
    .bind(post.id)
    .fetch_all(pool)
    .await?;

    let author = match post.author_id {
        Some(author_id) => {
            sqlx::query_as::<_, AuthorRef>("SELECT id, email FROM users WHERE id = $1")
                .bind(author_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok(PostResponse::new(post, categories, author))
}

pub async fn get_posts(
    State(pool): State<PgPool>,
    Query(params): Query<PostListParams>,
) -> Result<Json<PostListResponse>, AppError> {
    let page = params.base.page();
    let limit = params.base.limit();
    let offset = params.base.offset();
    let published = params.published()?;
    let category_id = params.category_id()?;

    let query = format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE ($1::BOOLEAN IS NULL OR published = $1)
        AND ($2::UUID IS NULL OR id IN (
            SELECT post_id FROM post_categories WHERE category_id = $2
        ))
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    );
    let posts = sqlx::query_as::<_, Post>(&query)
        .bind(published)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    let total_count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM posts
        WHERE ($1::BOOLEAN IS NULL OR published = $1)
        AND ($2::UUID IS NULL OR id IN (
            SELECT post_id FROM post_categories WHERE category_id = $2
        ))
        "#,
    )
    .bind(published)
    .bind(category_id)
    .fetch_one(&pool)
    .await?;

    let mut response = Vec::with_capacity(posts.len());
    for post in posts {
        response.push(attach_relations(&pool, post).await?);
    }

    Ok(Json(PostListResponse {
        posts: response,
        pagination: Pagination::new(page, limit, total_count),
    }))
}

#[derive(Deserialize, Debug)]
pub struct PostSearchParams {
    q: String,
    published: Option<bool>,
    limit: Option<i64>,
}

pub async fn search_posts(
    State(pool): State<PgPool>,
    Query(params): Query<PostSearchParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::validation("Search query must not be empty"));
    }

    let published = params.published.unwrap_or(true);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let pattern = format!("%{}%", params.q);

    let query = format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE (title ILIKE $1 OR content ILIKE $1)
        AND published = $2
        ORDER BY created_at DESC
        LIMIT $3
        "#
    );
    let posts = sqlx::query_as::<_, Post>(&query)
        .bind(pattern)
        .bind(published)
        .bind(limit)
        .fetch_all(&pool)
        .await?;

    Ok(Json(posts))
}

pub async fn get_one_post(
    State(pool): State<PgPool>,
    Path(identifier): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let by_id = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
    let by_slug = format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = $1");

    let query = if let Ok(id) = Uuid::parse_str(&identifier) {
        sqlx::query_as::<_, Post>(&by_id).bind(id)
    } else {
        sqlx::query_as::<_, Post>(&by_slug).bind(identifier)
    };

    let post = query
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(attach_relations(&pool, post).await?))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub category_ids: Option<Vec<Uuid>>,
}

impl CreatePostRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_slug(self.slug.as_deref())?;
        if self.content.is_empty() {
            return Err(AppError::validation("Content is required"));
        }
        validate_excerpt(self.excerpt.as_deref())?;
        validate_image_url(self.image_url.as_deref())
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    if title.chars().count() > 200 {
        return Err(AppError::validation("Title must be at most 200 characters"));
    }
    Ok(())
}

fn validate_slug(slug: Option<&str>) -> Result<(), AppError> {
    if let Some(slug) = slug {
        if slug.is_empty() || slug.chars().count() > 200 {
            return Err(AppError::validation("Slug must be 1-200 characters"));
        }
    }
    Ok(())
}

fn validate_excerpt(excerpt: Option<&str>) -> Result<(), AppError> {
    if let Some(excerpt) = excerpt {
        if excerpt.chars().count() > 500 {
            return Err(AppError::validation(
                "Excerpt must be at most 500 characters",
            ));
        }
    }
    Ok(())
}

pub(super) fn validate_image_url(url: Option<&str>) -> Result<(), AppError> {
    match url {
        // Empty string means "no image", mirroring what the editor submits
        None | Some("") => Ok(()),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Some(_) => Err(AppError::validation("Image must be a valid URL")),
    }
}

pub async fn create_post(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    payload.validate()?;

    let slug = payload
        .slug
        .clone()
        .unwrap_or_else(|| slugify(&payload.title));

    let mut tx = pool.begin().await?;

    let query = format!(
        r#"
        INSERT INTO posts (title, slug, content, excerpt, image_url, published, author_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {POST_COLUMNS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&query)
        .bind(&payload.title)
        .bind(&slug)
        .bind(&payload.content)
        .bind(&payload.excerpt)
        .bind(&payload.image_url)
        .bind(payload.published)
        // Author always comes from the session, never from the payload
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

    if let Some(category_ids) = &payload.category_ids {
        insert_associations(&mut tx, post.id, category_ids).await?;
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn insert_associations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    post_id: Uuid,
    category_ids: &[Uuid],
) -> Result<(), AppError> {
    for category_id in category_ids {
        sqlx::query(
            r#"
            INSERT INTO post_categories (post_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(category_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<bool>,
    pub category_ids: Option<Vec<Uuid>>,
}

impl UpdatePostRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_slug(self.slug.as_deref())?;
        if self.content.as_deref() == Some("") {
            return Err(AppError::validation("Content is required"));
        }
        validate_excerpt(self.excerpt.as_deref())?;
        validate_image_url(self.image_url.as_deref())
    }

    /// Regenerate the slug from a new title unless an explicit slug came
    /// along with it.
    fn effective_slug(&self) -> Option<String> {
        match (&self.title, &self.slug) {
            (_, Some(slug)) => Some(slug.clone()),
            (Some(title), None) => Some(slugify(title)),
            (None, None) => None,
        }
    }
}

/// Loads the post's author and enforces ownership. Not-found and
/// foreign-author conditions stay distinguishable.
async fn check_ownership(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    post_id: Uuid,
    user: &AuthUser,
) -> Result<(), AppError> {
    let author_id = sqlx::query_scalar::<_, Option<Uuid>>(
        "SELECT author_id FROM posts WHERE id = $1",
    )
    .bind(post_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::NotFound)?;

    if author_id != Some(user.id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub async fn update_post(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    check_ownership(&mut tx, id, &user).await?;

    let slug = payload.effective_slug();

    let query = format!(
        r#"
        UPDATE posts
        SET
            title = COALESCE($1, title),
            slug = COALESCE($2, slug),
            content = COALESCE($3, content),
            excerpt = COALESCE($4, excerpt),
            image_url = COALESCE($5, image_url),
            published = COALESCE($6, published),
            updated_at = NOW()
        WHERE id = $7
        RETURNING {POST_COLUMNS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&query)
        .bind(&payload.title)
        .bind(&slug)
        .bind(&payload.content)
        .bind(&payload.excerpt)
        .bind(&payload.image_url)
        .bind(payload.published)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    // A supplied list (even empty) replaces every association; an absent
    // list leaves them alone. Runs inside the same transaction so a failure
    // cannot strand the post without categories.
    if let Some(category_ids) = &payload.category_ids {
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_associations(&mut tx, id, category_ids).await?;
    }

    tx.commit().await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = pool.begin().await?;

    check_ownership(&mut tx, id, &user).await?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_publish(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let mut tx = pool.begin().await?;

    check_ownership(&mut tx, id, &user).await?;

    let query = format!(
        r#"
        UPDATE posts
        SET published = NOT published, updated_at = NOW()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&query)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(post))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreatePostRequest {
        CreatePostRequest {
            title: "Hello World".to_string(),
            slug: None,
            content: "Some content".to_string(),
            excerpt: None,
            image_url: None,
            published: false,
            category_ids: None,
        }
    }

    #[test]
    fn create_accepts_minimal_payload() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn create_rejects_empty_title_and_content() {
        let mut req = create_request();
        req.title = String::new();
        assert!(req.validate().is_err());

        let mut req = create_request();
        req.content = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_rejects_overlong_fields() {
        let mut req = create_request();
        req.title = "x".repeat(201);
        assert!(req.validate().is_err());

        let mut req = create_request();
        req.excerpt = Some("x".repeat(501));
        assert!(req.validate().is_err());
    }

    #[test]
    fn image_url_accepts_http_and_empty() {
        assert!(validate_image_url(None).is_ok());
        assert!(validate_image_url(Some("")).is_ok());
        assert!(validate_image_url(Some("https://cdn.example.com/a.png")).is_ok());
        assert!(validate_image_url(Some("not a url")).is_err());
    }

    fn update_request() -> UpdatePostRequest {
        UpdatePostRequest {
            title: None,
            slug: None,
            content: None,
            excerpt: None,
            image_url: None,
            published: None,
            category_ids: None,
        }
    }

    #[test]
    fn slug_regenerates_from_title_only_without_explicit_slug() {
        let mut req = update_request();
        req.title = Some("New Title".to_string());
        assert_eq!(req.effective_slug().as_deref(), Some("new-title"));

        req.slug = Some("custom-slug".to_string());
        assert_eq!(req.effective_slug().as_deref(), Some("custom-slug"));

        let req = update_request();
        assert_eq!(req.effective_slug(), None);
    }
}
