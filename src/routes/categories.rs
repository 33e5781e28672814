use crate::{
    error::AppError, extractors::AuthUser, models::Category, routes::posts::validate_image_url,
    slug::slugify,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, name, slug, description, image_url, created_at, updated_at";

pub async fn get_categories(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<Category>>, AppError> {
    let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name DESC");
    let categories = sqlx::query_as::<_, Category>(&query)
        .fetch_all(&pool)
        .await?;

    Ok(Json(categories))
}

pub async fn get_one_category(
    State(pool): State<PgPool>,
    Path(identifier): Path<String>,
) -> Result<Json<Category>, AppError> {
    let by_id = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
    let by_slug = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1");

    let query = if let Ok(id) = Uuid::parse_str(&identifier) {
        sqlx::query_as::<_, Category>(&by_id).bind(id)
    } else {
        sqlx::query_as::<_, Category>(&by_slug).bind(identifier)
    };

    let category = query
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(category))
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl CreateCategoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_slug(self.slug.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_image_url(self.image_url.as_deref())
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if name.chars().count() > 100 {
        return Err(AppError::validation("Name must be at most 100 characters"));
    }
    Ok(())
}

fn validate_slug(slug: Option<&str>) -> Result<(), AppError> {
    if let Some(slug) = slug {
        if slug.is_empty() || slug.chars().count() > 100 {
            return Err(AppError::validation("Slug must be 1-100 characters"));
        }
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), AppError> {
    if let Some(description) = description {
        if description.chars().count() > 500 {
            return Err(AppError::validation(
                "Description must be at most 500 characters",
            ));
        }
    }
    Ok(())
}

// Categories are shared taxonomy: any authenticated user may manage them,
// so mutations take AuthUser for the gate but do no ownership check.
pub async fn create_category(
    State(pool): State<PgPool>,
    _user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    payload.validate()?;

    let slug = payload
        .slug
        .clone()
        .unwrap_or_else(|| slugify(&payload.name));

    let query = format!(
        r#"
        INSERT INTO categories (name, slug, description, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let category = sqlx::query_as::<_, Category>(&query)
        .bind(&payload.name)
        .bind(&slug)
        .bind(&payload.description)
        .bind(&payload.image_url)
        .fetch_one(&pool)
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl UpdateCategoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        validate_slug(self.slug.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_image_url(self.image_url.as_deref())
    }

    fn effective_slug(&self) -> Option<String> {
        match (&self.name, &self.slug) {
            (_, Some(slug)) => Some(slug.clone()),
            (Some(name), None) => Some(slugify(name)),
            (None, None) => None,
        }
    }
}

pub async fn update_category(
    State(pool): State<PgPool>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    payload.validate()?;

    let slug = payload.effective_slug();

    let query = format!(
        r#"
        UPDATE categories
        SET
            name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            description = COALESCE($3, description),
            image_url = COALESCE($4, image_url),
            updated_at = NOW()
        WHERE id = $5
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let category = sqlx::query_as::<_, Category>(&query)
        .bind(&payload.name)
        .bind(&slug)
        .bind(&payload.description)
        .bind(&payload.image_url)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(pool): State<PgPool>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // No dependency check: association rows cascade with the category
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: "Tech".to_string(),
            slug: None,
            description: None,
            image_url: None,
        }
    }

    #[test]
    fn create_accepts_minimal_payload() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn create_rejects_empty_or_overlong_name() {
        let mut req = create_request();
        req.name = String::new();
        assert!(req.validate().is_err());

        req.name = "x".repeat(101);
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_rejects_overlong_description() {
        let mut req = create_request();
        req.description = Some("x".repeat(501));
        assert!(req.validate().is_err());
    }

    #[test]
    fn slug_regenerates_from_name_only_without_explicit_slug() {
        let mut req = UpdateCategoryRequest {
            name: Some("Data Science".to_string()),
            slug: None,
            description: None,
            image_url: None,
        };
        assert_eq!(req.effective_slug().as_deref(), Some("data-science"));

        req.slug = Some("ds".to_string());
        assert_eq!(req.effective_slug().as_deref(), Some("ds"));

        req.name = None;
        req.slug = None;
        assert_eq!(req.effective_slug(), None);
    }
}
