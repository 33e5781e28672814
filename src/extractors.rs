use crate::error::AppError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// The authenticated caller behind a protected procedure.
///
/// Sessions are issued by the external auth provider; this extractor only
/// checks that the bearer token maps to a live session row. The user is
/// mirrored into the local users table the first time a session references
/// it, so author foreign keys always resolve.
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: Uuid,
    email: String,
    expires_at: chrono::DateTime<Utc>,
}

impl<S> FromRequestParts<S> for AuthUser
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);

        let token = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::AuthRequired)?;

        let session = sqlx::query_as::<_, SessionRow>(
            "SELECT user_id, email, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::AuthRequired)?;

        if session.expires_at <= Utc::now() {
            return Err(AppError::AuthRequired);
        }

        sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id)
            DO UPDATE SET email = EXCLUDED.email, updated_at = NOW()
            "#,
        )
        .bind(session.user_id)
        .bind(&session.email)
        .execute(&pool)
        .await?;

        Ok(AuthUser {
            id: session.user_id,
            email: session.email,
        })
    }
}
