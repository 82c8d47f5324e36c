use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::repo_types::User;
use crate::error::AuthError;

impl User {
    /// Find a user by (normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_verified, otp_hash, otp_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_verified, otp_hash, otp_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new unverified user.
    ///
    /// Hashing the password is an explicit part of the create contract; no
    /// other write path touches the password column. A unique violation on the
    /// email index surfaces as `DuplicateEmail`.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let password_hash = password::hash_password(password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, is_verified, otp_hash, otp_expires_at, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Attach fresh OTP material, overwriting whatever was there. Hash and
    /// expiry are written in one statement.
    pub async fn set_otp(
        db: &PgPool,
        id: Uuid,
        otp_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AuthError> {
        sqlx::query(r#"UPDATE users SET otp_hash = $2, otp_expires_at = $3 WHERE id = $1"#)
            .bind(id)
            .bind(otp_hash)
            .bind(expires_at)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Flip the verified flag and clear OTP material in one statement, so a
    /// consumed code can never be replayed.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> Result<(), AuthError> {
        sqlx::query(
            r#"UPDATE users SET is_verified = TRUE, otp_hash = NULL, otp_expires_at = NULL WHERE id = $1"#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }
}
