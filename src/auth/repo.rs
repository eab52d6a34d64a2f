use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::claims::DEFAULT_ROLE;
use crate::{
    auth::repo_types::{NewUser, User},
    db::RepoError,
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Fails with [`RepoError::Conflict`] when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;
    async fn link_google(&self, id: Uuid, google_id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, google_id, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, google_id, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, role, google_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, role, google_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(DEFAULT_ROLE)
        .bind(&new.google_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| RepoError::from_sqlx(e, "users_email_key"))
    }

    async fn link_google(&self, id: Uuid, google_id: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET google_id = $2 WHERE id = $1 AND google_id IS NULL"#)
            .bind(id)
            .bind(google_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
