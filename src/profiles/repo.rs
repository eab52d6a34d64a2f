use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Profile, ProfileFields};
use crate::db::RepoError;

/// Profile persistence. Every lookup and write is scoped to the owner.
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Fails with [`RepoError::Conflict`] when the user already has a profile.
    async fn create(&self, user_id: Uuid, fields: ProfileFields) -> Result<Profile, RepoError>;
    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        fields: ProfileFields,
    ) -> anyhow::Result<Option<Profile>>;
    async fn set_picture(
        &self,
        id: Uuid,
        user_id: Uuid,
        url: &str,
    ) -> anyhow::Result<Option<Profile>>;
    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgProfileRepo {
    db: PgPool,
}

impl PgProfileRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const PROFILE_COLUMNS: &str =
    "id, user_id, name, age, gender, citizen, profile_pict, created_at, updated_at";

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn create(&self, user_id: Uuid, f: ProfileFields) -> Result<Profile, RepoError> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, user_id, name, age, gender, citizen)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&f.name)
        .bind(f.age)
        .bind(&f.gender)
        .bind(&f.citizen)
        .fetch_one(&self.db)
        .await
        .map_err(|e| RepoError::from_sqlx(e, "profiles_user_id_key"))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        f: ProfileFields,
    ) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
               SET name = $3, age = $4, gender = $5, citizen = $6, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&f.name)
        .bind(f.age)
        .bind(&f.gender)
        .bind(&f.citizen)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn set_picture(
        &self,
        id: Uuid,
        user_id: Uuid,
        url: &str,
    ) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
               SET profile_pict = $3, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(url)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM profiles WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
