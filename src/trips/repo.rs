use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Trip, TripFields};

/// Trip persistence. Every lookup and write is scoped to the owner.
#[async_trait]
pub trait TripRepo: Send + Sync {
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Trip>>;
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Trip>>;
    async fn create(&self, user_id: Uuid, fields: TripFields) -> anyhow::Result<Trip>;
    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        fields: TripFields,
    ) -> anyhow::Result<Option<Trip>>;
    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTripRepo {
    db: PgPool,
}

impl PgTripRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const TRIP_COLUMNS: &str = "id, user_id, title, country, city, departure_date, duration, \
                            budget_level, itinerary, status, created_at, updated_at";

#[async_trait]
impl TripRepo for PgTripRepo {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Trip>> {
        let rows = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    async fn create(&self, user_id: Uuid, f: TripFields) -> anyhow::Result<Trip> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            r#"
            INSERT INTO trips (id, user_id, title, country, city, departure_date, duration,
                               budget_level, itinerary, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TRIP_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&f.title)
        .bind(&f.country)
        .bind(&f.city)
        .bind(f.departure_date)
        .bind(f.duration)
        .bind(&f.budget_level)
        .bind(&f.itinerary)
        .bind(&f.status)
        .fetch_one(&self.db)
        .await?;
        Ok(trip)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        f: TripFields,
    ) -> anyhow::Result<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            r#"
            UPDATE trips
               SET title = $3, country = $4, city = $5, departure_date = $6, duration = $7,
                   budget_level = $8, itinerary = $9, status = $10, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {TRIP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&f.title)
        .bind(&f.country)
        .bind(&f.city)
        .bind(f.departure_date)
        .bind(f.duration)
        .bind(&f.budget_level)
        .bind(&f.itinerary)
        .bind(&f.status)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM trips WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
