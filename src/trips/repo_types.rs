use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub const DEFAULT_STATUS: &str = "draft";

/// Trip row, owned by `user_id`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub country: String,
    pub city: String,
    #[serde(with = "iso_date")]
    pub departure_date: Date,
    pub duration: i32,
    pub budget_level: String,
    pub itinerary: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The caller-editable part of a trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripFields {
    pub title: String,
    pub country: String,
    pub city: String,
    pub departure_date: Date,
    pub duration: i32,
    pub budget_level: String,
    pub itinerary: String,
    pub status: String,
}

impl From<&Trip> for TripFields {
    fn from(t: &Trip) -> Self {
        Self {
            title: t.title.clone(),
            country: t.country.clone(),
            city: t.city.clone(),
            departure_date: t.departure_date,
            duration: t.duration,
            budget_level: t.budget_level.clone(),
            itinerary: t.itinerary.clone(),
            status: t.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLevel {
    Economy,
    Medium,
    Luxury,
}

impl BudgetLevel {
    pub const ALL: [BudgetLevel; 3] = [BudgetLevel::Economy, BudgetLevel::Medium, BudgetLevel::Luxury];

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetLevel::Economy => "Economy",
            BudgetLevel::Medium => "Medium",
            BudgetLevel::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| "budgetLevel must be one of Economy, Medium, Luxury".to_string())
    }
}
