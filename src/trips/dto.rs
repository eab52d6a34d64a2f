use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use super::repo_types::{BudgetLevel, Trip, TripFields, DEFAULT_STATUS};
use crate::{
    error::{AppError, AppResult},
    extract::{present, present_number, NumberOrText},
    itinerary::TripParams,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub title: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub duration: Option<NumberOrText>,
    pub budget_level: Option<String>,
    pub departure_date: Option<String>,
    pub status: Option<String>,
}

/// Partial update; absent or blank fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTripRequest {
    pub title: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub duration: Option<NumberOrText>,
    pub budget_level: Option<String>,
    pub departure_date: Option<String>,
    pub itinerary: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripEnvelope {
    pub message: String,
    pub trip: Trip,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A create request that passed validation, still lacking its itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTrip {
    pub title: String,
    pub country: String,
    pub city: String,
    pub duration: i32,
    pub budget_level: BudgetLevel,
    pub departure_date: Date,
    pub status: String,
}

impl ValidTrip {
    pub fn params(&self) -> TripParams {
        TripParams {
            country: self.country.clone(),
            city: self.city.clone(),
            duration: self.duration,
            budget_level: self.budget_level.to_string(),
            departure_date: self.departure_date,
        }
    }

    pub fn into_fields(self, itinerary: String) -> TripFields {
        TripFields {
            title: self.title,
            country: self.country,
            city: self.city,
            departure_date: self.departure_date,
            duration: self.duration,
            budget_level: self.budget_level.to_string(),
            itinerary,
            status: self.status,
        }
    }
}

fn parse_duration(value: &NumberOrText) -> AppResult<i32> {
    value
        .positive_i32()
        .ok_or_else(|| AppError::BadRequest("Duration must be a positive integer".into()))
}

fn parse_budget(value: &str) -> AppResult<BudgetLevel> {
    value.parse().map_err(AppError::BadRequest)
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is kept.
pub fn parse_departure(value: &str) -> AppResult<Date> {
    let value = value.trim();
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|dt| dt.date()))
        .ok_or_else(|| {
            AppError::BadRequest("departureDate must be a date in YYYY-MM-DD format".into())
        })
}

impl CreateTripRequest {
    pub fn validate(self) -> AppResult<ValidTrip> {
        let title = present(self.title);
        let country = present(self.country);
        let city = present(self.city);
        let duration = present_number(self.duration);
        let budget_level = present(self.budget_level);
        let departure_date = present(self.departure_date);

        let missing: Vec<&str> = [
            ("title", title.is_none()),
            ("country", country.is_none()),
            ("city", city.is_none()),
            ("duration", duration.is_none()),
            ("budgetLevel", budget_level.is_none()),
            ("departureDate", departure_date.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (
            Some(title),
            Some(country),
            Some(city),
            Some(duration),
            Some(budget_level),
            Some(departure_date),
        ) = (title, country, city, duration, budget_level, departure_date)
        else {
            return Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        };

        Ok(ValidTrip {
            title,
            country,
            city,
            duration: parse_duration(&duration)?,
            budget_level: parse_budget(&budget_level)?,
            departure_date: parse_departure(&departure_date)?,
            status: present(self.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        })
    }
}

impl UpdateTripRequest {
    /// Merges the request over `current`.
    pub fn apply(self, current: &Trip) -> AppResult<TripFields> {
        let mut fields = TripFields::from(current);
        if let Some(title) = present(self.title) {
            fields.title = title;
        }
        if let Some(country) = present(self.country) {
            fields.country = country;
        }
        if let Some(city) = present(self.city) {
            fields.city = city;
        }
        if let Some(duration) = present_number(self.duration) {
            fields.duration = parse_duration(&duration)?;
        }
        if let Some(budget) = present(self.budget_level) {
            fields.budget_level = parse_budget(&budget)?.to_string();
        }
        if let Some(date) = present(self.departure_date) {
            fields.departure_date = parse_departure(&date)?;
        }
        if let Some(itinerary) = present(self.itinerary) {
            fields.itinerary = itinerary;
        }
        if let Some(status) = present(self.status) {
            fields.status = status;
        }
        Ok(fields)
    }
}
