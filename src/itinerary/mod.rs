//! Itinerary drafting behind a swappable text generator.
//!
//! Trip creation never fails because of the generator: [`ItineraryDrafter`]
//! substitutes a fixed template whenever the provider errors or is not
//! configured.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use time::Date;
use tracing::{debug, warn};

/// The five trip fields a draft is parameterised by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripParams {
    pub country: String,
    pub city: String,
    pub duration: i32,
    pub budget_level: String,
    pub departure_date: Date,
}

#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn generate(&self, params: &TripParams) -> anyhow::Result<String>;
}

pub fn prompt(p: &TripParams) -> String {
    format!(
        "Create a detailed {duration}-day travel itinerary for {city}, {country} with a {budget} budget level.\n\
         The trip starts on {date}.\n\
         \n\
         Please provide:\n\
         1. Daily activities and attractions\n\
         2. Recommended restaurants for each meal\n\
         3. Estimated budget for each day\n\
         4. Transportation tips\n\
         5. Important travel tips\n\
         \n\
         Format the response in a clear, structured way with day-by-day breakdown.",
        duration = p.duration,
        city = p.city,
        country = p.country,
        budget = p.budget_level,
        date = p.departure_date,
    )
}

pub fn fallback(p: &TripParams) -> String {
    format!(
        "# {duration}-Day Trip to {city}, {country}\n\
         \n\
         **Departure:** {date}\n\
         **Budget level:** {budget}\n\
         \n\
         Your AI-generated itinerary will be available soon. \
         In the meantime, start planning your {duration}-day {budget} adventure in {city}, {country}!",
        duration = p.duration,
        city = p.city,
        country = p.country,
        budget = p.budget_level,
        date = p.departure_date,
    )
}

/// Wraps an optional generator and always yields text.
#[derive(Clone)]
pub struct ItineraryDrafter {
    generator: Option<Arc<dyn ItineraryGenerator>>,
}

impl ItineraryDrafter {
    pub fn new(generator: Option<Arc<dyn ItineraryGenerator>>) -> Self {
        Self { generator }
    }

    pub async fn draft(&self, params: &TripParams) -> String {
        let Some(generator) = &self.generator else {
            debug!("no itinerary generator configured; using fallback");
            return fallback(params);
        };
        match generator.generate(params).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, city = %params.city, country = %params.country, "itinerary generation failed; using fallback");
                fallback(params)
            }
        }
    }
}
