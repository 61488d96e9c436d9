//! External data sources consumed by enrichment and search.

use async_trait::async_trait;
use chrono::NaiveDate;
use moodtrip_core::{
    CandidatePlace, FacilityCategory, GeoPoint, KeywordSet, PlaceProvider, Result, Review,
    WeatherSnapshot,
};

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Candidate places for a keyword set within `region` (`全国` for anywhere).
    async fn search(&self, keywords: &KeywordSet, region: &str) -> Result<Vec<CandidatePlace>>;

    /// Facilities around `center`, with `distance_meters` filled in.
    async fn nearby(
        &self,
        center: GeoPoint,
        categories: &[FacilityCategory],
    ) -> Result<Vec<CandidatePlace>>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Forecast for `date` at `location`. `Ok(None)` when no forecast covers the date.
    async fn get(&self, location: GeoPoint, date: NaiveDate) -> Result<Option<WeatherSnapshot>>;
}

#[async_trait]
pub trait ReviewProvider: Send + Sync {
    async fn get(&self, place_id: &str, provider: PlaceProvider) -> Result<Vec<Review>>;
}
