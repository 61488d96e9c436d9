//! Place, weather, review and enrichment types.

use serde::{Deserialize, Serialize};

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters (haversine, mean Earth radius).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

/// Map data source a place came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceProvider {
    Nominatim,
    Amap,
    Baidu,
}

impl std::fmt::Display for PlaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceProvider::Nominatim => write!(f, "nominatim"),
            PlaceProvider::Amap => write!(f, "amap"),
            PlaceProvider::Baidu => write!(f, "baidu"),
        }
    }
}

/// A point of interest returned by place search, pre-scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePlace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub provider: PlaceProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl CandidatePlace {
    /// Text searched by keyword matching: name, address and description.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.name, self.address, self.description).to_lowercase()
    }
}

/// A candidate annotated by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPlace {
    #[serde(flatten)]
    pub place: CandidatePlace,
    pub score: f64,
    pub matched_keywords: Vec<String>,
}

// ---------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------

/// A single user review from a map provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub content: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Summarised reviews for one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDigest {
    pub summary: String,
    pub count: usize,
    pub sentiment: Sentiment,
}

// ---------------------------------------------------------------
// Weather
// ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

/// Forecast for a place on the travel date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub date: chrono::NaiveDate,
    pub temperature: TemperatureRange,
    pub condition: String,
    /// Millimetres.
    #[serde(default)]
    pub precipitation: f64,
    /// Meters per second.
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub humidity: f64,
}

impl WeatherSnapshot {
    pub fn is_rainy(&self) -> bool {
        let condition = self.condition.to_lowercase();
        condition.contains('雨') || condition.contains("rain")
    }
}

// ---------------------------------------------------------------
// Nearby facilities
// ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityCategory {
    Transport,
    Dining,
    Accommodation,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyFacility {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub location: GeoPoint,
}

/// Facilities around a place, grouped by category, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyIndex {
    pub transport: Vec<NearbyFacility>,
    pub dining: Vec<NearbyFacility>,
    pub accommodation: Vec<NearbyFacility>,
    pub other: Vec<NearbyFacility>,
}

impl NearbyIndex {
    pub fn bucket_mut(&mut self, category: FacilityCategory) -> &mut Vec<NearbyFacility> {
        match category {
            FacilityCategory::Transport => &mut self.transport,
            FacilityCategory::Dining => &mut self.dining,
            FacilityCategory::Accommodation => &mut self.accommodation,
            FacilityCategory::Other => &mut self.other,
        }
    }

    pub fn len(&self) -> usize {
        self.transport.len() + self.dining.len() + self.accommodation.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------
// Travel advice and the enriched result
// ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelAdvice {
    /// `HH:MM`.
    pub recommended_time: String,
    pub recommended_transport: Vec<String>,
    pub itinerary_suggestion: String,
    pub notes: String,
}

/// Enrichment sub-fetches that may independently come back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentField {
    Reviews,
    Weather,
    Nearby,
}

/// A ranked candidate with weather, reviews, nearby facilities and advice attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPlace {
    #[serde(flatten)]
    pub scored: ScoredPlace,
    pub reviews: Option<ReviewDigest>,
    pub weather: Option<WeatherSnapshot>,
    pub nearby: Option<NearbyIndex>,
    pub travel_advice: TravelAdvice,
    /// Fields whose fetch failed; empty when fully enriched.
    pub missing: Vec<EnrichmentField>,
}

impl EnrichedPlace {
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Tiananmen to the Temple of Heaven, roughly 3 km.
        let a = GeoPoint::new(39.9087, 116.3975);
        let b = GeoPoint::new(39.8822, 116.4066);
        let d = a.distance_to(&b);
        assert!(d > 2_800.0 && d < 3_200.0, "got {}", d);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_candidate_json_shape() {
        let place = CandidatePlace {
            id: "1".into(),
            name: "静湖公园".into(),
            address: "湖滨路1号".into(),
            location: GeoPoint::new(30.0, 120.0),
            rating: Some(4.5),
            images: vec![],
            description: "湖边".into(),
            provider: PlaceProvider::Amap,
            distance_meters: Some(300.0),
        };
        let json = serde_json::to_value(&place).unwrap();
        assert_eq!(json["distanceMeters"], 300.0);
        assert_eq!(json["provider"], "amap");
    }

    #[test]
    fn test_rain_detection() {
        let w = WeatherSnapshot {
            date: chrono::NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            temperature: TemperatureRange { min: 18.0, max: 24.0 },
            condition: "小雨".into(),
            precipitation: 2.0,
            wind_speed: 3.0,
            humidity: 80.0,
        };
        assert!(w.is_rainy());
    }
}
