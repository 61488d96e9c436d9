//! OpenStreetMap Nominatim place search. Free, keyless, rate limited;
//! requests must carry an identifying `User-Agent`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use moodtrip_core::{
    CandidatePlace, Error, FacilityCategory, GeoPoint, KeywordSet, PlaceProvider, Result,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::providers::PlaceSearch;

const USER_AGENT: &str = "MoodTrip/0.1 (emotion-driven travel recommendations)";
const SEARCH_LIMIT: usize = 20;
const NEARBY_LIMIT: usize = 10;
/// Half-width of the nearby viewbox in degrees, roughly 2 km.
const NEARBY_RADIUS_DEG: f64 = 0.018;

/// Appended to keyword queries to bias results toward attractions.
const SCENIC_TERMS: &[&str] = &[
    "景点", "park", "自然", "mountain", "lake", "beach", "temple", "garden", "scenic", "viewpoint",
];

fn category_terms(category: FacilityCategory) -> &'static [&'static str] {
    match category {
        FacilityCategory::Dining => &["restaurant", "cafe", "food", "dining"],
        FacilityCategory::Transport => &["bus_station", "train_station", "parking", "transport"],
        FacilityCategory::Accommodation => &["hotel", "hostel", "accommodation", "lodging"],
        FacilityCategory::Other => &[],
    }
}

#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    #[serde(default)]
    place_id: Option<Value>,
    #[serde(default)]
    osm_id: Option<Value>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    lat: String,
    lon: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl NominatimPlace {
    /// Convert to a candidate. Results with unparseable coordinates are dropped.
    pub fn into_candidate(self) -> Option<CandidatePlace> {
        let lat: f64 = self.lat.trim().parse().ok()?;
        let lng: f64 = self.lon.trim().parse().ok()?;

        let id = self
            .place_id
            .as_ref()
            .and_then(id_string)
            .or_else(|| self.osm_id.as_ref().and_then(id_string))
            .unwrap_or_else(|| format!("place_{}", uuid::Uuid::new_v4()));

        let display = self.display_name.unwrap_or_default();
        let name = display
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or(self.name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| "未知地点".to_string());

        let a = self.address.unwrap_or_default();
        let parts: Vec<String> = [a.road, a.suburb, a.city.or(a.town).or(a.village), a.state, a.country]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        let address = if parts.is_empty() { display } else { parts.join(", ") };

        Some(CandidatePlace {
            id,
            name,
            address,
            location: GeoPoint::new(lat, lng),
            rating: None,
            images: Vec::new(),
            description: self.kind.or(self.class).unwrap_or_default(),
            provider: PlaceProvider::Nominatim,
            distance_meters: None,
        })
    }
}

pub struct NominatimPlaceSearch {
    client: Client,
    url: String,
}

impl NominatimPlaceSearch {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Free-text query: keywords, then the region unless nationwide, then scenic terms.
    pub fn build_query(keywords: &KeywordSet, region: &str) -> String {
        let mut parts: Vec<&str> = keywords.iter().collect();
        let region = region.trim();
        if !region.is_empty() && region != "全国" {
            parts.push(region);
        }
        parts.extend_from_slice(SCENIC_TERMS);
        parts.join(" ")
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Vec<CandidatePlace>> {
        let response = self
            .client
            .get(&self.url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ProviderUnavailable(format!(
                "Nominatim API error: {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Nominatim response unreadable: {}", e)))?;
        Ok(places.into_iter().filter_map(NominatimPlace::into_candidate).collect())
    }
}

#[async_trait]
impl PlaceSearch for NominatimPlaceSearch {
    async fn search(&self, keywords: &KeywordSet, region: &str) -> Result<Vec<CandidatePlace>> {
        let q = Self::build_query(keywords, region);
        debug!("Nominatim search: {}", q);
        self.query(&[
            ("q", q),
            ("format", "json".into()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("addressdetails", "1".into()),
            ("extratags", "1".into()),
            ("namedetails", "1".into()),
        ])
        .await
    }

    async fn nearby(
        &self,
        center: GeoPoint,
        categories: &[FacilityCategory],
    ) -> Result<Vec<CandidatePlace>> {
        let viewbox = format!(
            "{},{},{},{}",
            center.lng - NEARBY_RADIUS_DEG,
            center.lat + NEARBY_RADIUS_DEG,
            center.lng + NEARBY_RADIUS_DEG,
            center.lat - NEARBY_RADIUS_DEG
        );

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut attempts = 0usize;
        let mut failures = 0usize;
        for term in categories.iter().flat_map(|c| category_terms(*c)) {
            attempts += 1;
            let found = self
                .query(&[
                    ("q", term.to_string()),
                    ("format", "json".into()),
                    ("limit", NEARBY_LIMIT.to_string()),
                    ("viewbox", viewbox.clone()),
                    ("bounded", "1".into()),
                    ("addressdetails", "1".into()),
                ])
                .await;
            match found {
                Ok(places) => {
                    for mut place in places {
                        if seen.insert(place.id.clone()) {
                            place.distance_meters = Some(center.distance_to(&place.location));
                            results.push(place);
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("Nearby search for '{}' failed: {}", term, e);
                }
            }
        }

        if attempts > 0 && failures == attempts {
            return Err(Error::ProviderUnavailable("every nearby search failed".into()));
        }

        results.sort_by(|a, b| {
            let da = a.distance_meters.unwrap_or(f64::MAX);
            let db = b.distance_meters.unwrap_or(f64::MAX);
            da.total_cmp(&db)
        });
        Ok(results)
    }
}
