//! Grouping of nearby facilities into transport, dining, accommodation and other.

use std::cmp::Ordering;

use moodtrip_core::{CandidatePlace, FacilityCategory, GeoPoint, NearbyFacility, NearbyIndex};

/// Categories requested from place search, in request order.
pub const NEARBY_CATEGORIES: &[FacilityCategory] = &[
    FacilityCategory::Dining,
    FacilityCategory::Transport,
    FacilityCategory::Accommodation,
];

const TRANSPORT_TERMS: &[&str] = &["地铁", "公交", "站", "停车场", "station", "parking", "bus stop"];
const DINING_TERMS: &[&str] = &["餐厅", "饭店", "美食", "小吃", "restaurant", "cafe", "food"];
const ACCOMMODATION_TERMS: &[&str] = &["酒店", "宾馆", "民宿", "住宿", "hotel", "hostel", "inn"];

/// First matching category over `name + address`; checked transport, dining, accommodation.
pub fn categorize(name: &str, address: &str) -> FacilityCategory {
    let text = format!("{} {}", name, address).to_lowercase();
    let hit = |terms: &[&str]| terms.iter().any(|t| text.contains(t));
    if hit(TRANSPORT_TERMS) {
        FacilityCategory::Transport
    } else if hit(DINING_TERMS) {
        FacilityCategory::Dining
    } else if hit(ACCOMMODATION_TERMS) {
        FacilityCategory::Accommodation
    } else {
        FacilityCategory::Other
    }
}

/// Nearest first; facilities without a distance go last in input order.
fn by_distance(a: &NearbyFacility, b: &NearbyFacility) -> Ordering {
    match (a.distance_meters, b.distance_meters) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Bucket places around `center`. Missing distances are computed from coordinates.
pub fn build_index(places: Vec<CandidatePlace>, center: GeoPoint) -> NearbyIndex {
    let mut index = NearbyIndex::default();
    for place in places {
        let category = categorize(&place.name, &place.address);
        let distance = place
            .distance_meters
            .or_else(|| Some(center.distance_to(&place.location)))
            .filter(|d| d.is_finite());
        index.bucket_mut(category).push(NearbyFacility {
            name: place.name,
            address: place.address,
            distance_meters: distance,
            rating: place.rating,
            location: place.location,
        });
    }
    for category in [
        FacilityCategory::Transport,
        FacilityCategory::Dining,
        FacilityCategory::Accommodation,
        FacilityCategory::Other,
    ] {
        index.bucket_mut(category).sort_by(by_distance);
    }
    index
}
