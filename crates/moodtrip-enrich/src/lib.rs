//! MoodTrip Enrich: attaches reviews, weather, nearby facilities and travel
//! advice to ranked places.
//!
//! Every sub-fetch fails on its own: a broken weather provider leaves
//! `weather` empty and is listed in `EnrichedPlace::missing`, while reviews,
//! nearby facilities and advice are still filled in.

pub mod advice;
pub mod aggregator;
pub mod nearby;
pub mod nominatim;
pub mod openweather;
pub mod providers;
pub mod reviews;

pub use aggregator::{EnrichmentAggregator, EnrichmentContext};
pub use nominatim::NominatimPlaceSearch;
pub use openweather::OpenWeatherProvider;
pub use providers::{PlaceSearch, ReviewProvider, WeatherProvider};
pub use reviews::EmptyReviewProvider;
