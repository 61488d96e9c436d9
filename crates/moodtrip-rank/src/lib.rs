//! MoodTrip Rank: pure scoring and ordering of candidate places.

pub mod scorer;

pub use scorer::PlaceScorer;
