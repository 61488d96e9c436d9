//! Place scorer: rating + keyword matches + distance bonus.
//!
//! `score = rating_weight * rating + keyword_weight * matches + max(0, ceiling - meters / divisor)`.
//! Missing rating counts as 0, missing distance earns no bonus. The sort is
//! stable, so equal scores keep provider order.

use moodtrip_core::{CandidatePlace, KeywordSet, ScoredPlace, ScoringWeights};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PlaceScorer {
    weights: ScoringWeights,
}

impl PlaceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score and order `places`, best first.
    pub fn rank(&self, places: Vec<CandidatePlace>, keywords: &KeywordSet) -> Vec<ScoredPlace> {
        let mut scored: Vec<ScoredPlace> = places
            .into_iter()
            .map(|place| self.score_one(place, keywords))
            .collect();

        // Vec::sort_by is stable.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            "Ranked {} places against {} keywords",
            scored.len(),
            keywords.len()
        );
        scored
    }

    /// Rank and keep the best `k`.
    pub fn top_k(
        &self,
        places: Vec<CandidatePlace>,
        keywords: &KeywordSet,
        k: usize,
    ) -> Vec<ScoredPlace> {
        let mut ranked = self.rank(places, keywords);
        ranked.truncate(k);
        ranked
    }

    fn score_one(&self, place: CandidatePlace, keywords: &KeywordSet) -> ScoredPlace {
        let haystack = place.searchable_text();
        let matched_keywords: Vec<String> = keywords
            .iter()
            .filter(|k| haystack.contains(*k))
            .map(String::from)
            .collect();

        let w = &self.weights;
        let mut score = w.rating * place.rating.unwrap_or(0.0);
        score += w.keyword_match * matched_keywords.len() as f64;
        if let Some(meters) = place.distance_meters {
            score += (w.distance_ceiling - meters / w.distance_divisor).max(0.0);
        }

        ScoredPlace {
            place,
            score,
            matched_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use moodtrip_core::{GeoPoint, PlaceProvider};

    use super::*;

    fn place(id: &str, name: &str, rating: Option<f64>, distance: Option<f64>, desc: &str) -> CandidatePlace {
        CandidatePlace {
            id: id.into(),
            name: name.into(),
            address: String::new(),
            location: GeoPoint::new(30.0, 120.0),
            rating,
            images: Vec::new(),
            description: desc.into(),
            provider: PlaceProvider::Nominatim,
            distance_meters: distance,
        }
    }

    fn keywords(items: &[&str]) -> KeywordSet {
        items.iter().collect()
    }

    #[test]
    fn test_score_formula() {
        let p = place("1", "山水园", Some(5.0), Some(200.0), "有湖有山的安静园林");
        let ranked = PlaceScorer::default().rank(vec![p], &keywords(&["安静", "海边", "湖"]));
        assert_eq!(ranked[0].score, 138.0);
        assert_eq!(ranked[0].matched_keywords, vec!["安静", "湖"]);
    }

    #[test]
    fn test_matched_in_keyword_order() {
        let p = place("1", "湖边森林", None, None, "");
        let ranked = PlaceScorer::default().rank(vec![p], &keywords(&["森林", "湖"]));
        assert_eq!(ranked[0].matched_keywords, vec!["森林", "湖"]);
        assert_eq!(ranked[0].score, 40.0);
    }

    #[test]
    fn test_keyword_counted_once_and_case_insensitive() {
        let p = place("1", "Lake View", None, None, "lake lake LAKE");
        let ranked = PlaceScorer::default().rank(vec![p], &keywords(&["LAKE"]));
        assert_eq!(ranked[0].score, 20.0);
    }

    #[test]
    fn test_far_place_gets_no_negative_bonus() {
        let p = place("1", "远方", Some(4.0), Some(12_000.0), "");
        let ranked = PlaceScorer::default().rank(vec![p], &KeywordSet::new());
        assert_eq!(ranked[0].score, 40.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| place(id, id, Some(3.0), None, ""))
            .collect();
        let mut reversed = input.clone();
        reversed.reverse();

        let scorer = PlaceScorer::default();
        let ids = |v: Vec<ScoredPlace>| v.into_iter().map(|s| s.place.id).collect::<Vec<_>>();
        assert_eq!(ids(scorer.rank(input, &KeywordSet::new())), vec!["a", "b", "c", "d"]);
        assert_eq!(ids(scorer.rank(reversed, &KeywordSet::new())), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_lake_park_beats_city_square() {
        let candidates = vec![
            place("2", "城市广场", Some(4.0), Some(1000.0), "市中心商业广场"),
            place("1", "静湖公园", Some(4.5), Some(300.0), "湖边自然风光，适合散步"),
        ];
        let ranked = PlaceScorer::default().rank(candidates, &keywords(&["宁静", "自然"]));

        assert_eq!(ranked[0].place.name, "静湖公园");
        assert_eq!(ranked[0].score, 112.0);
        assert_eq!(ranked[0].matched_keywords, vec!["自然"]);
        assert_eq!(ranked[1].place.name, "城市广场");
        assert_eq!(ranked[1].score, 80.0);
        assert!(ranked[1].matched_keywords.is_empty());
    }

    #[test]
    fn test_custom_weights_and_top_k() {
        let scorer = PlaceScorer::new(ScoringWeights {
            rating: 1.0,
            keyword_match: 100.0,
            distance_ceiling: 0.0,
            distance_divisor: 100.0,
        });
        let candidates = vec![
            place("1", "高分", Some(5.0), Some(10.0), ""),
            place("2", "海边小镇", Some(1.0), Some(10.0), ""),
            place("3", "其他", None, None, ""),
        ];
        let top = scorer.top_k(candidates, &keywords(&["海边"]), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].place.id, "2");
        assert_eq!(top[1].place.id, "1");
    }
}
