//! Fan-out enrichment of the ranked top-K.
//!
//! All candidates are enriched concurrently and joined in input order; ranking
//! order is never changed here. Within one candidate, reviews run alongside a
//! weather + nearby pair, and advice follows that pair because its prompt uses
//! both.

use std::sync::Arc;

use futures::future::join_all;
use moodtrip_core::{
    EnrichedPlace, EnrichmentField, KeywordSet, NearbyIndex, QuestionAnswer, ReviewDigest,
    ScoredPlace, TravelAdvice, TravelQuestionnaire, WeatherSnapshot,
};
use moodtrip_infer::ModelGateway;
use tracing::{debug, info, warn};

use crate::advice::{advice_prompt, fallback_advice, parse_advice};
use crate::nearby::{build_index, NEARBY_CATEGORIES};
use crate::providers::{PlaceSearch, ReviewProvider, WeatherProvider};
use crate::reviews::digest;

/// Everything the aggregator knows about the trip.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub keywords: KeywordSet,
    pub questionnaire: TravelQuestionnaire,
    pub answers: Vec<QuestionAnswer>,
}

pub struct EnrichmentAggregator {
    places: Arc<dyn PlaceSearch>,
    weather: Arc<dyn WeatherProvider>,
    reviews: Arc<dyn ReviewProvider>,
    gateway: Arc<ModelGateway>,
}

impl EnrichmentAggregator {
    pub fn new(
        places: Arc<dyn PlaceSearch>,
        weather: Arc<dyn WeatherProvider>,
        reviews: Arc<dyn ReviewProvider>,
        gateway: Arc<ModelGateway>,
    ) -> Self {
        Self {
            places,
            weather,
            reviews,
            gateway,
        }
    }

    /// Enrich every candidate. Output order matches `candidates`.
    pub async fn enrich(
        &self,
        candidates: &[ScoredPlace],
        ctx: &EnrichmentContext,
    ) -> Vec<EnrichedPlace> {
        let enriched = join_all(candidates.iter().map(|c| self.enrich_one(c, ctx))).await;
        let partial = enriched.iter().filter(|e| e.is_partial()).count();
        info!(
            "Enriched {} places ({} partial)",
            enriched.len(),
            partial
        );
        enriched
    }

    async fn enrich_one(&self, scored: &ScoredPlace, ctx: &EnrichmentContext) -> EnrichedPlace {
        let conditions = async {
            let (weather, nearby) = tokio::join!(self.fetch_weather(scored, ctx), self.fetch_nearby(scored));
            let advice = self
                .advise(scored, ctx, weather.as_ref().ok().and_then(Option::as_ref), nearby.as_ref().ok())
                .await;
            (weather, nearby, advice)
        };
        let (reviews, (weather, nearby, advice)) =
            tokio::join!(self.fetch_reviews(scored, ctx), conditions);

        let mut missing = Vec::new();
        let reviews = reviews.unwrap_or_else(|_| {
            missing.push(EnrichmentField::Reviews);
            None
        });
        let weather = weather.unwrap_or_else(|_| {
            missing.push(EnrichmentField::Weather);
            None
        });
        let nearby = match nearby {
            Ok(index) => Some(index),
            Err(()) => {
                missing.push(EnrichmentField::Nearby);
                None
            }
        };

        EnrichedPlace {
            scored: scored.clone(),
            reviews,
            weather,
            nearby,
            travel_advice: advice,
            missing,
        }
    }

    async fn fetch_reviews(
        &self,
        scored: &ScoredPlace,
        ctx: &EnrichmentContext,
    ) -> Result<Option<ReviewDigest>, ()> {
        let place = &scored.place;
        match self.reviews.get(&place.id, place.provider).await {
            Ok(reviews) => Ok(Some(digest(&self.gateway, &reviews, &ctx.keywords).await)),
            Err(e) => {
                warn!("Reviews unavailable for {}: {}", place.id, e);
                Err(())
            }
        }
    }

    async fn fetch_weather(
        &self,
        scored: &ScoredPlace,
        ctx: &EnrichmentContext,
    ) -> Result<Option<WeatherSnapshot>, ()> {
        let place = &scored.place;
        self.weather
            .get(place.location, ctx.questionnaire.travel_date)
            .await
            .map_err(|e| warn!("Weather unavailable for {}: {}", place.id, e))
    }

    async fn fetch_nearby(&self, scored: &ScoredPlace) -> Result<NearbyIndex, ()> {
        let place = &scored.place;
        self.places
            .nearby(place.location, NEARBY_CATEGORIES)
            .await
            .map(|found| build_index(found, place.location))
            .map_err(|e| warn!("Nearby facilities unavailable for {}: {}", place.id, e))
    }

    /// Model advice merged over the rule-based fallback; never fails.
    async fn advise(
        &self,
        scored: &ScoredPlace,
        ctx: &EnrichmentContext,
        weather: Option<&WeatherSnapshot>,
        nearby: Option<&NearbyIndex>,
    ) -> TravelAdvice {
        let fallback = fallback_advice(scored, &ctx.questionnaire, weather);
        let prompt = advice_prompt(
            scored,
            &ctx.questionnaire,
            &ctx.keywords,
            &ctx.answers,
            weather,
            nearby,
        );
        let reply = match self.gateway.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Advice model unavailable for {}: {}", scored.place.id, e);
                return fallback;
            }
        };
        match parse_advice(&reply, fallback.clone()) {
            Ok(advice) => advice,
            Err(e) => {
                warn!("Advice reply for {} not parseable: {}", scored.place.id, e);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use moodtrip_core::{
        CandidatePlace, Error, FacilityCategory, GeoPoint, PlaceProvider, Result, Review,
        Sentiment, TemperatureRange, TimeOfDay,
    };
    use moodtrip_infer::{FallbackChains, MediaBlob, TextModel, VisionModel};
    use parking_lot::Mutex;

    use super::*;

    /// Text model that answers by prompt prefix and fails otherwise.
    struct PromptModel {
        summary: Option<String>,
        advice: Option<String>,
    }

    #[async_trait]
    impl TextModel for PromptModel {
        async fn complete(&self, prompt: &str, _model_id: &str) -> Result<String> {
            let reply = if prompt.starts_with("请分析以下网友评论") {
                self.summary.clone()
            } else {
                self.advice.clone()
            };
            reply.ok_or_else(|| Error::ProviderUnavailable("down".into()))
        }
    }

    #[async_trait]
    impl VisionModel for PromptModel {
        async fn analyze(&self, _i: &MediaBlob, _p: &str, _m: &str) -> Result<String> {
            Err(Error::ProviderUnavailable("text only".into()))
        }
    }

    struct FakePlaces {
        fail: bool,
    }

    #[async_trait]
    impl PlaceSearch for FakePlaces {
        async fn search(&self, _k: &KeywordSet, _r: &str) -> Result<Vec<CandidatePlace>> {
            Ok(Vec::new())
        }

        async fn nearby(
            &self,
            center: GeoPoint,
            _categories: &[FacilityCategory],
        ) -> Result<Vec<CandidatePlace>> {
            if self.fail {
                return Err(Error::ProviderUnavailable("map down".into()));
            }
            Ok(vec![
                place("far", "湖滨酒店", GeoPoint::new(center.lat + 0.01, center.lng), None),
                place("near", "湖滨地铁站", GeoPoint::new(center.lat + 0.001, center.lng), None),
            ])
        }
    }

    struct FakeWeather {
        fail: bool,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn get(&self, _l: GeoPoint, date: NaiveDate) -> Result<Option<WeatherSnapshot>> {
            *self.calls.lock() += 1;
            if self.fail {
                return Err(Error::ProviderUnavailable("weather down".into()));
            }
            Ok(Some(WeatherSnapshot {
                date,
                temperature: TemperatureRange { min: 18.0, max: 24.0 },
                condition: "晴".into(),
                precipitation: 0.0,
                wind_speed: 2.0,
                humidity: 50.0,
            }))
        }
    }

    struct FakeReviews;

    #[async_trait]
    impl ReviewProvider for FakeReviews {
        async fn get(&self, place_id: &str, _p: PlaceProvider) -> Result<Vec<Review>> {
            if place_id == "broken" {
                return Err(Error::ProviderUnavailable("reviews down".into()));
            }
            Ok(vec![
                Review { content: "景色很美，适合放松心情".into(), rating: Some(5.0), time: String::new() },
                Review { content: "环境安静，空气清新".into(), rating: Some(5.0), time: String::new() },
                Review { content: "值得一去".into(), rating: Some(4.0), time: String::new() },
            ])
        }
    }

    fn place(id: &str, name: &str, location: GeoPoint, distance: Option<f64>) -> CandidatePlace {
        CandidatePlace {
            id: id.into(),
            name: name.into(),
            address: String::new(),
            location,
            rating: Some(4.5),
            images: Vec::new(),
            description: String::new(),
            provider: PlaceProvider::Amap,
            distance_meters: distance,
        }
    }

    fn scored(id: &str, score: f64) -> ScoredPlace {
        ScoredPlace {
            place: place(id, &format!("景点{}", id), GeoPoint::new(30.0, 120.0), Some(800.0)),
            score,
            matched_keywords: Vec::new(),
        }
    }

    fn ctx() -> EnrichmentContext {
        EnrichmentContext {
            keywords: ["宁静"].into_iter().collect(),
            questionnaire: TravelQuestionnaire {
                travel_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
                travel_time: TimeOfDay::Morning,
                traveler_count: 3,
                departure_location: "杭州".into(),
            },
            answers: Vec::new(),
        }
    }

    fn aggregator(
        model: PromptModel,
        places_fail: bool,
        weather: Arc<FakeWeather>,
    ) -> EnrichmentAggregator {
        let model = Arc::new(model);
        let gateway = ModelGateway::new(
            model.clone(),
            model,
            FallbackChains { vision: vec![], text: vec!["t1".into()] },
            Duration::from_secs(5),
        );
        EnrichmentAggregator::new(
            Arc::new(FakePlaces { fail: places_fail }),
            weather,
            Arc::new(FakeReviews),
            Arc::new(gateway),
        )
    }

    fn weather(fail: bool) -> Arc<FakeWeather> {
        Arc::new(FakeWeather { fail, calls: Mutex::new(0) })
    }

    #[tokio::test]
    async fn test_weather_failure_leaves_other_fields() {
        let agg = aggregator(
            PromptModel { summary: Some("环境安静优美。".into()), advice: None },
            false,
            weather(true),
        );
        let out = agg.enrich(&[scored("1", 90.0)], &ctx()).await;
        let e = &out[0];

        assert!(e.weather.is_none());
        assert_eq!(e.missing, vec![EnrichmentField::Weather]);
        assert!(e.is_partial());

        let reviews = e.reviews.as_ref().unwrap();
        assert_eq!(reviews.summary, "环境安静优美。");
        assert_eq!(reviews.count, 3);
        assert_eq!(reviews.sentiment, Sentiment::Positive);

        let nearby = e.nearby.as_ref().unwrap();
        assert_eq!(nearby.transport[0].name, "湖滨地铁站");
        assert_eq!(nearby.accommodation[0].name, "湖滨酒店");

        // Advice falls back to rules without weather.
        assert_eq!(e.travel_advice.recommended_time, "09:00");
        assert_eq!(e.travel_advice.recommended_transport, vec!["公共交通", "打车"]);
        assert_eq!(e.travel_advice.notes, "请注意天气变化");
    }

    #[tokio::test]
    async fn test_full_enrichment_with_model_advice() {
        let advice = r#"{"recommendedTime": "08:30", "recommendedTransport": ["地铁"], "itinerarySuggestion": "清晨环湖", "notes": "带伞"}"#;
        let agg = aggregator(
            PromptModel { summary: None, advice: Some(advice.into()) },
            false,
            weather(false),
        );
        let out = agg.enrich(&[scored("1", 90.0)], &ctx()).await;
        let e = &out[0];

        assert!(!e.is_partial());
        assert_eq!(e.weather.as_ref().unwrap().condition, "晴");
        assert_eq!(e.travel_advice.recommended_time, "08:30");
        assert_eq!(e.travel_advice.recommended_transport, vec!["地铁"]);
        // Summary model down: truncation fallback.
        assert!(e.reviews.as_ref().unwrap().summary.starts_with("景色很美，适合放松心情；"));
    }

    #[tokio::test]
    async fn test_failures_isolated_per_candidate_and_order_kept() {
        let w = weather(false);
        let agg = aggregator(PromptModel { summary: None, advice: None }, true, w.clone());
        let candidates = vec![scored("a", 120.0), scored("broken", 100.0), scored("c", 80.0)];
        let out = agg.enrich(&candidates, &ctx()).await;

        let ids: Vec<_> = out.iter().map(|e| e.scored.place.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "broken", "c"]);
        assert_eq!(*w.calls.lock(), 3);

        assert_eq!(out[0].missing, vec![EnrichmentField::Nearby]);
        assert!(out[1].reviews.is_none());
        assert_eq!(out[1].missing, vec![EnrichmentField::Reviews, EnrichmentField::Nearby]);
        assert!(out[2].reviews.is_some());
        for e in &out {
            assert!(e.weather.is_some());
            assert_eq!(e.travel_advice.notes, "注意天气：晴，温度18-24°C");
        }
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let agg = aggregator(PromptModel { summary: None, advice: None }, false, weather(false));
        assert!(agg.enrich(&[], &ctx()).await.is_empty());
    }
}
