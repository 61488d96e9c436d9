//! Review digests: model summary with a truncation fallback, rating-based sentiment.

use async_trait::async_trait;
use moodtrip_core::{KeywordSet, PlaceProvider, Result, Review, ReviewDigest, Sentiment};
use moodtrip_infer::ModelGateway;
use tracing::warn;

use crate::providers::ReviewProvider;

const NO_REVIEWS: &str = "暂无评论";
const SUMMARY_CHAR_LIMIT: usize = 100;
/// Rating assumed for reviews that carry none.
const DEFAULT_RATING: f64 = 3.0;

/// Review source for deployments without a review-capable map provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyReviewProvider;

#[async_trait]
impl ReviewProvider for EmptyReviewProvider {
    async fn get(&self, _place_id: &str, _provider: PlaceProvider) -> Result<Vec<Review>> {
        Ok(Vec::new())
    }
}

/// Average rating >= 4.5 is positive, >= 3.5 neutral, otherwise negative.
pub fn sentiment(reviews: &[Review]) -> Sentiment {
    if reviews.is_empty() {
        return Sentiment::Neutral;
    }
    let total: f64 = reviews.iter().map(|r| r.rating.unwrap_or(DEFAULT_RATING)).sum();
    let avg = total / reviews.len() as f64;
    if avg >= 4.5 {
        Sentiment::Positive
    } else if avg >= 3.5 {
        Sentiment::Neutral
    } else {
        Sentiment::Negative
    }
}

/// First three reviews joined with `；`, cut to 100 characters.
pub fn simple_summary(reviews: &[Review]) -> String {
    let joined = reviews
        .iter()
        .take(3)
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join("；");
    if joined.chars().count() > SUMMARY_CHAR_LIMIT {
        let cut: String = joined.chars().take(SUMMARY_CHAR_LIMIT).collect();
        format!("{}...", cut)
    } else {
        joined
    }
}

pub fn summary_prompt(reviews: &[Review], keywords: &KeywordSet) -> String {
    let text = reviews
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "请分析以下网友评论，提取与关键词\"{}\"相关的核心观点，生成2-5句精简的评论摘要。只返回摘要内容，不要其他解释：\n\n{}\n\n评论摘要：",
        keywords.joined(),
        text
    )
}

/// Summarize `reviews` for a place. Never fails.
pub async fn digest(gateway: &ModelGateway, reviews: &[Review], keywords: &KeywordSet) -> ReviewDigest {
    if reviews.is_empty() {
        return ReviewDigest {
            summary: NO_REVIEWS.into(),
            count: 0,
            sentiment: Sentiment::Neutral,
        };
    }

    let summary = match gateway.complete(&summary_prompt(reviews, keywords)).await {
        Ok(s) => s.trim().to_string(),
        Err(e) => {
            warn!("Review summary failed, truncating instead: {}", e);
            simple_summary(reviews)
        }
    };

    ReviewDigest {
        summary,
        count: reviews.len(),
        sentiment: sentiment(reviews),
    }
}
