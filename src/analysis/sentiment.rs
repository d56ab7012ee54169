//! Per-review sentiment enrichment.
//!
//! Each of the first [`MAX_ENRICHED_REVIEWS`] reviews is sent to the model on
//! its own and annotated with a sentiment, key topics and a short note. A
//! failed call marks that review and moves on to the next one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::json::{parse_lenient, string_list};
use super::reviews::{Review, ReviewsData};
use crate::providers::{ChatMessage, ChatOptions, Provider};

/// Only this many reviews are annotated; the rest are kept as they are.
pub const MAX_ENRICHED_REVIEWS: usize = 10;

const ENRICH_TEMPERATURE: f32 = 0.2;
const ENRICH_MAX_TOKENS: u32 = 500;

const REVIEWER_PROMPT: &str =
    "You are a medical review analyst. Analyze reviews and provide structured insights.";

const NOT_AVAILABLE: &str = "Analysis not available";
const FAILED: &str = "AI analysis failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Read a model label; anything unrecognised is neutral.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// Sentiment counts over the annotated reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentSummary {
    /// Count sentiments; reviews without one count as neutral.
    pub fn from_reviews(reviews: &[Review]) -> Self {
        reviews.iter().fold(Self::default(), |mut acc, review| {
            match review.sentiment.unwrap_or_default() {
                Sentiment::Positive => acc.positive += 1,
                Sentiment::Neutral => acc.neutral += 1,
                Sentiment::Negative => acc.negative += 1,
            }
            acc
        })
    }
}

fn build_review_prompt(review: &Review) -> String {
    let date = if review.date.is_empty() {
        "Unknown date"
    } else {
        &review.date
    };
    format!(
        r#"Analyze this patient review for a doctor and provide insights:

REVIEW:
Author: {author}
Rating: {rating}/5
Text: "{text}"
Date: {date}

Please provide:
1. Sentiment analysis (positive/neutral/negative)
2. Key topics mentioned
3. Brief AI analysis of the review

Respond in JSON format:
{{
  "sentiment": "positive|neutral|negative",
  "keyTopics": ["topic1", "topic2"],
  "aiAnalysis": "Brief analysis text"
}}
"#,
        author = review.author,
        rating = review.rating,
        text = review.text,
    )
}

fn field<'a>(reply: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    reply.and_then(|v| v.get(key))
}

/// Copy whatever the model produced onto `review`, with neutral defaults.
fn apply_reply(review: &mut Review, reply: Option<&Value>) {
    review.sentiment = Some(
        field(reply, "sentiment")
            .and_then(Value::as_str)
            .map(Sentiment::parse)
            .unwrap_or_default(),
    );
    review.key_topics = Some(field(reply, "keyTopics").map(string_list).unwrap_or_default());
    review.ai_analysis = Some(
        field(reply, "aiAnalysis")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string(),
    );
}

fn mark_failed(review: &mut Review) {
    review.sentiment = Some(Sentiment::Neutral);
    review.key_topics = Some(Vec::new());
    review.ai_analysis = Some(FAILED.to_string());
}

/// Annotate the first reviews in place and fill in `sentiment_summary`.
///
/// Reviews are sent one at a time. A gateway error on one review marks it as
/// failed without stopping the others.
pub async fn enrich_reviews(provider: &Provider, data: &mut ReviewsData) {
    let options = ChatOptions::default()
        .with_temperature(ENRICH_TEMPERATURE)
        .with_max_tokens(ENRICH_MAX_TOKENS);
    let count = data.reviews.len().min(MAX_ENRICHED_REVIEWS);
    info!(
        provider = provider.name(),
        reviews = count,
        "Enriching reviews"
    );

    for review in data.reviews.iter_mut().take(MAX_ENRICHED_REVIEWS) {
        let messages = [
            ChatMessage::system(REVIEWER_PROMPT),
            ChatMessage::user(build_review_prompt(review)),
        ];
        match provider.chat(&messages, &options).await {
            Ok(response) => {
                let parsed = parse_lenient(&response.content);
                if parsed.is_none() {
                    debug!(author = %review.author, "Could not parse review analysis, using defaults");
                }
                apply_reply(review, parsed.as_ref());
            }
            Err(e) => {
                warn!(author = %review.author, error = %e, "Review enrichment failed");
                mark_failed(review);
            }
        }
    }

    data.sentiment_summary = Some(SentimentSummary::from_reviews(&data.reviews[..count]));
}
