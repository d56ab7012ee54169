//! Application features built on the gateway.

pub mod extract;
pub mod json;
pub mod reviews;
pub mod sentiment;

pub use extract::extract_from_html;
pub use reviews::{Review, ReviewAnalysis, ReviewAnalyst, ReviewsData};
pub use sentiment::{enrich_reviews, Sentiment, SentimentSummary};
