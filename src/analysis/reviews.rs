//! Patient review analysis.
//!
//! Scores a doctor against a patient's requirements from their reviews. The
//! structured `analyze_reviews` tool is preferred when the provider can call
//! tools; otherwise the reply text is parsed leniently. Every failure path
//! still yields an analysis.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::json::{parse_lenient, string_list};
use super::sentiment::{Sentiment, SentimentSummary};
use crate::error::{GatewayError, ToolError};
use crate::providers::mock::MockProvider;
use crate::providers::openai_compat::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::providers::schema::{ObjectSchema, ParamSchema, Tool};
use crate::providers::{ChatMessage, ChatOptions, Provider};
use crate::tools::{ToolHandler, ToolRegistry};

pub const ANALYZE_TOOL_NAME: &str = "analyze_reviews";

const ANALYST_PROMPT: &str = "You are a medical review analyst specializing in French healthcare. \
Analyze doctor reviews and provide insights based on user requirements. \
Respond in French and be objective and helpful.";

const NO_SUMMARY: &str = "Analyse non disponible";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: String,
    pub rating: f64,
    pub text: String,
    #[serde(default)]
    pub date: String,
    /// Set by [`enrich_reviews`](super::sentiment::enrich_reviews).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
}

impl Review {
    pub fn new(author: impl Into<String>, rating: f64, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            rating,
            text: text.into(),
            date: String::new(),
            sentiment: None,
            key_topics: None,
            ai_analysis: None,
        }
    }
}

/// Reviews collected for one doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsData {
    pub average_rating: f64,
    pub total_reviews: u32,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_summary: Option<SentimentSummary>,
}

/// Structured verdict; `score` is always within 0..=10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAnalysis {
    pub score: f64,
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub lgbt_friendly: bool,
    pub languages: Vec<String>,
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 10.0)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl ReviewAnalysis {
    /// Read an analysis out of whatever object the model produced.
    ///
    /// A numeric `score` is required; other missing or mistyped fields get
    /// neutral defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let score = match obj.get("score")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        let summary = obj
            .get("summary")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUMMARY);

        Some(Self {
            score: clamp_score(score),
            summary: summary.to_string(),
            pros: obj.get("pros").map(string_list).unwrap_or_default(),
            cons: obj.get("cons").map(string_list).unwrap_or_default(),
            lgbt_friendly: obj.get("lgbtFriendly").is_some_and(truthy),
            languages: obj.get("languages").map(string_list).unwrap_or_default(),
        })
    }

    /// Offline analysis that reacts to the patient's requirements.
    pub fn mock(reviews: &ReviewsData, requirements: &str) -> Self {
        let wanted = requirements.to_lowercase();
        let lgbt = wanted.contains("lgbt") || wanted.contains("trans");
        let english = wanted.contains("anglais") || wanted.contains("english");

        let mut score = reviews.average_rating * 2.0;
        if lgbt {
            score += 1.0;
        }
        if english {
            score += 0.5;
        }

        let mut summary = format!(
            "Docteur bien noté avec {}/5 étoiles. {}",
            reviews.average_rating,
            if lgbt {
                "Semble ouvert et bienveillant selon les avis."
            } else {
                "Professionnel compétent."
            }
        );
        if english {
            summary.push_str(" Parle anglais selon certains patients.");
        }

        let mut pros = vec![
            "Très professionnel et compétent".to_string(),
            "À l'écoute des patients".to_string(),
        ];
        if lgbt {
            pros.push("Bienveillant et respectueux".to_string());
        }
        if english {
            pros.push("Parle anglais".to_string());
        }
        pros.push("Cabinet bien situé".to_string());

        let cons = if reviews.average_rating < 4.5 {
            vec![
                "Délais de rendez-vous parfois longs".to_string(),
                "Consultations parfois expéditives".to_string(),
            ]
        } else {
            Vec::new()
        };

        let mut languages = vec!["Français".to_string()];
        if english {
            languages.push("Anglais".to_string());
        }

        Self {
            score: clamp_score(score),
            summary,
            pros,
            cons,
            lgbt_friendly: lgbt,
            languages,
        }
    }

    /// Analysis derived from the average rating alone.
    pub fn from_rating(reviews: &ReviewsData) -> Self {
        Self {
            score: clamp_score((reviews.average_rating * 2.0).min(10.0)),
            summary: format!(
                "Docteur avec une note moyenne de {}/5 basée sur {} avis.",
                reviews.average_rating, reviews.total_reviews
            ),
            pros: vec![
                "Professionnel de santé qualifié".to_string(),
                "Avis patients disponibles".to_string(),
            ],
            cons: if reviews.average_rating < 4.0 {
                vec!["Note moyenne perfectible".to_string()]
            } else {
                Vec::new()
            },
            lgbt_friendly: false,
            languages: vec!["Français".to_string()],
        }
    }
}

/// Parse a free-text reply, falling back to the rating-based analysis.
pub fn parse_analysis_reply(reply: &str, reviews: &ReviewsData) -> ReviewAnalysis {
    match parse_lenient(reply).as_ref().and_then(ReviewAnalysis::from_value) {
        Some(analysis) => analysis,
        None => {
            warn!("Could not parse analysis reply, using rating-based fallback");
            debug!(reply, "Unparsed analysis reply");
            ReviewAnalysis::from_rating(reviews)
        }
    }
}

/// Build the user prompt sent to the analyst model.
pub fn build_analysis_prompt(reviews: &ReviewsData, requirements: &str) -> String {
    let reviews_text = reviews
        .reviews
        .iter()
        .map(|r| format!("Avis {}/5 par {}: \"{}\"", r.rating, r.author, r.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    let requirements = if requirements.trim().is_empty() {
        "Aucune exigence spécifique"
    } else {
        requirements
    };

    format!(
        r#"Analysez ces avis de patients pour un docteur français et fournissez une évaluation basée sur les exigences suivantes:

EXIGENCES DU PATIENT:
{requirements}

AVIS À ANALYSER:
Note moyenne: {avg}/5 ({total} avis)

{reviews_text}

Veuillez fournir votre analyse au format JSON suivant:
{{
  "score": [note sur 10 basée sur la correspondance avec les exigences],
  "summary": "[résumé en 2-3 phrases de votre évaluation]",
  "pros": ["[point positif 1]", "[point positif 2]", "[point positif 3]"],
  "cons": ["[point négatif 1]", "[point négatif 2]"],
  "lgbtFriendly": [true/false basé sur les indices dans les avis],
  "languages": ["[langues mentionnées dans les avis]"]
}}

Concentrez-vous particulièrement sur:
- La correspondance avec les exigences spécifiques du patient
- L'attitude du médecin (bienveillance, respect, écoute)
- La qualité des soins médicaux
- L'accessibilité et la communication
- Tout indice sur l'ouverture d'esprit et l'inclusivité
"#,
        avg = reviews.average_rating,
        total = reviews.total_reviews,
    )
}

/// Declares `analyze_reviews` and keeps the arguments the model sent.
struct CaptureAnalysis {
    tool: Tool,
    captured: Arc<Mutex<Option<Value>>>,
}

impl CaptureAnalysis {
    fn new(captured: Arc<Mutex<Option<Value>>>) -> Self {
        let strings = || ParamSchema::array_of(ParamSchema::string());
        let parameters = ObjectSchema::new()
            .required_property(
                "score",
                ParamSchema::number_in(0.0, 10.0)
                    .describe("Note sur 10 selon la correspondance avec les exigences"),
            )
            .required_property("summary", ParamSchema::string())
            .required_property("pros", strings())
            .required_property("cons", strings())
            .required_property("lgbtFriendly", ParamSchema::boolean())
            .required_property("languages", strings());
        Self {
            tool: Tool::new(
                ANALYZE_TOOL_NAME,
                "Analyze doctor reviews and provide structured analysis",
                parameters,
            ),
            captured,
        }
    }
}

#[async_trait]
impl ToolHandler for CaptureAnalysis {
    fn definition(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        *self.captured.lock().unwrap_or_else(|e| e.into_inner()) = Some(args);
        Ok(json!({ "status": "recorded" }))
    }
}

/// Turns reviews plus requirements into a [`ReviewAnalysis`].
pub struct ReviewAnalyst {
    provider: Provider,
}

impl ReviewAnalyst {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    /// Analyze `reviews`. Never fails: gateway errors degrade to the mock
    /// analysis.
    pub async fn analyze(&self, reviews: &ReviewsData, requirements: &str) -> ReviewAnalysis {
        if self.provider.name() == MockProvider::NAME {
            info!("No LLM credential configured, returning mock analysis");
            return ReviewAnalysis::mock(reviews, requirements);
        }

        info!(
            provider = self.provider.name(),
            reviews = reviews.reviews.len(),
            "Starting review analysis"
        );
        match self.try_analyze(reviews, requirements).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Review analysis failed, returning mock analysis");
                ReviewAnalysis::mock(reviews, requirements)
            }
        }
    }

    async fn try_analyze(
        &self,
        reviews: &ReviewsData,
        requirements: &str,
    ) -> Result<ReviewAnalysis, GatewayError> {
        let messages = vec![
            ChatMessage::system(ANALYST_PROMPT),
            ChatMessage::user(build_analysis_prompt(reviews, requirements)),
        ];

        if self.provider.supports_tools() {
            if let Some(analysis) = self.analyze_with_tool(&messages).await? {
                return Ok(analysis);
            }
            debug!("No structured analysis from tool round, asking for plain text");
        }

        let options = ChatOptions::default()
            .with_temperature(DEFAULT_TEMPERATURE)
            .with_max_tokens(DEFAULT_MAX_TOKENS);
        let completion = self.provider.chat(&messages, &options).await?;
        if completion.content.trim().is_empty() {
            return Err(GatewayError::ResponseShape(
                "empty reply to analysis request".to_string(),
            ));
        }

        Ok(parse_analysis_reply(&completion.content, reviews))
    }

    async fn analyze_with_tool(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Option<ReviewAnalysis>, GatewayError> {
        let captured = Arc::new(Mutex::new(None));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CaptureAnalysis::new(captured.clone())));

        let reply = self
            .provider
            .chat_with_tools(messages, &registry.definitions(), &registry)
            .await?;

        let args = captured.lock().unwrap_or_else(|e| e.into_inner()).take();
        let structured = args
            .as_ref()
            .and_then(ReviewAnalysis::from_value)
            .or_else(|| parse_lenient(&reply).as_ref().and_then(ReviewAnalysis::from_value));
        Ok(structured)
    }
}
