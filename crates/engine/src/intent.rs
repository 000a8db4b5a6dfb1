//! Query intent extraction.
//!
//! The LLM classifies the question into a topic plus optional location,
//! period and metrics. When the call fails or its output cannot be parsed,
//! a keyword classifier takes over. Intent is advisory: it only adds a focus
//! line to the answer prompt.

use agriqa_catalog::{tokenize, KeywordSet};
use agriqa_core::{AppError, Language};
use agriqa_llm::{LlmClient, LlmRequest};
use agriqa_prompt::{ids, PromptLibrary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Topic of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    CropProduction,
    Rainfall,
    MarketPrices,
    Climate,
    Policy,
    General,
}

impl IntentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CropProduction => "crop_production",
            Self::Rainfall => "rainfall",
            Self::MarketPrices => "market_prices",
            Self::Climate => "climate",
            Self::Policy => "policy",
            Self::General => "general",
        }
    }

    /// Parse a topic label, tolerating case, spacing and a few synonyms.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        let tag = match normalized.as_str() {
            "crop_production" | "crop" | "crops" | "crop_yield" | "production" | "yield"
            | "agriculture" => Self::CropProduction,
            "rainfall" | "rain" | "precipitation" | "monsoon" => Self::Rainfall,
            "market_prices" | "market_price" | "prices" | "price" | "market" | "markets" => {
                Self::MarketPrices
            }
            "climate" | "weather" | "temperature" => Self::Climate,
            "policy" | "policies" | "scheme" | "schemes" => Self::Policy,
            "general" | "other" => Self::General,
            _ => return None,
        };
        Some(tag)
    }
}

impl fmt::Display for IntentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    Llm,
    Rules,
}

/// What a question is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub tag: IntentTag,
    pub location: Option<String>,
    pub time_period: Option<String>,
    pub metrics: Vec<String>,
    pub query_type: Option<String>,
    pub source: IntentSource,
}

impl QueryIntent {
    pub fn general(source: IntentSource) -> Self {
        Self {
            tag: IntentTag::General,
            location: None,
            time_period: None,
            metrics: Vec::new(),
            query_type: None,
            source,
        }
    }

    /// One-line summary rendered into answer prompts.
    pub fn focus_line(&self) -> String {
        let mut parts = vec![format!("topic: {}", self.tag)];
        if let Some(location) = &self.location {
            parts.push(format!("location: {}", location));
        }
        if let Some(period) = &self.time_period {
            parts.push(format!("period: {}", period));
        }
        if !self.metrics.is_empty() {
            parts.push(format!("metrics: {}", self.metrics.join(", ")));
        }
        if let Some(query_type) = &self.query_type {
            parts.push(format!("type: {}", query_type));
        }
        parts.join("; ")
    }
}

/// Why model output could not be turned into an intent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    #[error("no JSON object in model output")]
    NoJson,

    #[error("malformed intent JSON: {0}")]
    Json(String),

    #[error("missing topic")]
    MissingTopic,

    #[error("unknown topic '{0}'")]
    UnknownTopic(String),
}

/// Why the LLM path produced no intent.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("intent prompt unavailable: {0}")]
    Prompt(AppError),

    #[error("intent classification call failed: {0}")]
    Llm(AppError),

    #[error(transparent)]
    Parse(#[from] IntentParseError),
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    location: Value,
    #[serde(default)]
    time_period: Value,
    #[serde(default)]
    metrics: Value,
    #[serde(default)]
    query_type: Value,
}

/// Parse the classifier's reply.
///
/// Accepts bare JSON, JSON wrapped in a markdown fence, or JSON surrounded
/// by prose.
pub fn parse_intent(output: &str) -> Result<QueryIntent, IntentParseError> {
    let start = output.find('{').ok_or(IntentParseError::NoJson)?;
    let end = output.rfind('}').ok_or(IntentParseError::NoJson)?;
    if end < start {
        return Err(IntentParseError::NoJson);
    }

    let raw: RawIntent = serde_json::from_str(&output[start..=end])
        .map_err(|e| IntentParseError::Json(e.to_string()))?;

    let topic = raw.topic.ok_or(IntentParseError::MissingTopic)?;
    let tag = IntentTag::parse(&topic).ok_or(IntentParseError::UnknownTopic(topic))?;

    Ok(QueryIntent {
        tag,
        location: text_field(&raw.location),
        time_period: text_field(&raw.time_period),
        metrics: list_field(&raw.metrics),
        query_type: text_field(&raw.query_type),
        source: IntentSource::Llm,
    })
}

fn text_field(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.to_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(text),
    }
}

fn list_field(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_field).collect(),
        other => text_field(other).into_iter().collect(),
    }
}

/// Keyword classifier used when the LLM cannot be.
#[derive(Debug, Clone)]
pub struct IntentRules {
    topics: Vec<(IntentTag, KeywordSet)>,
    states: Vec<(String, Vec<String>)>,
}

const TOPIC_KEYWORDS: &[(IntentTag, &[&str])] = &[
    (
        IntentTag::MarketPrices,
        &[
            "price", "market", "mandi", "commodity", "cost", "rate", "wholesale", "मूल्य",
            "कीमत", "कीमतें", "दाम", "भाव", "मंडी", "बाजार", "बाज़ार",
        ],
    ),
    (
        IntentTag::Rainfall,
        &["rain", "rainfall", "monsoon", "precipitation", "बारिश", "वर्षा", "मानसून"],
    ),
    (
        IntentTag::CropProduction,
        &[
            "crop", "production", "yield", "harvest", "agriculture", "agricultural", "farming",
            "cultivation", "kharif", "rabi", "फसल", "उत्पादन", "उपज", "कृषि", "खेती",
        ],
    ),
    (
        IntentTag::Climate,
        &[
            "climate", "temperature", "drought", "flood", "heatwave", "cyclone", "जलवायु",
            "तापमान", "सूखा", "बाढ़",
        ],
    ),
    (
        IntentTag::Policy,
        &[
            "policy", "scheme", "subsidy", "insurance", "loan", "msp", "योजना", "नीति",
            "सब्सिडी", "बीमा",
        ],
    ),
];

const STATES: &[&str] = &[
    "Andhra Pradesh", "Arunachal Pradesh", "Assam", "Bihar", "Chhattisgarh", "Goa",
    "Gujarat", "Haryana", "Himachal Pradesh", "Jharkhand", "Karnataka", "Kerala",
    "Madhya Pradesh", "Maharashtra", "Manipur", "Meghalaya", "Mizoram", "Nagaland",
    "Odisha", "Punjab", "Rajasthan", "Sikkim", "Tamil Nadu", "Telangana", "Tripura",
    "Uttar Pradesh", "Uttarakhand", "West Bengal", "Delhi", "Jammu and Kashmir", "Ladakh",
    "Puducherry",
];

impl Default for IntentRules {
    fn default() -> Self {
        Self {
            topics: TOPIC_KEYWORDS
                .iter()
                .map(|(tag, words)| (*tag, KeywordSet::new(words.iter())))
                .collect(),
            states: STATES
                .iter()
                .map(|name| (name.to_string(), tokenize(name)))
                .collect(),
        }
    }
}

impl IntentRules {
    /// Highest keyword score wins; ties go to the earlier topic.
    pub fn classify(&self, question: &str) -> QueryIntent {
        let tokens = tokenize(question);

        let mut best: Option<(IntentTag, usize)> = None;
        for (tag, keywords) in &self.topics {
            let hits = keywords.hits(&tokens);
            if hits > 0 && best.map_or(true, |(_, score)| hits > score) {
                best = Some((*tag, hits));
            }
        }

        let mut intent = QueryIntent::general(IntentSource::Rules);
        intent.tag = best.map_or(IntentTag::General, |(tag, _)| tag);
        intent.location = self.find_state(&tokens);
        intent.time_period = find_period(&tokens);
        intent
    }

    fn find_state(&self, tokens: &[String]) -> Option<String> {
        self.states
            .iter()
            .find(|(_, words)| tokens.windows(words.len()).any(|w| w == words.as_slice()))
            .map(|(name, _)| name.clone())
    }
}

/// First and last plausible years in the question.
fn find_period(tokens: &[String]) -> Option<String> {
    let years: Vec<u32> = tokens
        .iter()
        .filter(|t| t.len() == 4)
        .filter_map(|t| t.parse().ok())
        .filter(|y| (1900..=2100).contains(y))
        .collect();

    match (years.first(), years.last()) {
        (Some(first), Some(last)) if first != last => Some(format!("{}-{}", first, last)),
        (Some(first), _) => Some(first.to_string()),
        _ => None,
    }
}

/// LLM-backed intent classifier with a keyword fallback.
pub struct IntentExtractor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    rules: IntentRules,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: impl Into<String>) -> Self {
        Self {
            llm,
            prompts,
            model: model.into(),
            rules: IntentRules::default(),
        }
    }

    /// Classify a question. Never fails.
    #[instrument(skip(self, question), fields(provider = self.llm.provider_name()))]
    pub async fn extract(&self, question: &str, language: Language) -> QueryIntent {
        match self.extract_with_llm(question, language).await {
            Ok(intent) => {
                debug!(tag = %intent.tag, "Intent from LLM");
                intent
            }
            Err(error) => {
                let intent = self.rules.classify(question);
                warn!(%error, tag = %intent.tag, "Falling back to rule-based intent");
                intent
            }
        }
    }

    async fn extract_with_llm(&self, question: &str, language: Language) -> Result<QueryIntent, IntentError> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert(
            "language_name".to_string(),
            language.instruction_name().to_string(),
        );

        let built = self
            .prompts
            .render(ids::INTENT_CLASSIFY, variables)
            .map_err(IntentError::Prompt)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.0);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.llm.complete(&request).await.map_err(IntentError::Llm)?;
        Ok(parse_intent(&response.content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriqa_llm::{MockClient, MockReply};

    fn extractor(client: MockClient) -> IntentExtractor {
        IntentExtractor::new(
            Arc::new(client),
            Arc::new(PromptLibrary::builtin().unwrap()),
            "mock-model",
        )
    }

    #[test]
    fn test_parse_plain_json() {
        let intent = parse_intent(
            r#"{"topic": "market_prices", "location": "Bihar", "time_period": null, "metrics": ["modal_price"], "query_type": "statistics"}"#,
        )
        .unwrap();

        assert_eq!(intent.tag, IntentTag::MarketPrices);
        assert_eq!(intent.location.as_deref(), Some("Bihar"));
        assert!(intent.time_period.is_none());
        assert_eq!(intent.metrics, vec!["modal_price"]);
        assert_eq!(intent.source, IntentSource::Llm);
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let output = "Here is the analysis:\n```json\n{\"topic\": \"Crop Production\", \"metrics\": \"yield\", \"time_period\": 2019}\n```";
        let intent = parse_intent(output).unwrap();
        assert_eq!(intent.tag, IntentTag::CropProduction);
        assert_eq!(intent.metrics, vec!["yield"]);
        assert_eq!(intent.time_period.as_deref(), Some("2019"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_intent("no json here"), Err(IntentParseError::NoJson));
        assert!(matches!(parse_intent("{not json}"), Err(IntentParseError::Json(_))));
        assert_eq!(
            parse_intent(r#"{"location": "Goa"}"#),
            Err(IntentParseError::MissingTopic)
        );
        assert_eq!(
            parse_intent(r#"{"topic": "astronomy"}"#),
            Err(IntentParseError::UnknownTopic("astronomy".to_string()))
        );
    }

    #[test]
    fn test_rules_classify() {
        let rules = IntentRules::default();

        let intent = rules.classify("What are potato prices in Bihar?");
        assert_eq!(intent.tag, IntentTag::MarketPrices);
        assert_eq!(intent.location.as_deref(), Some("Bihar"));
        assert_eq!(intent.source, IntentSource::Rules);

        let intent = rules.classify("Compare rainfall in Tamil Nadu between 2015 and 2020");
        assert_eq!(intent.tag, IntentTag::Rainfall);
        assert_eq!(intent.location.as_deref(), Some("Tamil Nadu"));
        assert_eq!(intent.time_period.as_deref(), Some("2015-2020"));

        assert_eq!(rules.classify("मूल्य दिखाएं").tag, IntentTag::MarketPrices);
        assert_eq!(
            rules.classify("Show weather satellite imagery resolution specs").tag,
            IntentTag::General
        );
    }

    #[test]
    fn test_focus_line() {
        let mut intent = QueryIntent::general(IntentSource::Llm);
        intent.tag = IntentTag::Rainfall;
        intent.location = Some("Kerala".to_string());
        intent.metrics = vec!["annual".to_string(), "mm".to_string()];
        assert_eq!(
            intent.focus_line(),
            "topic: rainfall; location: Kerala; metrics: annual, mm"
        );
    }

    #[tokio::test]
    async fn test_extract_uses_llm_output() {
        let client = MockClient::always(r#"{"topic": "climate", "location": "Odisha"}"#);
        let intent = extractor(client).extract("Heatwaves in Odisha", Language::En).await;
        assert_eq!(intent.tag, IntentTag::Climate);
        assert_eq!(intent.source, IntentSource::Llm);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_llm_failure() {
        let intent = extractor(MockClient::failing("connection refused"))
            .extract("Wheat production in Punjab", Language::En)
            .await;
        assert_eq!(intent.tag, IntentTag::CropProduction);
        assert_eq!(intent.source, IntentSource::Rules);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_unparseable_output() {
        let client = MockClient::scripted(vec![MockReply::Text("I think it is about prices".to_string())]);
        let intent = extractor(client).extract("प्याज की कीमत", Language::Hi).await;
        assert_eq!(intent.tag, IntentTag::MarketPrices);
        assert_eq!(intent.source, IntentSource::Rules);
    }

    #[tokio::test]
    async fn test_llm_path_errors_keep_their_kind() {
        let err = extractor(MockClient::failing("connection refused"))
            .extract_with_llm("Wheat production in Punjab", Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, IntentError::Llm(AppError::Llm(_))));

        let err = extractor(MockClient::always(r#"{"topic": "astrology"}"#))
            .extract_with_llm("Lucky sowing days", Language::En)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntentError::Parse(IntentParseError::UnknownTopic(ref t)) if t == "astrology"
        ));
    }

    #[tokio::test]
    async fn test_extract_sends_classifier_prompt() {
        let client = Arc::new(MockClient::always(r#"{"topic": "general"}"#));
        let extractor = IntentExtractor::new(
            client.clone(),
            Arc::new(PromptLibrary::builtin().unwrap()),
            "mock-model",
        );
        extractor.extract("Soil types of Goa", Language::Hi).await;

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Soil types of Goa"));
        assert!(calls[0].system.as_deref().unwrap_or("").contains("crop_production"));
        assert_eq!(calls[0].model, "mock-model");
    }
}
