use crate::config::OrganizerConfig;
use crate::error::{ConfigError, OrganizeError};
use crate::models::{Classification, Document};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Continents the model is allowed to answer with.
pub const ALLOWED_CONTINENTS: [&str; 7] = [
    "Africa",
    "Antarctica",
    "Asia",
    "Europe",
    "North America",
    "Oceania",
    "South America",
];

/// A text-in, text-out model endpoint. One blocking call per document.
pub trait LanguageModel {
    fn generate(&self, prompt: &str) -> Result<String, OrganizeError>;
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &OrganizerConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.api_base_url.trim_end_matches('/'),
                config.model.trim()
            ),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LanguageModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, OrganizeError> {
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OrganizeError::Transport(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                body.trim()
            )));
        }

        let payload: GenerateResponse = response.json()?;
        response_text(payload)
    }
}

fn response_text(payload: GenerateResponse) -> Result<String, OrganizeError> {
    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| OrganizeError::Transport("model returned no candidates".to_string()))?;

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(OrganizeError::Transport(format!(
            "model returned no text (finish reason: {})",
            if finish_reason.is_empty() {
                "unknown"
            } else {
                finish_reason.as_str()
            }
        )));
    }

    Ok(text)
}

/// Builds the destination-extraction prompt for one document.
pub fn build_prompt(document: &Document, max_chars: usize) -> String {
    let text = prepare_text(&document.text, max_chars);
    format!(
        "Analyze the travel document '{name}' and list every travel destination it mentions.\n\
         \n\
         Rules:\n\
         1. Include every destination, even when the trip spans several countries or cities.\n\
         2. Ignore universities and other institutions named after places.\n\
         3. For each destination give the city, the country and the continent.\n\
         4. The continent must be one of: {continents}.\n\
         5. Reply with a JSON list only, for example:\n\
         [{{\"city\": \"London\", \"country\": \"United Kingdom\", \"continent\": \"Europe\"}}]\n\
         6. Use null for a field you cannot determine. If nothing is found, reply [].\n\
         \n\
         Text:\n\
         ---\n\
         {text}\n\
         ---\n",
        name = document.file_name,
        continents = ALLOWED_CONTINENTS.join(", "),
    )
}

/// Drops control characters (keeping newlines and tabs) and truncates on a char boundary.
pub fn prepare_text(text: &str, max_chars: usize) -> String {
    text.chars()
        .filter(|ch| !ch.is_control() || *ch == '\n' || *ch == '\t')
        .take(max_chars)
        .collect()
}

/// Destinations parsed from one model reply.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedDestinations {
    pub classifications: Vec<Classification>,
    /// Entries dropped because none of their fields could be read.
    pub incomplete: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDestination {
    #[serde(default, alias = "continente")]
    continent: Option<String>,
    #[serde(default, alias = "pais", alias = "país")]
    country: Option<String>,
    #[serde(default, alias = "cidade", alias = "ciudad")]
    city: Option<String>,
}

impl From<RawDestination> for Classification {
    fn from(value: RawDestination) -> Self {
        let present = |field: Option<String>| {
            field
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case("null"))
        };

        Classification {
            continent: present(value.continent),
            country: present(value.country),
            city: present(value.city),
        }
    }
}

/// Parses a model reply into classifications.
///
/// Accepted shapes: a JSON list of destination objects, a single destination
/// object, or an object with a `destinations` list, optionally wrapped in a
/// Markdown code fence. Unknown keys are ignored; string or null fields only.
pub fn parse_destinations(raw: &str) -> Result<ParsedDestinations, OrganizeError> {
    let cleaned = strip_code_fence(raw)?;
    let value: Value = serde_json::from_str(&cleaned).map_err(|error| OrganizeError::Parse {
        reason: error.to_string(),
        raw: raw.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("destinations") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(parse_error("`destinations` is not a list", raw));
            }
            None => vec![Value::Object(object)],
        },
        _ => return Err(parse_error("expected a list of destinations", raw)),
    };

    let mut parsed = ParsedDestinations::default();
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(parse_error(&format!("destination {index} is not an object"), raw));
        }

        let rendered = item.to_string();
        let destination: RawDestination = serde_json::from_value(item).map_err(|error| {
            parse_error(&format!("destination {index}: {error}"), raw)
        })?;

        let classification = Classification::from(destination);
        if classification.is_empty() {
            parsed.incomplete.push(rendered);
        } else {
            parsed.classifications.push(classification);
        }
    }

    Ok(parsed)
}

fn strip_code_fence(raw: &str) -> Result<String, OrganizeError> {
    let fence = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").map_err(|error| OrganizeError::Parse {
        reason: error.to_string(),
        raw: raw.to_string(),
    })?;

    let cleaned = fence
        .captures(raw)
        .and_then(|capture| capture.get(1))
        .map(|body| body.as_str())
        .unwrap_or(raw);

    Ok(cleaned.trim().to_string())
}

fn parse_error(reason: &str, raw: &str) -> OrganizeError {
    OrganizeError::Parse {
        reason: reason.to_string(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn document(text: &str) -> Document {
        Document {
            path: PathBuf::from("/in/trip.pdf"),
            file_name: "trip.pdf".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn list_reply_is_parsed_into_classifications() -> Result<(), Box<dyn std::error::Error>> {
        let raw = r#"[
            {"city": "Rio de Janeiro", "country": "Brasil", "continent": "South America"},
            {"city": "Lisbon", "country": "Portugal", "continent": "Europe", "confidence": 0.9}
        ]"#;

        let parsed = parse_destinations(raw)?;
        assert_eq!(
            parsed.classifications,
            vec![
                Classification::new("South America", "Brasil", "Rio de Janeiro"),
                Classification::new("Europe", "Portugal", "Lisbon"),
            ]
        );
        assert!(parsed.incomplete.is_empty());
        Ok(())
    }

    #[test]
    fn fenced_reply_and_field_aliases_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let raw = "```json\n[{\"cidade\": \"Santiago\", \"pais\": \"Chile\", \"continente\": \"LATAM\"}]\n```";

        let parsed = parse_destinations(raw)?;
        assert_eq!(
            parsed.classifications,
            vec![Classification::new("LATAM", "Chile", "Santiago")]
        );
        Ok(())
    }

    #[test]
    fn single_object_and_wrapped_list_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let single = parse_destinations(r#"{"city": "Tokyo", "country": "Japan", "continent": "Asia"}"#)?;
        assert_eq!(single.classifications.len(), 1);

        let wrapped = parse_destinations(
            r#"{"destinations": [{"city": "Paris", "country": null, "continent": "Europe"}]}"#,
        )?;
        assert_eq!(
            wrapped.classifications,
            vec![Classification {
                continent: Some("Europe".to_string()),
                country: None,
                city: Some("Paris".to_string()),
            }]
        );
        Ok(())
    }

    #[test]
    fn entries_without_any_field_are_reported_incomplete() -> Result<(), Box<dyn std::error::Error>> {
        let parsed = parse_destinations(r#"[{"city": " ", "note": "x"}, {"city": "Oslo"}]"#)?;
        assert_eq!(parsed.classifications.len(), 1);
        assert_eq!(parsed.incomplete.len(), 1);
        assert!(parsed.incomplete[0].contains("note"));
        Ok(())
    }

    #[test]
    fn empty_list_has_no_destinations() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(parse_destinations("[]")?, ParsedDestinations::default());
        Ok(())
    }

    #[test]
    fn malformed_replies_are_parse_failures() {
        for raw in [
            "Sure! The destinations are London and Paris.",
            "[{\"city\": \"Rome\"",
            "\"Rome\"",
            "[\"Rome\"]",
            "[{\"city\": 42}]",
            "{\"destinations\": \"Rome\"}",
        ] {
            let result = parse_destinations(raw);
            assert!(
                matches!(result, Err(OrganizeError::Parse { .. })),
                "expected parse failure for {raw:?}"
            );
        }
    }

    #[test]
    fn parse_failure_keeps_raw_reply() {
        match parse_destinations("not json") {
            Err(OrganizeError::Parse { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn prompt_names_document_and_truncates_text() {
        let prompt = build_prompt(&document("abcdefghij\u{0}klm"), 5);
        assert!(prompt.contains("'trip.pdf'"));
        assert!(prompt.contains("---\nabcde\n---"));
        assert!(!prompt.contains("fgh"));
        assert!(prompt.contains("South America"));
    }

    #[test]
    fn prepare_text_respects_char_boundaries() {
        assert_eq!(prepare_text("São Paulo", 2), "Sã");
        assert_eq!(prepare_text("a\u{7}b\nc", 10), "ab\nc");
    }

    #[test]
    fn gemini_payload_text_is_concatenated() -> Result<(), Box<dyn std::error::Error>> {
        let payload: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "[{\"city\":"}, {"text": " \"Oslo\"}]"}]}, "finishReason": "STOP"}]}"#,
        )?;
        assert_eq!(response_text(payload)?, "[{\"city\": \"Oslo\"}]");
        Ok(())
    }

    #[test]
    fn gemini_payload_without_text_is_a_transport_failure() -> Result<(), Box<dyn std::error::Error>> {
        let payload: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)?;
        match response_text(payload) {
            Err(OrganizeError::Transport(reason)) => assert!(reason.contains("SAFETY")),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn endpoint_is_built_from_config() -> Result<(), Box<dyn std::error::Error>> {
        let config = OrganizerConfig {
            api_key: "key".to_string(),
            api_base_url: "http://localhost:8080/".to_string(),
            ..OrganizerConfig::default()
        };
        let client = GeminiClient::new(&config)?;
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
        Ok(())
    }
}
