//! Client of a Gemini-compatible `generateContent` endpoint.

use engine::{Advisor, AdvisoryError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone, Debug)]
pub struct GeminiAdvisor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl GeminiAdvisor {
    pub fn new(client: Client, endpoint: String, model: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            model,
            api_key,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Advisor for GeminiAdvisor {
    async fn generate(&self, prompt: String) -> Result<String, AdvisoryError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };
        let resp = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| AdvisoryError::Unavailable(err.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, "advisor request failed: {body}");
            return Err(AdvisoryError::Unavailable(format!("HTTP {status}")));
        }

        let answer: GenerateResponse = resp
            .json()
            .await
            .map_err(|err| AdvisoryError::Unparseable(err.to_string()))?;
        answer
            .into_text()
            .ok_or_else(|| AdvisoryError::Unparseable("no text in the answer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_and_model() {
        let advisor = GeminiAdvisor::new(
            Client::new(),
            format!("{DEFAULT_ENDPOINT}/"),
            "m1".to_string(),
            "k".to_string(),
        );
        assert_eq!(
            advisor.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/m1:generateContent"
        );
    }

    #[test]
    fn answer_text_is_first_part_of_first_candidate() {
        let answer: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":1}"},{"text":"x"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(answer.into_text().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn blocked_answer_has_no_text() {
        let answer: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(answer.into_text(), None);
        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_text(), None);
    }
}
