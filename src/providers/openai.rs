//! OpenAI-compatible chat completion provider

use super::traits::*;
use crate::config::GenerationSettings;
use crate::error::{InsightError, Result};
use serde::Deserialize;

/// Chat completions adapter for OpenAI and API-compatible servers
pub struct OpenAi {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = GenerationSettings::default();
        Self {
            base_url: defaults.base_url,
            api_key: api_key.into(),
            model: model.into(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl GenerationProvider for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    fn request(&self, params: &GenerationParams) -> Result<ProviderRequest> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": params.system_instructions},
                {"role": "user", "content": params.user_prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        Ok(
            ProviderRequest::post(format!("{}/chat/completions", self.base_url))
                .bearer(&self.api_key)
                .header("Content-Type", "application/json")
                .json(body),
        )
    }

    fn response(&self, response: ProviderResponse) -> Result<String> {
        let parsed: ChatResponse = response.json(self.name())?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| InsightError::Decode {
                provider: self.name().to_string(),
                message: "completion contained no text".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &str) -> ProviderResponse {
        ProviderResponse {
            status: 200,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_openai_request() {
        let openai = OpenAi::new("sk-test", "gpt-4o-mini");
        let params = GenerationParams {
            system_instructions: "be brief".to_string(),
            user_prompt: "summarize".to_string(),
        };
        let request = openai.request(&params).unwrap();

        assert!(request.url.ends_with("/chat/completions"));
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer sk-test")
        );
        match request.data {
            Some(RequestBody::Json(json)) => {
                assert_eq!(json["model"], "gpt-4o-mini");
                assert_eq!(json["messages"][0]["role"], "system");
                assert_eq!(json["messages"][1]["content"], "summarize");
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_openai_response() {
        let openai = OpenAi::new("k", "m");
        let text = openai
            .response(body(
                r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"  Hello  "}}]}"#,
            ))
            .unwrap();
        assert_eq!(text, "Hello");
    }

    #[test]
    fn test_openai_empty_completion_is_error() {
        let openai = OpenAi::new("k", "m");
        assert!(openai.response(body(r#"{"choices":[]}"#)).is_err());
        assert!(openai
            .response(body(r#"{"choices":[{"message":{"content":null}}]}"#))
            .is_err());
    }
}
