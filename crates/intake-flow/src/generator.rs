use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use intake_core::config::{secret_from_env, LlmSettings};
use intake_core::error::Error;
use intake_core::traits::Generator;

/// OpenAI-compatible chat completions client. `temperature` is only sent
/// when configured.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        tracing::info!(endpoint = %endpoint, model = %settings.model, "creating chat generator");
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    fn request_body(&self, system: &str, user: &str, json_mode: bool) -> Value {
        let mut request = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        if let Some(temperature) = self.temperature {
            request["temperature"] = json!(temperature);
        }
        if json_mode {
            request["response_format"] = json!({"type": "json_object"});
        }
        request
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        let request = self.request_body(system, user, json_mode);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request to {} timed out", self.endpoint)
                } else {
                    format!("request to {} failed: {e}", self.endpoint)
                };
                anyhow::Error::from(Error::Generation(reason))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(endpoint = %self.endpoint, status = %status, "generation API returned error");
            return Err(Error::Generation(format!("API error ({status}): {body}")).into());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("unreadable response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}

pub fn build_generator(settings: &LlmSettings) -> Result<Arc<dyn Generator>> {
    let api_key = secret_from_env(&settings.api_key_env)?;
    Ok(Arc::new(OpenAiGenerator::new(settings, api_key)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(temperature: Option<f32>) -> OpenAiGenerator {
        let settings = LlmSettings { temperature, ..LlmSettings::default() };
        OpenAiGenerator::new(&settings, "test-key".to_string()).unwrap()
    }

    #[test]
    fn default_settings_leave_temperature_to_the_model() {
        let body = generator(None).request_body("sys", "user", true);
        assert!(body.get("temperature").is_none());
        assert_eq!(body["model"], "gpt-5-nano");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn configured_temperature_is_sent() {
        let body = generator(Some(0.0)).request_body("sys", "user", false);
        assert_eq!(body["temperature"], json!(0.0));
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_a_generation_error() {
        let settings = LlmSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmSettings::default()
        };
        let gen = OpenAiGenerator::new(&settings, "test-key".to_string()).unwrap();
        let err = gen.generate("sys", "user", true).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Generation(_))));
    }
}
