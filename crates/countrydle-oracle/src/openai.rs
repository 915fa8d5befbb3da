//! [`OpenAiClient`]: a [`LanguageModel`] over an OpenAI-compatible HTTP API.
//!
//! Completions use `POST {base_url}/chat/completions` with
//! `response_format: {"type": "json_object"}`; embeddings use
//! `POST {base_url}/embeddings`.

use std::time::Duration;

use countrydle_core::oracle::{InferenceError, LanguageModel};
use serde::Deserialize;
use serde_json::{Value, json};

/// Connection settings for the inference endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
  pub base_url:        String,
  pub api_key:         Option<String>,
  pub quiz_model:      String,
  pub embedding_model: String,
  pub timeout_secs:    u64,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      base_url:        "https://api.openai.com/v1".into(),
      api_key:         None,
      quiz_model:      "gpt-4o-mini".into(),
      embedding_model: "text-embedding-3-small".into(),
      timeout_secs:    30,
    }
  }
}

/// Error bodies are cut to this many characters before logging.
const MAX_ERROR_BODY: usize = 300;

pub struct OpenAiClient {
  config: LlmConfig,
  http:   reqwest::Client,
}

impl OpenAiClient {
  pub fn new(config: LlmConfig) -> Result<Self, InferenceError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| InferenceError::Unavailable(format!("building HTTP client: {e}")))?;
    Ok(Self { config, http })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
  }

  fn transport_error(&self, e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
      InferenceError::Timeout(self.config.timeout_secs)
    } else {
      InferenceError::Unavailable(e.to_string())
    }
  }

  async fn post(&self, path: &str, body: &Value) -> Result<Value, InferenceError> {
    let mut request = self.http.post(self.url(path)).json(body);
    if let Some(key) = &self.config.api_key {
      request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| self.transport_error(e))?;
    let status = response.status();
    if !status.is_success() {
      let message: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();
      return Err(InferenceError::Status { code: status.as_u16(), message });
    }

    response.json().await.map_err(|e| {
      if e.is_timeout() {
        InferenceError::Timeout(self.config.timeout_secs)
      } else {
        InferenceError::Malformed(format!("response body is not JSON: {e}"))
      }
    })
  }
}

impl LanguageModel for OpenAiClient {
  async fn complete_json<'a>(
    &'a self,
    system: &'a str,
    user: &'a str,
  ) -> Result<Value, InferenceError> {
    let body = json!({
      "model": self.config.quiz_model,
      "messages": [
        {"role": "system", "content": system},
        {"role": "user", "content": user},
      ],
      "response_format": {"type": "json_object"},
    });
    let response = self.post("chat/completions", &body).await?;
    chat_content(&response)
  }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, InferenceError> {
    let body = json!({
      "model": self.config.embedding_model,
      "input": text,
    });
    let response = self.post("embeddings", &body).await?;
    embedding_vector(&response)
  }
}

/// The JSON object carried in the first choice's message content.
fn chat_content(response: &Value) -> Result<Value, InferenceError> {
  let text = response
    .pointer("/choices/0/message/content")
    .and_then(Value::as_str)
    .ok_or_else(|| InferenceError::Malformed("completion has no message content".into()))?;

  let value: Value = serde_json::from_str(text)
    .map_err(|e| InferenceError::Malformed(format!("model output is not JSON: {e}")))?;
  if !value.is_object() {
    return Err(InferenceError::Malformed(format!("model output is not an object: {value}")));
  }
  Ok(value)
}

fn embedding_vector(response: &Value) -> Result<Vec<f32>, InferenceError> {
  let values = response
    .pointer("/data/0/embedding")
    .and_then(Value::as_array)
    .ok_or_else(|| InferenceError::Malformed("embedding response has no vector".into()))?;

  values
    .iter()
    .map(|v| {
      v.as_f64()
        .map(|x| x as f32)
        .ok_or_else(|| InferenceError::Malformed(format!("non-numeric embedding value {v}")))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_json_from_message_content() {
    let response = json!({
      "choices": [{"message": {"role": "assistant", "content": "{\"answer\": true}"}}]
    });
    assert_eq!(chat_content(&response).unwrap(), json!({"answer": true}));
  }

  #[test]
  fn prose_content_is_malformed() {
    for content in ["Sure! The answer is true.", "[1, 2]"] {
      let response = json!({"choices": [{"message": {"content": content}}]});
      assert!(matches!(chat_content(&response), Err(InferenceError::Malformed(_))));
    }
    assert!(chat_content(&json!({"choices": []})).is_err());
  }

  #[test]
  fn extracts_embedding() {
    let response = json!({"data": [{"embedding": [0.5, -0.25, 1]}]});
    assert_eq!(embedding_vector(&response).unwrap(), vec![0.5, -0.25, 1.0]);
    assert!(embedding_vector(&json!({"data": [{"embedding": ["x"]}]})).is_err());
  }

  #[test]
  fn base_url_trailing_slash_is_ignored() {
    let client = OpenAiClient::new(LlmConfig {
      base_url: "http://localhost:8000/v1/".into(),
      ..LlmConfig::default()
    })
    .unwrap();
    assert_eq!(client.url("embeddings"), "http://localhost:8000/v1/embeddings");
  }
}
