//! Azure Translator REST provider.
//!
//! Cognitive Services text translation, API version 3.0. The request body
//! is a JSON array of `{"text": ...}` objects and the response mirrors
//! that shape, so the translated string lives at
//! `[0].translations[0].text`.

use crate::utils::truncate_for_log;
use serde_json::{Value, json};
use tracing::{instrument, warn};
use uuid::Uuid;

pub struct AzureTranslator {
    subscription_key: String,
    endpoint: String,
    region: String,
    client: reqwest::Client,
}

impl AzureTranslator {
    pub fn new(subscription_key: String, endpoint: String, region: String) -> Self {
        Self {
            subscription_key,
            endpoint,
            region,
            client: reqwest::Client::new(),
        }
    }

    /// Translate `text` into `target_language`, returning `None` on any
    /// transport or parse failure.
    #[instrument(level = "info", skip_all)]
    pub async fn translate(&self, text: &str, target_language: &str) -> Option<String> {
        let url = format!(
            "{}/translate?api-version=3.0&to={}",
            self.endpoint.trim_end_matches('/'),
            target_language
        );
        let body = json!([{ "text": text }]);

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .header("X-ClientTraceId", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Azure request failed");
                return None;
            }
        };
        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Azure returned unparsable body");
                return None;
            }
        };

        let translated = payload
            .pointer("/0/translations/0/text")
            .and_then(Value::as_str)
            .map(str::to_string);
        if translated.is_none() {
            // Error bodies come back as {"error": {"code": ..., "message": ...}}.
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            warn!(
                message,
                body = %truncate_for_log(&payload.to_string(), 300),
                "Azure response missing translation text"
            );
        }
        translated
    }
}
