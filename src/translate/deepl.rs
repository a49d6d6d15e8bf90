//! DeepL REST provider.
//!
//! DeepL is the quota-aware provider: besides [`translate`], it exposes the
//! account usage endpoint the orchestrator consults before starting a batch
//! (the free tier has a hard monthly character limit).
//!
//! [`translate`]: DeepLTranslator::translate

use crate::utils::truncate_for_log;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub struct DeepLTranslator {
    api_key: String,
    api_url: String,
    usage_url: String,
    client: reqwest::Client,
}

impl DeepLTranslator {
    pub fn new(api_key: String, api_url: String, usage_url: String) -> Self {
        Self {
            api_key,
            api_url,
            usage_url,
            client: reqwest::Client::new(),
        }
    }

    /// Translate `text` into `target_language`.
    ///
    /// Returns `None` on any transport or parse failure; errors never
    /// propagate to the caller, which is what lets the orchestrator fall
    /// back to another provider.
    #[instrument(level = "info", skip_all)]
    pub async fn translate(&self, text: &str, target_language: &str) -> Option<String> {
        let params = [
            ("auth_key", self.api_key.as_str()),
            ("text", text),
            ("target_lang", target_language),
        ];
        let response = self
            .client
            .post(&self.api_url)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "DeepL request failed");
                return None;
            }
        };
        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "DeepL returned unparsable body");
                return None;
            }
        };

        let translated = body
            .pointer("/translations/0/text")
            .and_then(Value::as_str)
            .map(str::to_string);
        if translated.is_none() {
            warn!(
                body = %truncate_for_log(&body.to_string(), 300),
                "DeepL response missing translation text"
            );
        }
        translated
    }

    /// Fetch account usage as `(character_count, character_limit)`.
    ///
    /// `None` means usage could not be determined, which the orchestrator
    /// treats as a reason to abort the batch rather than risk blowing
    /// through the quota.
    #[instrument(level = "info", skip_all)]
    pub async fn usage(&self) -> Option<(u64, u64)> {
        let response = self
            .client
            .get(&self.usage_url)
            .query(&[("auth_key", self.api_key.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let body: Value = match response {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "DeepL usage response unparsable");
                    return None;
                }
            },
            Err(e) => {
                warn!(error = %e, "DeepL usage request failed");
                return None;
            }
        };

        let used = body.get("character_count").and_then(Value::as_u64)?;
        let limit = body.get("character_limit").and_then(Value::as_u64)?;
        info!(used, limit, remaining = limit.saturating_sub(used), "Fetched DeepL account usage");
        Some((used, limit))
    }
}
