//! Translation pipeline with provider fallback and speaker-label masking.
//!
//! The orchestrator walks an explicit, ordered list of providers (the
//! preferred one first) and takes the first non-empty result; if every
//! provider fails it hands back the original text. Around every provider
//! call, speaker attributions like `"JOHN SMITH:"` are swapped for indexed
//! placeholder tokens so a translation engine can't mangle them, and
//! restored afterwards. The placeholder format never appears in natural
//! prose, making protect/restore an exact round trip.

mod azure;
mod deepl;

pub use azure::AzureTranslator;
pub use deepl::DeepLTranslator;

use crate::config::TranslatorConfig;
use crate::models::NewsRecord;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Speaker labels: an optional leading newline, a run of uppercase letters
/// and whitespace, then a colon.
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n)?([A-Z\s]+):").unwrap());

/// Which provider the configuration prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepL,
    Azure,
}

impl FromStr for ProviderKind {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEEPL" => Ok(Self::DeepL),
            // The original configuration surface called Azure "MICROSOFT".
            "MICROSOFT" | "AZURE" => Ok(Self::Azure),
            other => Err(format!("unknown translation provider: {other}").into()),
        }
    }
}

/// A registered translation backend.
///
/// Closed enum rather than a trait object: the provider set is small and
/// known, and the fallback order must be an explicit list instead of
/// whatever a map happens to iterate.
pub enum Provider {
    DeepL(DeepLTranslator),
    Azure(AzureTranslator),
    #[cfg(test)]
    Fixed {
        name: &'static str,
        response: Option<String>,
    },
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeepL(_) => "deepl",
            Self::Azure(_) => "azure",
            #[cfg(test)]
            Self::Fixed { name, .. } => name,
        }
    }

    fn kind(&self) -> Option<ProviderKind> {
        match self {
            Self::DeepL(_) => Some(ProviderKind::DeepL),
            Self::Azure(_) => Some(ProviderKind::Azure),
            #[cfg(test)]
            Self::Fixed { .. } => None,
        }
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Option<String> {
        match self {
            Self::DeepL(t) => t.translate(text, target_language).await,
            Self::Azure(t) => t.translate(text, target_language).await,
            #[cfg(test)]
            Self::Fixed { response, .. } => {
                let _ = (text, target_language);
                response.clone()
            }
        }
    }
}

/// Replace each speaker label with an indexed placeholder token, returning
/// the protected text and the labels in placeholder order.
pub fn protect_names(text: &str) -> (String, Vec<String>) {
    let mut names = Vec::new();
    let protected = NAME_RE.replace_all(text, |caps: &Captures| {
        let newline = caps.get(1).map_or("", |m| m.as_str());
        let placeholder = format!("NAMEPLACEHOLDER_{}_END", names.len());
        names.push(caps[2].to_string());
        format!("{newline}{placeholder}:")
    });
    (protected.into_owned(), names)
}

/// Swap placeholder tokens back for the recorded labels, by index.
pub fn restore_names(text: &str, names: &[String]) -> String {
    let mut restored = text.to_string();
    for (i, name) in names.iter().enumerate() {
        let placeholder = format!("NAMEPLACEHOLDER_{i}_END");
        restored = restored.replace(&placeholder, name);
    }
    restored
}

/// Order providers so the preferred one is attempted first, keeping
/// registration order among the rest.
fn order_providers(providers: Vec<Provider>, preferred: ProviderKind) -> Vec<Provider> {
    let (mut front, back): (Vec<Provider>, Vec<Provider>) =
        providers.into_iter().partition(|p| p.kind() == Some(preferred));
    front.extend(back);
    front
}

pub struct NewsTranslator {
    providers: Vec<Provider>,
    target_language: String,
    test_mode: bool,
    input_file: PathBuf,
    output_file: PathBuf,
}

impl NewsTranslator {
    pub fn new(
        providers: Vec<Provider>,
        preferred: ProviderKind,
        target_language: String,
        test_mode: bool,
        input_file: PathBuf,
        output_file: PathBuf,
    ) -> Self {
        Self {
            providers: order_providers(providers, preferred),
            target_language,
            test_mode,
            input_file,
            output_file,
        }
    }

    /// Build the translator with both real backends registered, ordered by
    /// the configured preference.
    pub fn from_config(config: TranslatorConfig) -> Self {
        let providers = vec![
            Provider::DeepL(DeepLTranslator::new(
                config.deepl_api_key,
                config.deepl_api_url,
                config.deepl_usage_url,
            )),
            Provider::Azure(AzureTranslator::new(
                config.azure_subscription_key,
                config.azure_endpoint_url,
                config.azure_translator_region,
            )),
        ];
        Self::new(
            providers,
            config.preferred_api,
            config.target_language,
            config.test_mode,
            config.cleaned_data_file,
            config.translated_data_file,
        )
    }

    /// Translate one text field. Never fails: total provider failure
    /// degrades to the original text, logged as a warning.
    pub async fn translate_text(&self, text: &str) -> String {
        let (protected, names) = protect_names(text);

        let mut translated: Option<String> = None;
        for provider in &self.providers {
            match provider.translate(&protected, &self.target_language).await {
                Some(t) if !t.is_empty() => {
                    translated = Some(t);
                    break;
                }
                _ => warn!(provider = provider.name(), "Provider returned no translation"),
            }
        }

        let output = translated.unwrap_or_else(|| {
            warn!("All translation providers failed; keeping original text");
            protected.clone()
        });
        restore_names(&output, &names)
    }

    /// Translate the whole cleaned data set.
    ///
    /// When DeepL is the preferred provider, its usage is checked once up
    /// front; a reached limit (or unknown usage) aborts the run before any
    /// record is modified. In test mode only `summary` is translated,
    /// leaving the much larger `content` untouched.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        println!("Starting the translation process...");

        let text = fs::read_to_string(&self.input_file).await.map_err(|e| {
            format!("failed to read input file {}: {e}", self.input_file.display())
        })?;
        let mut records: Vec<NewsRecord> = serde_json::from_str(&text)
            .map_err(|e| format!("malformed JSON in {}: {e}", self.input_file.display()))?;

        if let Some(Provider::DeepL(deepl)) = self.providers.first() {
            let (used, limit) = deepl
                .usage()
                .await
                .ok_or("could not fetch DeepL account usage")?;
            if used >= limit {
                return Err(format!(
                    "DeepL monthly character limit reached ({used}/{limit})"
                )
                .into());
            }
            println!("DeepL account usage OK. Remaining characters: {}", limit - used);
        }

        let total = records.len();
        for (idx, record) in records.iter_mut().enumerate() {
            info!(index = idx, total, "Translating record");
            record.summary = self.translate_text(&record.summary).await;
            if !self.test_mode {
                record.content = self.translate_text(&record.content).await;
            }
        }

        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&self.output_file, json).await?;
        info!(path = %self.output_file.display(), count = total, "Wrote translated records");
        println!("Translation completed!");
        Ok(())
    }
}
