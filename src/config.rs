//! Application configuration loaded from an environment file.
//!
//! All settings live in a `config.env` file (or the process environment)
//! and are read once at startup. [`AppConfig`] keeps everything optional;
//! each pipeline stage asks for its own typed view and only the keys that
//! stage actually uses are validated, so a machine that only runs the
//! cleaner never needs translation credentials.

use crate::models::DEFAULT_MISSING_FIELD_CHECK;
use crate::translate::ProviderKind;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, warn};

const DEFAULT_ARCHIVE_URL: &str = "https://www.npr.org/programs/morning-edition/archive";

/// Raw configuration surface, one field per `config.env` key.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news_directory: PathBuf,
    pub mp3_directory: PathBuf,
    pub cleaned_data_file: PathBuf,
    pub translated_data_file: PathBuf,
    pub wordcloud_file: PathBuf,
    pub side_file_directory: PathBuf,
    pub site_directory: PathBuf,
    pub archive_url: String,
    pub news_count_default: usize,
    pub missing_field_check: Vec<String>,
    pub audio_field_name: String,
    pub target_language: Option<String>,
    pub preferred_api: Option<String>,
    pub test_mode: bool,
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: Option<String>,
    pub deepl_usage_url: Option<String>,
    pub azure_subscription_key: Option<String>,
    pub azure_endpoint_url: Option<String>,
    pub azure_translator_region: Option<String>,
    pub wp_api_url: Option<String>,
    pub wp_username: Option<String>,
    pub wp_app_password: Option<String>,
    pub wp_page_id: Option<String>,
    pub site_base_url: Option<String>,
}

/// Settings consumed by the scrape stage.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub archive_url: String,
    pub news_count: usize,
    pub news_directory: PathBuf,
    pub mp3_directory: PathBuf,
}

/// Settings consumed by the clean stage.
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    pub news_directory: PathBuf,
    pub mp3_directory: PathBuf,
    pub cleaned_data_file: PathBuf,
    pub wordcloud_file: PathBuf,
    /// Where the incomplete/duplicate side files are written.
    pub side_file_directory: PathBuf,
    pub missing_field_check: Vec<String>,
    pub audio_field_name: String,
}

/// Settings consumed by the translate stage.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub deepl_api_key: String,
    pub deepl_api_url: String,
    pub deepl_usage_url: String,
    pub azure_subscription_key: String,
    pub azure_endpoint_url: String,
    pub azure_translator_region: String,
    pub preferred_api: ProviderKind,
    pub target_language: String,
    pub test_mode: bool,
    pub cleaned_data_file: PathBuf,
    pub translated_data_file: PathBuf,
}

/// Settings consumed by the publish stage.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub wp_api_url: String,
    pub wp_username: String,
    pub wp_app_password: String,
    pub wp_page_id: String,
    pub site_base_url: String,
    pub translated_data_file: PathBuf,
    pub site_directory: PathBuf,
    pub test_mode: bool,
}

impl AppConfig {
    /// Load configuration from the given env file, falling back to
    /// `config.env` in the working directory and then to the process
    /// environment.
    ///
    /// An explicitly named file that can't be read is a fatal error; a
    /// missing default `config.env` is not, since everything may already
    /// be in the environment.
    pub fn load(env_file: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .map_err(|e| format!("failed to read config file {path}: {e}"))?;
                debug!(path, "Loaded environment file");
            }
            None => {
                if dotenvy::from_filename("config.env").is_err() {
                    warn!("No config.env found; using process environment only");
                }
            }
        }
        Ok(Self::from_env())
    }

    fn from_env() -> Self {
        Self {
            news_directory: path_var("NEWS_DIRECTORY", "news"),
            mp3_directory: path_var("MP3_DIRECTORY", "mp3"),
            cleaned_data_file: path_var("CLEANED_DATA_FILE", "cleaned_data.json"),
            translated_data_file: path_var("TRANSLATED_DATA_FILE", "translated_data.json"),
            wordcloud_file: path_var("WORDCLOUD_FILE", "wordcloud.png"),
            side_file_directory: path_var("SIDE_FILE_DIRECTORY", "."),
            site_directory: path_var("SITE_DIRECTORY", "english"),
            archive_url: env_var("ARCHIVE_URL").unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_string()),
            news_count_default: env_var("NEWS_COUNT_DEFAULT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            missing_field_check: env_var("MISSING_FIELD_CHECK")
                .map(|v| {
                    v.split(',')
                        .map(|f| f.trim().to_string())
                        .filter(|f| !f.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| {
                    DEFAULT_MISSING_FIELD_CHECK.iter().map(|f| f.to_string()).collect()
                }),
            audio_field_name: env_var("AUDIO_FIELD_NAME")
                .unwrap_or_else(|| "audio_link".to_string()),
            target_language: env_var("TARGET_LANGUAGE"),
            preferred_api: env_var("PREFERRED_TRANSLATION_API"),
            test_mode: env_var("TEST_MODE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            deepl_api_key: env_var("DEEPL_API_KEY"),
            deepl_api_url: env_var("DEEPL_API_URL"),
            deepl_usage_url: env_var("DEEPL_USAGE_URL"),
            azure_subscription_key: env_var("AZURE_SUBSCRIPTION_KEY"),
            azure_endpoint_url: env_var("AZURE_ENDPOINT_URL"),
            azure_translator_region: env_var("AZURE_TRANSLATOR_REGION"),
            wp_api_url: env_var("WP_API_URL"),
            wp_username: env_var("WP_USERNAME"),
            wp_app_password: env_var("WP_APP_PASSWORD"),
            wp_page_id: env_var("WP_PAGE_ID"),
            site_base_url: env_var("SITE_BASE_URL"),
        }
    }

    pub fn scraper(&self) -> ScraperConfig {
        ScraperConfig {
            archive_url: self.archive_url.clone(),
            news_count: self.news_count_default,
            news_directory: self.news_directory.clone(),
            mp3_directory: self.mp3_directory.clone(),
        }
    }

    pub fn cleaner(&self) -> CleanerConfig {
        CleanerConfig {
            news_directory: self.news_directory.clone(),
            mp3_directory: self.mp3_directory.clone(),
            cleaned_data_file: self.cleaned_data_file.clone(),
            wordcloud_file: self.wordcloud_file.clone(),
            side_file_directory: self.side_file_directory.clone(),
            missing_field_check: self.missing_field_check.clone(),
            audio_field_name: self.audio_field_name.clone(),
        }
    }

    pub fn translator(&self) -> Result<TranslatorConfig, Box<dyn Error>> {
        let preferred_api = require(&self.preferred_api, "PREFERRED_TRANSLATION_API")?
            .parse::<ProviderKind>()?;
        Ok(TranslatorConfig {
            deepl_api_key: require(&self.deepl_api_key, "DEEPL_API_KEY")?,
            deepl_api_url: require(&self.deepl_api_url, "DEEPL_API_URL")?,
            deepl_usage_url: require(&self.deepl_usage_url, "DEEPL_USAGE_URL")?,
            azure_subscription_key: require(&self.azure_subscription_key, "AZURE_SUBSCRIPTION_KEY")?,
            azure_endpoint_url: require(&self.azure_endpoint_url, "AZURE_ENDPOINT_URL")?,
            azure_translator_region: require(
                &self.azure_translator_region,
                "AZURE_TRANSLATOR_REGION",
            )?,
            preferred_api,
            target_language: require(&self.target_language, "TARGET_LANGUAGE")?,
            test_mode: self.test_mode,
            cleaned_data_file: self.cleaned_data_file.clone(),
            translated_data_file: self.translated_data_file.clone(),
        })
    }

    pub fn publisher(&self) -> Result<PublisherConfig, Box<dyn Error>> {
        Ok(PublisherConfig {
            wp_api_url: require(&self.wp_api_url, "WP_API_URL")?,
            wp_username: require(&self.wp_username, "WP_USERNAME")?,
            wp_app_password: require(&self.wp_app_password, "WP_APP_PASSWORD")?,
            wp_page_id: require(&self.wp_page_id, "WP_PAGE_ID")?,
            site_base_url: require(&self.site_base_url, "SITE_BASE_URL")?,
            translated_data_file: self.translated_data_file.clone(),
            site_directory: self.site_directory.clone(),
            test_mode: self.test_mode,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn path_var(key: &str, default: &str) -> PathBuf {
    env_var(key).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
}

fn require(value: &Option<String>, key: &str) -> Result<String, Box<dyn Error>> {
    value
        .clone()
        .ok_or_else(|| format!("missing configuration key {key}").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_key_name() {
        let err = require(&None, "DEEPL_API_KEY").unwrap_err();
        assert!(err.to_string().contains("DEEPL_API_KEY"));
        assert_eq!(require(&Some("k".into()), "DEEPL_API_KEY").unwrap(), "k");
    }

    #[test]
    fn test_default_missing_field_check() {
        // Built without env overrides the check set matches the documented
        // default, which omits formatted_date.
        let fields: Vec<String> =
            DEFAULT_MISSING_FIELD_CHECK.iter().map(|f| f.to_string()).collect();
        assert_eq!(fields, vec!["date", "summary", "content", "audio_link"]);
    }
}
