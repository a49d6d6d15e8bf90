//! Cleaning pipeline for scraped news records.
//!
//! Reads the most recent monthly archive file, then runs a fixed sequence
//! of passes:
//!
//! 1. **Dedup** on the `audio_link` identity key (first occurrence wins).
//! 2. **Text normalization**: best-effort unescape of `summary`/`content`.
//! 3. **Completeness filter**: every required field non-empty.
//! 4. **Date validation**: `formatted_date` must parse as `YYYYMMDD`;
//!    failures silently drop out of the cleaned set.
//! 5. **Missing-field annotation**: a final, independent re-check against a
//!    configurable field set, where an MP3 already on disk can stand in for
//!    the audio field.
//!
//! The passes partition the input into three disjoint sets, written to
//! three files: the cleaned output, plus `incomplete_data.json` and
//! `duplicate_data.json` in the side-file directory (the working directory
//! by default). Records with no identity key belong to none of
//! them; they are dropped with a warning.

use crate::config::CleanerConfig;
use crate::models::{NewsRecord, REQUIRED_FIELDS};
use crate::utils::{latest_monthly_file, unescape_literal};
use crate::wordcloud;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// The disjoint outcome of the dedup + completeness passes.
#[derive(Debug, Default)]
pub struct Partitions {
    pub cleaned: Vec<NewsRecord>,
    pub incomplete: Vec<NewsRecord>,
    pub duplicates: Vec<NewsRecord>,
    /// Records dropped for having no identity key; not tracked as a
    /// partition, only counted.
    pub dropped_no_key: usize,
}

pub struct DataCleaner {
    config: CleanerConfig,
}

impl DataCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Run the full cleaning pass over the latest monthly archive.
    ///
    /// A missing or empty input directory/file aborts the run with no
    /// partial output written. Per-record problems never abort; they route
    /// the record to a side partition or drop it with a warning.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        println!("Starting data cleaning process...");

        let input_file = latest_monthly_file(&self.config.news_directory)
            .map_err(|e| {
                format!(
                    "news directory {} not readable: {e}",
                    self.config.news_directory.display()
                )
            })?
            .ok_or_else(|| {
                format!(
                    "no monthly JSON files found in {}",
                    self.config.news_directory.display()
                )
            })?;
        info!(input_file = %input_file.display(), "Selected latest monthly archive");

        let raw = load_records(&input_file).await?;
        info!(count = raw.len(), "Loaded raw records");

        let mut partitions = partition_records(raw);
        info!(
            cleaned = partitions.cleaned.len(),
            incomplete = partitions.incomplete.len(),
            duplicates = partitions.duplicates.len(),
            dropped_no_key = partitions.dropped_no_key,
            "Partitioned records"
        );

        partitions.cleaned = validate_dates(partitions.cleaned);
        info!(count = partitions.cleaned.len(), "Records after date validation");

        annotate_missing_fields(
            &mut partitions.cleaned,
            &self.config.missing_field_check,
            &self.config.audio_field_name,
            &self.config.mp3_directory,
        );

        save_records(&partitions.cleaned, &self.config.cleaned_data_file).await?;
        save_records(
            &partitions.incomplete,
            &self.config.side_file_directory.join("incomplete_data.json"),
        )
        .await?;
        save_records(
            &partitions.duplicates,
            &self.config.side_file_directory.join("duplicate_data.json"),
        )
        .await?;

        println!("Data cleaning completed. {} items cleaned.", partitions.cleaned.len());
        println!("{} incomplete items found.", partitions.incomplete.len());
        println!("{} duplicate items found.", partitions.duplicates.len());

        if let Err(e) = wordcloud::generate(&partitions.cleaned, &self.config.wordcloud_file) {
            warn!(error = %e, "Failed to generate word-frequency image");
        }

        println!("Data cleaning process completed.");
        Ok(())
    }
}

/// Load a JSON array of records. An unreadable, empty, or malformed file is
/// fatal for the stage.
async fn load_records(path: &Path) -> Result<Vec<NewsRecord>, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| format!("failed to read input file {}: {e}", path.display()))?;
    if text.trim().is_empty() {
        return Err(format!("input file {} is empty", path.display()).into());
    }
    let records: Vec<NewsRecord> = serde_json::from_str(&text)
        .map_err(|e| format!("malformed JSON in {}: {e}", path.display()))?;
    if records.is_empty() {
        return Err(format!("input file {} contains no records", path.display()).into());
    }
    Ok(records)
}

async fn save_records(records: &[NewsRecord], path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), count = records.len(), "Wrote records");
    Ok(())
}

/// Run dedup, text normalization, and the completeness filter, in that
/// order. Dedup must run first so each identity is judged for completeness
/// exactly once.
pub fn partition_records(raw: Vec<NewsRecord>) -> Partitions {
    let mut partitions = Partitions::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();

    for record in raw {
        if record.audio_link.is_empty() {
            warn!(date = %record.date, "Record without audio_link; dropping");
            partitions.dropped_no_key += 1;
        } else if seen.contains(&record.audio_link) {
            warn!(audio_link = %record.audio_link, "Duplicate record");
            partitions.duplicates.push(record);
        } else {
            seen.insert(record.audio_link.clone());
            unique.push(record);
        }
    }

    for mut record in unique {
        record.summary = unescape_literal(&record.summary);
        record.content = unescape_literal(&record.content);

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| !record.has_field(f))
            .map(|f| f.to_string())
            .collect();
        if missing.is_empty() {
            partitions.cleaned.push(record);
        } else {
            warn!(
                audio_link = %record.audio_link,
                missing = ?missing,
                "Incomplete record"
            );
            record.missing_fields = Some(missing);
            partitions.incomplete.push(record);
        }
    }

    partitions
}

/// Keep only records whose `formatted_date` parses as `YYYYMMDD`.
///
/// Failures are logged but not routed anywhere; invalid-date records simply
/// vanish from the cleaned output. This asymmetry with the incomplete
/// partition is intentional.
pub fn validate_dates(records: Vec<NewsRecord>) -> Vec<NewsRecord> {
    records
        .into_iter()
        .filter(|record| {
            let valid =
                chrono::NaiveDate::parse_from_str(&record.formatted_date, "%Y%m%d").is_ok();
            if !valid {
                warn!(
                    audio_link = %record.audio_link,
                    formatted_date = %record.formatted_date,
                    "Invalid date format; excluding record"
                );
            }
            valid
        })
        .collect()
}

/// Final annotation pass over the already-cleaned set.
///
/// Re-checks presence of the configured field set, independent of the
/// completeness filter. An MP3 file named `{formatted_date}.mp3` on disk
/// satisfies the configured audio field even when the record itself lacks
/// it. Records still missing something get a `missing_fields` annotation.
pub fn annotate_missing_fields(
    records: &mut [NewsRecord],
    check_fields: &[String],
    audio_field_name: &str,
    mp3_directory: &Path,
) {
    for (idx, record) in records.iter_mut().enumerate() {
        let mut missing: Vec<String> = check_fields
            .iter()
            .filter(|f| !record.has_field(f))
            .cloned()
            .collect();

        let mp3_path = mp3_directory.join(format!("{}.mp3", record.formatted_date));
        if mp3_path.exists() {
            missing.retain(|f| f != audio_field_name);
        }

        if !missing.is_empty() {
            warn!(index = idx, missing = ?missing, "Record still missing fields");
            record.missing_fields = Some(missing);
        }
    }
}
