//! Morning Edition archive scraper.
//!
//! Two-phase, like every scraper here: index the archive page to discover
//! segment URLs, then fetch each segment page and pull out the date,
//! summary, transcript, and audio link. The associated MP3 is downloaded
//! alongside, and records are merged into per-month `YYYYMM.json` archives
//! keyed by `audio_link` so re-runs never duplicate a segment.

use crate::config::ScraperConfig;
use crate::models::NewsRecord;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::get;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// The archive sometimes renders the date glued to the time
/// ("August 7, 20235:00 AM ET"); split the year from the clock.
static DATE_GLUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})(\d{1,2}:\d{1,2})").unwrap());

/// Leading "Month day, year" portion of the dateblock text.
static DATE_PART_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+ \d{1,2}, \d{4}").unwrap());

/// Run the full scrape stage.
#[instrument(level = "info", skip_all, fields(news_count = config.news_count))]
pub async fn run(config: &ScraperConfig, news_count: Option<usize>) -> Result<(), Box<dyn Error>> {
    let count = news_count.unwrap_or(config.news_count);
    let urls = index_segments(&config.archive_url, count).await?;
    let records = fetch_segments(&urls, &config.mp3_directory).await;
    if records.is_empty() {
        return Err("no segments could be scraped".into());
    }
    save_monthly(&records, &config.news_directory).await?;
    println!("Scraped {} segments.", records.len());
    Ok(())
}

/// Index the archive page and extract up to `count` segment URLs.
///
/// Each program day lists several segments; the first one is the news
/// brief we want.
#[instrument(level = "info", skip(archive_url))]
pub async fn index_segments(archive_url: &str, count: usize) -> Result<Vec<String>, Box<dyn Error>> {
    let base_url = Url::parse(archive_url)?;
    let html = get(archive_url).await?.error_for_status()?.text().await?;
    let urls = parse_segment_urls(&html, &base_url, count);
    info!(count = urls.len(), source = archive_url, "Indexed segment URLs");
    debug!(?urls, "Segment URLs");
    Ok(urls)
}

fn parse_segment_urls(html: &str, base_url: &Url, count: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let day_selector = Selector::parse("section.program-show__segments").unwrap();
    let link_selector = Selector::parse("article .program-segment__title a").unwrap();

    let mut urls = Vec::new();
    for day in document.select(&day_selector) {
        if urls.len() >= count {
            break;
        }
        // The first segment of each program day is the news brief.
        if let Some(link) = day.select(&link_selector).next()
            && let Some(href) = link.value().attr("href")
            && let Ok(resolved) = base_url.join(href)
        {
            let resolved = resolved.to_string();
            if !urls.contains(&resolved) {
                urls.push(resolved);
            }
        }
    }
    urls
}

/// Fetch all segments in order. Failed fetches are logged and skipped
/// without failing the batch.
#[instrument(level = "info", skip_all)]
pub async fn fetch_segments(urls: &[String], mp3_directory: &Path) -> Vec<NewsRecord> {
    let records: Vec<NewsRecord> = stream::iter(urls)
        .then(|url| async move {
            match fetch_segment(url, mp3_directory).await {
                Ok(record) => {
                    debug!(%url, "Fetched segment");
                    Some(record)
                }
                Err(e) => {
                    error!(error = %e, %url, "Segment fetch failed");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(count = records.len(), "Fetched segment contents");
    records
}

/// Fetch and parse a single segment page, then download its audio.
#[instrument(level = "info", skip_all, fields(%url))]
async fn fetch_segment(url: &str, mp3_directory: &Path) -> Result<NewsRecord, Box<dyn Error>> {
    let body = get(url).await?.error_for_status()?.text().await?;
    let record = parse_segment(&body)?;
    info!(
        date = %record.date,
        bytes = record.content.len(),
        "Parsed segment"
    );

    if let Err(e) = download_audio(&record, mp3_directory).await {
        warn!(error = %e, audio_link = %record.audio_link, "Audio download failed");
    }
    Ok(record)
}

/// Extract a [`NewsRecord`] from a segment page.
pub fn parse_segment(html: &str) -> Result<NewsRecord, Box<dyn Error>> {
    let document = Html::parse_document(html);

    let date_selector = Selector::parse(".dateblock time")?;
    let summary_selector = Selector::parse("#storytext > p")?;
    let transcript_selector = Selector::parse(".transcript.storytext p")?;
    let audio_selector = Selector::parse(".audio-tool-download a")?;

    let raw_date = document
        .select(&date_selector)
        .next()
        .map(|e| e.text().collect::<String>())
        .ok_or("segment page has no dateblock")?;
    let (date, formatted_date) = normalize_date(&raw_date)?;

    let summary = document
        .select(&summary_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let content = document
        .select(&transcript_selector)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let audio_link = document
        .select(&audio_selector)
        .next()
        .and_then(|e| e.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    Ok(NewsRecord {
        date,
        formatted_date,
        summary,
        content,
        audio_link,
        missing_fields: None,
    })
}

/// Clean up the dateblock text and derive the `YYYYMMDD` form.
///
/// Returns `(display_date, formatted_date)`.
pub fn normalize_date(raw: &str) -> Result<(String, String), Box<dyn Error>> {
    let unglued = DATE_GLUE_RE.replace(raw.trim(), "$1 $2");
    let date_part = DATE_PART_RE
        .find(&unglued)
        .ok_or_else(|| format!("could not parse date: {unglued}"))?
        .as_str()
        .to_string();
    let formatted = NaiveDate::parse_from_str(&date_part, "%B %d, %Y")?
        .format("%Y%m%d")
        .to_string();
    Ok((date_part, formatted))
}

/// Download a record's audio to `{mp3_directory}/{formatted_date}.mp3`.
async fn download_audio(record: &NewsRecord, mp3_directory: &Path) -> Result<(), Box<dyn Error>> {
    if record.audio_link.is_empty() {
        return Err("record has no audio link".into());
    }
    fs::create_dir_all(mp3_directory).await?;
    let bytes = get(&record.audio_link)
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let path = mp3_directory.join(format!("{}.mp3", record.formatted_date));
    fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved audio");
    Ok(())
}

/// Merge records into per-month archive files, skipping any `audio_link`
/// already present so the archives stay append-only across runs.
#[instrument(level = "info", skip_all)]
pub async fn save_monthly(
    records: &[NewsRecord],
    news_directory: &Path,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(news_directory).await?;

    let mut by_month: BTreeMap<String, Vec<&NewsRecord>> = BTreeMap::new();
    for record in records {
        match record.month_key() {
            Some(month) => by_month.entry(month.to_string()).or_default().push(record),
            None => warn!(
                formatted_date = %record.formatted_date,
                "Record has no usable month key; not archiving"
            ),
        }
    }

    for (month, month_records) in by_month {
        let path = news_directory.join(format!("{month}.json"));
        let mut existing: Vec<NewsRecord> = match fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| format!("malformed JSON in {}: {e}", path.display()))?,
            Err(_) => Vec::new(),
        };
        let known: HashSet<String> =
            existing.iter().map(|r| r.audio_link.clone()).collect();

        let mut added = 0usize;
        for record in month_records {
            if known.contains(&record.audio_link) {
                info!(date = %record.date, "Segment already archived; skipping");
            } else {
                existing.push(record.clone());
                added += 1;
            }
        }

        let json = serde_json::to_string_pretty(&existing)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), added, total = existing.len(), "Updated monthly archive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT_HTML: &str = r#"
        <html><body>
        <div id="story-meta"><div class="dateblock">
            <time>August 7, 20235:00 AM ET</time>
        </div></div>
        <div id="storytext"><p>Markets opened lower this morning.</p></div>
        <article><div class="transcript storytext">
            <p>RACHEL MARTIN, HOST: Good morning.</p>
            <p>The economy shrank last quarter.</p>
        </div></article>
        <div class="audio-tool-download">
            <a href="https://media.example.org/20230807.mp3">Download</a>
        </div>
        </body></html>
    "#;

    fn record(audio_link: &str, formatted_date: &str) -> NewsRecord {
        NewsRecord {
            date: "August 7, 2023".to_string(),
            formatted_date: formatted_date.to_string(),
            summary: "s".to_string(),
            content: "c".to_string(),
            audio_link: audio_link.to_string(),
            missing_fields: None,
        }
    }

    #[test]
    fn test_normalize_date_unglues_time() {
        let (date, formatted) = normalize_date("August 7, 20235:00 AM ET").unwrap();
        assert_eq!(date, "August 7, 2023");
        assert_eq!(formatted, "20230807");
    }

    #[test]
    fn test_normalize_date_plain() {
        let (date, formatted) = normalize_date("December 31, 2023").unwrap();
        assert_eq!(date, "December 31, 2023");
        assert_eq!(formatted, "20231231");
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        assert!(normalize_date("yesterday at noon").is_err());
    }

    #[test]
    fn test_parse_segment() {
        let record = parse_segment(SEGMENT_HTML).unwrap();
        assert_eq!(record.date, "August 7, 2023");
        assert_eq!(record.formatted_date, "20230807");
        assert_eq!(record.summary, "Markets opened lower this morning.");
        assert!(record.content.contains("RACHEL MARTIN, HOST: Good morning."));
        assert!(record.content.contains("The economy shrank last quarter."));
        assert_eq!(record.audio_link, "https://media.example.org/20230807.mp3");
    }

    #[test]
    fn test_parse_segment_without_dateblock_fails() {
        assert!(parse_segment("<html><body><p>nothing</p></body></html>").is_err());
    }

    #[test]
    fn test_parse_segment_urls_limit_and_dedup() {
        let html = r#"
            <section class="program-show__segments">
                <article><h3 class="program-segment__title"><a href="/2023/08/07/brief">x</a></h3></article>
                <article><h3 class="program-segment__title"><a href="/2023/08/07/other">x</a></h3></article>
            </section>
            <section class="program-show__segments">
                <article><h3 class="program-segment__title"><a href="/2023/08/06/brief">x</a></h3></article>
            </section>
            <section class="program-show__segments">
                <article><h3 class="program-segment__title"><a href="/2023/08/06/brief">x</a></h3></article>
            </section>
            <section class="program-show__segments">
                <article><h3 class="program-segment__title"><a href="/2023/08/05/brief">x</a></h3></article>
            </section>
        "#;
        let base = Url::parse("https://www.npr.org/programs/morning-edition/archive").unwrap();

        let urls = parse_segment_urls(html, &base, 10);
        assert_eq!(
            urls,
            vec![
                "https://www.npr.org/2023/08/07/brief",
                "https://www.npr.org/2023/08/06/brief",
                "https://www.npr.org/2023/08/05/brief",
            ]
        );

        let limited = parse_segment_urls(html, &base, 1);
        assert_eq!(limited, vec!["https://www.npr.org/2023/08/07/brief"]);
    }

    #[tokio::test]
    async fn test_save_monthly_groups_by_month() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("a", "20230807"),
            record("b", "20230901"),
            record("c", "20230815"),
        ];
        save_monthly(&records, dir.path()).await.unwrap();

        let august: Vec<NewsRecord> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("202308.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(august.len(), 2);

        let september: Vec<NewsRecord> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("202309.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(september.len(), 1);
    }

    #[tokio::test]
    async fn test_save_monthly_merge_skips_known_audio_links() {
        let dir = tempfile::tempdir().unwrap();
        save_monthly(&[record("a", "20230807")], dir.path()).await.unwrap();
        save_monthly(&[record("a", "20230807"), record("b", "20230808")], dir.path())
            .await
            .unwrap();

        let merged: Vec<NewsRecord> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("202308.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].audio_link, "a");
        assert_eq!(merged[1].audio_link, "b");
    }
}
