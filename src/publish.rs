//! WordPress publishing for translated records.
//!
//! The site keeps one index page holding a `<ul>` of dated links, one per
//! news brief. Publishing is idempotent: the existing dates are read from
//! the page once, and only records whose display date is absent get
//! appended. The append itself is a document-model edit — the page HTML is
//! streamed through quick-xml and a well-formed `<li><a>` node is emitted
//! just before the first `</ul>`, rather than splicing strings into the
//! markup.

use crate::config::PublisherConfig;
use crate::models::NewsRecord;
use crate::utils::display_date;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use scraper::{Html, Selector};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

pub struct WordPressClient {
    client: reqwest::Client,
    api_url: String,
    username: String,
    app_password: String,
    page_id: String,
}

impl WordPressClient {
    pub fn new(config: &PublisherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.wp_api_url.clone(),
            username: config.wp_username.clone(),
            app_password: config.wp_app_password.clone(),
            page_id: config.wp_page_id.clone(),
        }
    }

    fn page_url(&self) -> String {
        format!("{}/pages/{}", self.api_url.trim_end_matches('/'), self.page_id)
    }

    /// Fetch the rendered HTML content of the index page.
    pub async fn fetch_page_content(&self) -> Result<String, Box<dyn Error>> {
        let body: Value = self
            .client
            .get(self.page_url())
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body
            .pointer("/content/rendered")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Collect the dates already linked on the index page.
    pub async fn existing_dates(&self) -> Result<HashSet<String>, Box<dyn Error>> {
        let content = self.fetch_page_content().await?;
        Ok(parse_list_dates(&content))
    }

    async fn update_page_content(&self, content: &str) -> Result<(), Box<dyn Error>> {
        self.client
            .post(self.page_url())
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&json!({ "content": content }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Append a record's dated link to the index page.
    ///
    /// Re-fetches the page so concurrent edits made since the existence
    /// check are at least based on the freshest content available (there
    /// is still no locking; the scheduler guarantees non-overlap).
    pub async fn add_record(
        &self,
        record: &NewsRecord,
        site_base_url: &str,
    ) -> Result<(), Box<dyn Error>> {
        let date_text = display_date(&record.formatted_date)
            .ok_or_else(|| format!("unparseable formatted_date: {}", record.formatted_date))?;
        let href = format!(
            "{}/{date_text}-morning-news-brief-npr/",
            site_base_url.trim_end_matches('/')
        );

        let page = self.fetch_page_content().await?;
        let Some(updated) = append_list_item(&page, &date_text, &href)? else {
            info!(date = %date_text, "News brief already on index page; skipping");
            return Ok(());
        };
        self.update_page_content(&updated).await?;
        info!(date = %date_text, "Added news brief to index page");
        Ok(())
    }
}

/// Extract the anchor texts of every list item in the page content.
pub fn parse_list_dates(html: &str) -> HashSet<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("li > a").unwrap();
    document
        .select(&selector)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Insert the dated link unless the freshly fetched page already lists it.
///
/// The batch-level existence check runs once against a single fetch, and a
/// failed fetch there degrades to an empty set; this re-check against the
/// current page keeps that degradation from double-publishing a date.
pub fn append_list_item(
    page: &str,
    text: &str,
    href: &str,
) -> Result<Option<String>, Box<dyn Error>> {
    if parse_list_dates(page).contains(text) {
        return Ok(None);
    }
    insert_list_item(page, text, href).map(Some)
}

/// Insert `<li><a href="{href}">{text}</a></li>` immediately before the
/// first `</ul>` in the document, via an event rewrite rather than string
/// substitution.
pub fn insert_list_item(html: &str, text: &str, href: &str) -> Result<String, Box<dyn Error>> {
    let mut reader = Reader::from_str(html);
    // Rendered page HTML is not strict XML; don't demand matched tags.
    let reader_config = reader.config_mut();
    reader_config.check_end_names = false;
    reader_config.allow_unmatched_ends = true;

    let mut writer = Writer::new(Vec::new());
    let mut inserted = false;
    loop {
        match reader.read_event() {
            Ok(Event::End(end)) if !inserted && end.name().as_ref() == b"ul" => {
                writer.write_event(Event::Start(BytesStart::new("li")))?;
                let mut anchor = BytesStart::new("a");
                anchor.push_attribute(("href", href));
                writer.write_event(Event::Start(anchor))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new("a")))?;
                writer.write_event(Event::End(BytesEnd::new("li")))?;
                writer.write_event(Event::End(end))?;
                inserted = true;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => return Err(format!("failed to parse page content: {e}").into()),
        }
    }
    if !inserted {
        return Err("page content has no list to append to".into());
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Copy every file in the site directory into a sibling `_backup`
/// directory before touching the remote page.
pub async fn backup_site_content(site_directory: &Path) -> Result<(), Box<dyn Error>> {
    let backup_dir = PathBuf::from(format!("{}_backup", site_directory.display()));
    fs::create_dir_all(&backup_dir).await?;

    let mut copied = 0usize;
    let mut entries = fs::read_dir(site_directory).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            fs::copy(entry.path(), backup_dir.join(entry.file_name())).await?;
            copied += 1;
        }
    }
    info!(backup_dir = %backup_dir.display(), copied, "Backed up site content");
    Ok(())
}

/// Run the full publish stage.
///
/// A page fetch or update failure for one record is logged and the batch
/// continues; only a missing input file or failed backup aborts the run.
#[instrument(level = "info", skip_all)]
pub async fn run(config: &PublisherConfig, skip_backup: bool) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(&config.translated_data_file).await.map_err(|e| {
        format!(
            "failed to read translated data {}: {e}",
            config.translated_data_file.display()
        )
    })?;
    let records: Vec<NewsRecord> = serde_json::from_str(&text).map_err(|e| {
        format!("malformed JSON in {}: {e}", config.translated_data_file.display())
    })?;

    let client = WordPressClient::new(config);
    let existing = match client.existing_dates().await {
        Ok(dates) => dates,
        Err(e) => {
            error!(error = %e, "Could not fetch existing dates; treating page as empty");
            HashSet::new()
        }
    };
    info!(count = existing.len(), "Existing dates on index page");

    if !config.test_mode && !skip_backup {
        backup_site_content(&config.site_directory).await?;
    }

    let mut added = 0usize;
    for record in &records {
        let Some(date_text) = display_date(&record.formatted_date) else {
            warn!(formatted_date = %record.formatted_date, "Skipping record with bad date");
            continue;
        };
        if existing.contains(&date_text) {
            info!(date = %date_text, "News brief already published; skipping");
            continue;
        }
        match client.add_record(record, &config.site_base_url).await {
            Ok(()) => added += 1,
            Err(e) => error!(error = %e, date = %date_text, "Failed to publish record"),
        }
    }

    println!("Website update completed. {added} new entries added.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_HTML: &str = concat!(
        r#"<div class="entry"><h2>News Briefs</h2>"#,
        r#"<ul><li><a href="https://site.example/english/08-07-2023-morning-news-brief-npr/">08-07-2023</a></li>"#,
        r#"<li><a href="https://site.example/english/08-08-2023-morning-news-brief-npr/">08-08-2023</a></li></ul>"#,
        r#"<ul><li><a href="https://site.example/about/">About</a></li></ul></div>"#
    );

    #[test]
    fn test_parse_list_dates() {
        let dates = parse_list_dates(PAGE_HTML);
        assert!(dates.contains("08-07-2023"));
        assert!(dates.contains("08-08-2023"));
        // Anchor text is collected as-is; filtering to dates happens via
        // the exists check, which only ever looks dates up.
        assert!(dates.contains("About"));
    }

    #[test]
    fn test_parse_list_dates_empty_page() {
        assert!(parse_list_dates("<p>nothing here</p>").is_empty());
    }

    #[test]
    fn test_insert_list_item_before_first_ul_close() {
        let updated = insert_list_item(
            PAGE_HTML,
            "08-09-2023",
            "https://site.example/english/08-09-2023-morning-news-brief-npr/",
        )
        .unwrap();

        let li = r#"<li><a href="https://site.example/english/08-09-2023-morning-news-brief-npr/">08-09-2023</a></li>"#;
        assert!(updated.contains(li));

        // Inserted into the first list only, right before its close.
        let first_ul_end = updated.find("</ul>").unwrap();
        let li_pos = updated.find(li).unwrap();
        assert!(li_pos < first_ul_end);
        assert!(!updated[first_ul_end..].contains("08-09-2023"));

        // Everything else survives the rewrite.
        assert!(updated.contains("08-07-2023"));
        assert!(updated.contains("About"));
    }

    #[test]
    fn test_append_list_item_skips_already_listed_date() {
        let result = append_list_item(
            PAGE_HTML,
            "08-07-2023",
            "https://site.example/english/08-07-2023-morning-news-brief-npr/",
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_append_list_item_inserts_new_date() {
        let updated = append_list_item(PAGE_HTML, "08-09-2023", "https://x/")
            .unwrap()
            .unwrap();
        assert!(updated.contains(r#"<a href="https://x/">08-09-2023</a>"#));
    }

    #[test]
    fn test_insert_list_item_fails_without_list() {
        assert!(insert_list_item("<p>no list</p>", "08-09-2023", "https://x/").is_err());
    }

    #[tokio::test]
    async fn test_backup_site_content_copies_files() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("english");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("index.html"), "<html></html>").unwrap();
        std::fs::write(site.join("style.css"), "body {}").unwrap();

        backup_site_content(&site).await.unwrap();

        let backup = dir.path().join("english_backup");
        assert!(backup.join("index.html").exists());
        assert!(backup.join("style.css").exists());
    }
}
