//! Word-frequency visualization over cleaned transcript text.
//!
//! Aggregates the `content` of every cleaned record, strips speaker labels
//! (`HOST:`, `JOHN SMITH:`) so attribution noise doesn't dominate, counts
//! the remaining words, and renders a PNG tile chart where tile area tracks
//! word frequency. The stack carries no glyph rasterizer, so the image
//! encodes rank and weight geometrically and a JSON sidecar next to the PNG
//! lists the ranked words with their counts.

use crate::models::NewsRecord;
use image::{Rgb, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use tracing::{info, warn};

/// Speaker attribution labels, e.g. `"\nRACHEL MARTIN:"`.
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z\s]+:").unwrap());

const IMAGE_WIDTH: u32 = 800;
const IMAGE_HEIGHT: u32 = 400;
const GRID_COLS: u32 = 8;
const GRID_ROWS: u32 = 5;
/// Words shorter than this are treated as stop words.
const MIN_WORD_LEN: usize = 3;

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
];

/// Render the word-frequency image and its sidecar for a cleaned data set.
///
/// Produces nothing when there is no usable text; that is a warning, not
/// an error.
pub fn generate(records: &[NewsRecord], output: &Path) -> Result<(), Box<dyn Error>> {
    if records.is_empty() {
        warn!("No cleaned records available for word-frequency image");
        return Ok(());
    }

    let frequencies = word_frequencies(records);
    if frequencies.is_empty() {
        warn!("No text left after stripping labels; skipping word-frequency image");
        return Ok(());
    }

    let top: Vec<(String, usize)> = frequencies
        .into_iter()
        .take((GRID_COLS * GRID_ROWS) as usize)
        .collect();

    let img = render_tiles(&top);
    img.save(output)?;
    info!(path = %output.display(), words = top.len(), "Wrote word-frequency image");

    let sidecar = output.with_extension("json");
    let ranked: Vec<serde_json::Value> = top
        .iter()
        .map(|(word, count)| serde_json::json!({ "word": word, "count": count }))
        .collect();
    std::fs::write(&sidecar, serde_json::to_string_pretty(&ranked)?)?;
    info!(path = %sidecar.display(), "Wrote word-frequency sidecar");
    Ok(())
}

/// Count words across all record content, most frequent first.
///
/// Speaker labels are removed before tokenizing; tokens are lowercased and
/// stripped to their alphabetic characters. Ties break alphabetically so
/// the ordering is deterministic.
pub fn word_frequencies(records: &[NewsRecord]) -> Vec<(String, usize)> {
    let mut text = String::new();
    for record in records {
        text.push_str(&record.content);
        text.push(' ');
    }
    let stripped = LABEL_RE.replace_all(&text, "");

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in stripped.split_whitespace() {
        let word: String = token
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(|c| c.to_lowercase())
            .collect();
        if word.chars().count() < MIN_WORD_LEN {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Draw one tile per word on a fixed grid, tile size scaled by the square
/// root of relative frequency.
fn render_tiles(frequencies: &[(String, usize)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb([255, 255, 255]));
    let max_count = frequencies.first().map(|(_, c)| *c).unwrap_or(1) as f64;
    let cell_w = IMAGE_WIDTH / GRID_COLS;
    let cell_h = IMAGE_HEIGHT / GRID_ROWS;

    for (idx, (_, count)) in frequencies.iter().enumerate() {
        let col = idx as u32 % GRID_COLS;
        let row = idx as u32 / GRID_COLS;
        if row >= GRID_ROWS {
            break;
        }

        let weight = (*count as f64 / max_count).sqrt();
        let tile_w = ((cell_w - 8) as f64 * weight).max(2.0) as u32;
        let tile_h = ((cell_h - 8) as f64 * weight).max(2.0) as u32;
        let x0 = col * cell_w + (cell_w - tile_w) / 2;
        let y0 = row * cell_h + (cell_h - tile_h) / 2;
        let color = PALETTE[idx % PALETTE.len()];

        for y in y0..(y0 + tile_h).min(IMAGE_HEIGHT) {
            for x in x0..(x0 + tile_w).min(IMAGE_WIDTH) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_content(content: &str) -> NewsRecord {
        NewsRecord {
            date: "August 7, 2023".to_string(),
            formatted_date: "20230807".to_string(),
            summary: "s".to_string(),
            content: content.to_string(),
            audio_link: "a".to_string(),
            missing_fields: None,
        }
    }

    #[test]
    fn test_frequencies_strip_speaker_labels() {
        let records = vec![record_with_content(
            "RACHEL MARTIN: markets markets fell today\nSTEVE INSKEEP: markets rallied",
        )];
        let freqs = word_frequencies(&records);
        assert_eq!(freqs[0], ("markets".to_string(), 3));
        assert!(!freqs.iter().any(|(w, _)| w == "rachel" || w == "martin"));
    }

    #[test]
    fn test_frequencies_lowercase_and_drop_short_tokens() {
        let records = vec![record_with_content("The the THE on we economy economy")];
        let freqs = word_frequencies(&records);
        assert!(freqs.contains(&("the".to_string(), 3)));
        assert!(freqs.contains(&("economy".to_string(), 2)));
        assert!(!freqs.iter().any(|(w, _)| w == "on" || w == "we"));
    }

    #[test]
    fn test_frequencies_deterministic_tie_break() {
        let records = vec![record_with_content("beta alpha beta alpha")];
        let freqs = word_frequencies(&records);
        assert_eq!(freqs[0].0, "alpha");
        assert_eq!(freqs[1].0, "beta");
    }

    #[test]
    fn test_generate_writes_png_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("wordcloud.png");
        let records = vec![record_with_content("economy economy inflation rates")];

        generate(&records, &out).unwrap();
        assert!(out.exists());

        let sidecar: Vec<serde_json::Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("wordcloud.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar[0]["word"], "economy");
        assert_eq!(sidecar[0]["count"], 2);
    }

    #[test]
    fn test_generate_skips_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("wordcloud.png");
        generate(&[], &out).unwrap();
        assert!(!out.exists());

        // All content consumed by the label pattern.
        let records = vec![record_with_content("HOST:")];
        generate(&records, &out).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_render_dimensions() {
        let img = render_tiles(&[("economy".to_string(), 4), ("rates".to_string(), 1)]);
        assert_eq!(img.dimensions(), (IMAGE_WIDTH, IMAGE_HEIGHT));
        // Background stays white in the far corner.
        assert_eq!(*img.get_pixel(IMAGE_WIDTH - 1, IMAGE_HEIGHT - 1), Rgb([255, 255, 255]));
        // The first tile painted something non-white near the first cell center.
        assert_ne!(*img.get_pixel(50, 40), Rgb([255, 255, 255]));
    }
}
