//! Utility functions for text unescaping, date formatting, and input-file
//! selection.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Matches monthly archive filenames (`YYYYMM.json`).
static MONTHLY_FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}\.json$").unwrap());

/// Decode literal backslash-escape sequences left behind by double-encoded
/// text (e.g. a two-character `\n` becoming a real newline).
///
/// This is best-effort by design: if the text contains an escape sequence
/// that can't be decoded, the original string is returned unchanged rather
/// than surfacing an error.
pub fn unescape_literal(text: &str) -> String {
    match try_unescape(text) {
        Some(decoded) => decoded,
        None => text.to_string(),
    }
}

fn try_unescape(text: &str) -> Option<String> {
    if !text.contains('\\') {
        return Some(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '/' => out.push('/'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Find the most recent monthly archive file in a directory.
///
/// Selects the lexicographically greatest filename matching `YYYYMM.json`,
/// which for this naming scheme is the latest year-month. Returns `None`
/// when no file matches.
pub fn latest_monthly_file(directory: &Path) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let mut latest: Option<String> = None;
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if MONTHLY_FILE_RE.is_match(&name) && latest.as_deref() < Some(name.as_str()) {
            latest = Some(name);
        }
    }
    Ok(latest.map(|name| directory.join(name)))
}

/// Convert a `YYYYMMDD` date to the `MM-DD-YYYY` display form used on the
/// published page. Returns `None` when the input doesn't parse.
pub fn display_date(formatted_date: &str) -> Option<String> {
    NaiveDate::parse_from_str(formatted_date, "%Y%m%d")
        .ok()
        .map(|d| d.format("%m-%d-%Y").to_string())
}

/// Truncate a string for logging purposes, appending a byte-count marker
/// when text was cut.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…(+{} bytes)", &s[..end], s.len() - end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_unescape_common_sequences() {
        assert_eq!(unescape_literal(r"line one\nline two"), "line one\nline two");
        assert_eq!(unescape_literal(r"tab\there"), "tab\there");
        assert_eq!(unescape_literal(r#"quote \" end"#), "quote \" end");
        assert_eq!(unescape_literal(r"backslash \\ end"), "backslash \\ end");
    }

    #[test]
    fn test_unescape_unicode() {
        assert_eq!(unescape_literal(r"caf\u00e9"), "café");
    }

    #[test]
    fn test_unescape_keeps_original_on_bad_sequence() {
        // \q is not a recognized escape; the whole string stays untouched.
        assert_eq!(unescape_literal(r"broken \q text"), r"broken \q text");
        // Truncated unicode escape.
        assert_eq!(unescape_literal(r"bad \u00"), r"bad \u00");
        // Trailing lone backslash.
        assert_eq!(unescape_literal("dangling \\"), "dangling \\");
    }

    #[test]
    fn test_unescape_plain_text_untouched() {
        assert_eq!(unescape_literal("no escapes here"), "no escapes here");
    }

    #[test]
    fn test_latest_monthly_file_picks_greatest() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["202307.json", "202308.json", "202212.json", "notes.txt", "2023.json"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let latest = latest_monthly_file(dir.path()).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "202308.json");
    }

    #[test]
    fn test_latest_monthly_file_none_when_no_match() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        assert!(latest_monthly_file(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("20230807").as_deref(), Some("08-07-2023"));
        assert_eq!(display_date("2023-08-07"), None);
        assert_eq!(display_date("20231345"), None);
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 100), "short");
        let long = "a".repeat(500);
        let result = truncate_for_log(&long, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }
}
