//! `ComicInfo.xml` metadata embedded in comic archives.

use crate::error::{ImportError, Result};
use roxmltree::Document;
use serde::{Deserialize, Serialize};

/// File name of the embedded metadata document (matched case-insensitively).
pub const COMIC_INFO_FILE: &str = "comicinfo.xml";

/// Largest metadata document buffered while streaming.
pub const MAX_COMIC_INFO_SIZE: u64 = 1024 * 1024;

/// Text metadata read from `ComicInfo.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicMetadata {
    /// Issue title.
    pub title: Option<String>,
    /// Series name.
    pub series: Option<String>,
    /// Issue number within the series.
    pub number: Option<String>,
    /// Writer credit.
    pub writer: Option<String>,
    /// Summary text.
    pub summary: Option<String>,
}

impl ComicMetadata {
    /// Parse a `ComicInfo.xml` document.
    pub fn parse(content: &str) -> Result<Self> {
        let doc = Document::parse(content)
            .map_err(|e| ImportError::Decode(format!("ComicInfo.xml: {}", e)))?;

        let mut meta = ComicMetadata::default();
        for node in doc.root_element().children().filter(|n| n.is_element()) {
            let Some(text) = node.text().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            match node.tag_name().name() {
                "Title" => meta.title = Some(text.to_string()),
                "Series" => meta.series = Some(text.to_string()),
                "Number" => meta.number = Some(text.to_string()),
                "Writer" => meta.writer = Some(text.to_string()),
                "Summary" => meta.summary = Some(text.to_string()),
                _ => {}
            }
        }

        Ok(meta)
    }

    /// Parse raw bytes, tolerating a UTF-8 byte order mark.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
        let content = std::str::from_utf8(data)
            .map_err(|e| ImportError::Decode(format!("ComicInfo.xml is not UTF-8: {}", e)))?;
        Self::parse(content)
    }

    /// Display title: the issue title, else "Series #Number", else the series.
    pub fn display_title(&self) -> Option<String> {
        if let Some(title) = &self.title {
            return Some(title.clone());
        }
        match (&self.series, &self.number) {
            (Some(series), Some(number)) => Some(format!("{} #{}", series, number)),
            (Some(series), None) => Some(series.clone()),
            _ => None,
        }
    }
}

/// Whether an archive entry is the metadata document.
pub fn is_comic_info(entry_name: &str) -> bool {
    entry_name
        .rsplit('/')
        .next()
        .is_some_and(|name| name.eq_ignore_ascii_case(COMIC_INFO_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Series>Planetes</Series>
  <Number>3</Number>
  <Writer>Makoto Yukimura</Writer>
  <Summary>
    Debris collectors in low orbit.
  </Summary>
  <PageCount>212</PageCount>
</ComicInfo>"#;

    #[test]
    fn parses_known_fields() {
        let meta = ComicMetadata::parse(SAMPLE).unwrap();
        assert_eq!(meta.series.as_deref(), Some("Planetes"));
        assert_eq!(meta.writer.as_deref(), Some("Makoto Yukimura"));
        assert_eq!(meta.summary.as_deref(), Some("Debris collectors in low orbit."));
        assert_eq!(meta.title, None);
        assert_eq!(meta.display_title().as_deref(), Some("Planetes #3"));
    }

    #[test]
    fn title_wins_over_series() {
        let meta = ComicMetadata::from_bytes(
            b"\xef\xbb\xbf<ComicInfo><Title>Orbit</Title><Series>Planetes</Series></ComicInfo>",
        )
        .unwrap();
        assert_eq!(meta.display_title().as_deref(), Some("Orbit"));
    }

    #[test]
    fn malformed_xml_is_a_decode_error() {
        assert!(matches!(
            ComicMetadata::parse("<ComicInfo><Title>"),
            Err(ImportError::Decode(_))
        ));
    }

    #[test]
    fn matches_entry_names() {
        assert!(is_comic_info("ComicInfo.xml"));
        assert!(is_comic_info("Vol 1/comicinfo.XML"));
        assert!(!is_comic_info("ComicInfo.xml.bak"));
    }
}
