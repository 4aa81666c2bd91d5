//! Source documents and the scraped-article JSON loader.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::config::defaults::{FETCH_ERROR_PREFIX, NO_CONTENT_PLACEHOLDER};
use crate::core::errors::PipelineError;

/// One record of the scraper's output array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub raw_text: String,
    pub source_url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(source_url: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            id: document_id(&source_url),
            raw_text: raw_text.into(),
            source_url,
            metadata: BTreeMap::new(),
        }
    }

    pub fn from_article(article: RawArticle, position: usize) -> Self {
        let mut document = Self::new(article.url, article.content);
        document
            .metadata
            .insert("position".to_string(), position.to_string());
        document
    }

    /// Whether the content is one of the scraper's failure placeholders.
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_content(&self.raw_text)
    }
}

pub fn is_placeholder_content(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed == NO_CONTENT_PLACEHOLDER || trimmed.starts_with(FETCH_ERROR_PREFIX)
}

/// Stable identifier derived from the source URL.
pub fn document_id(source_url: &str) -> String {
    let digest = Sha256::digest(source_url.as_bytes());
    hex::encode(&digest[..8])
}

pub fn parse_documents(json: &str) -> Result<Vec<Document>, PipelineError> {
    let articles: Vec<RawArticle> = serde_json::from_str(json)
        .map_err(|e| PipelineError::Config(format!("Invalid ingestion input: {}", e)))?;
    Ok(articles
        .into_iter()
        .enumerate()
        .map(|(position, article)| Document::from_article(article, position))
        .collect())
}

pub fn load_documents(path: &Path) -> Result<Vec<Document>, PipelineError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::Storage(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_documents(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn loads_fixture_articles_in_order() {
        let docs = load_documents(&fixture("articles.json")).expect("fixture loads");

        assert_eq!(docs.len(), 4);
        assert!(docs[0].source_url.starts_with("https://"));
        assert_eq!(docs[0].metadata.get("position").map(String::as_str), Some("0"));
        assert_eq!(docs[3].metadata.get("position").map(String::as_str), Some("3"));
    }

    #[test]
    fn placeholders_are_documents_not_errors() {
        let docs = load_documents(&fixture("articles.json")).expect("fixture loads");
        let placeholders: Vec<bool> = docs.iter().map(Document::is_placeholder).collect();

        assert_eq!(placeholders, vec![false, true, false, true]);
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        let docs = parse_documents(r#"[{"url": "https://example.org/a"}]"#).unwrap();
        assert_eq!(docs[0].raw_text, "");
        assert!(!docs[0].is_placeholder());
    }

    #[test]
    fn ids_are_stable_per_url() {
        let a = Document::new("https://example.org/a", "one");
        let b = Document::new("https://example.org/a", "two");
        let c = Document::new("https://example.org/c", "one");

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn malformed_input_is_a_config_error() {
        assert!(matches!(
            parse_documents("{\"url\": 1}"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_storage_error() {
        let err = load_documents(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
