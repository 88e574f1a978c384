//! Source file parsing and text extraction.

use crate::types::Document;
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Markdown,
    Html,
    Text,
}

impl ContentType {
    /// Detect content type from file extension; anything unknown is text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

/// Extracted text of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub text: String,
    pub content_type: ContentType,
}

/// Read `path` and extract clean text.
///
/// Binary files (NUL bytes or invalid UTF-8) are rejected with
/// `AppError::Ingestion`.
pub fn parse_file(path: &Path) -> AppResult<ParsedDocument> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Ingestion(format!("Failed to read {:?}: {}", path, e)))?;

    if bytes.contains(&0) {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Ingestion(format!(
            "Binary file not supported: {:?}",
            path
        )));
    }

    let raw = String::from_utf8(bytes)
        .map_err(|_| AppError::Ingestion(format!("File is not valid UTF-8: {:?}", path)))?;

    let content_type = ContentType::from_path(path);
    let text = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::Text => raw,
    };

    Ok(ParsedDocument { text, content_type })
}

/// Parse `path` into a `Document` keyed by its path.
pub fn load_document(path: &Path, source_id: Option<&str>) -> AppResult<Document> {
    let parsed = parse_file(path)?;
    let source_id = source_id
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    Ok(Document::new(source_id, parsed.text).with_metadata(serde_json::json!({
        "path": path.to_string_lossy(),
        "content_type": parsed.content_type.as_str(),
    })))
}

/// Expand directories into the regular files below them, sorted.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && !is_hidden(entry_path, path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Any component below `root` starting with a dot.
fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Strip heading markers and fences, keeping paragraph breaks.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank = false;

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if trimmed.is_empty() {
            blank = true;
            continue;
        }

        if blank && !result.is_empty() {
            result.push('\n');
        }
        blank = false;
        result.push_str(trimmed);
        result.push('\n');
    }

    result.trim().to_string()
}

const BLOCK_TAGS: &[&str] = &["</p", "</div", "</li", "</h", "<br", "</tr", "</section"];

/// Strip tags, scripts and styles; block-level closers become paragraph breaks.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    // ASCII lowering keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;
            let rest = &lower[i..];

            if rest.starts_with("<script") {
                in_script = true;
            } else if rest.starts_with("</script") {
                in_script = false;
            } else if rest.starts_with("<style") {
                in_style = true;
            } else if rest.starts_with("</style") {
                in_style = false;
            } else if BLOCK_TAGS.iter().any(|tag| rest.starts_with(tag)) {
                result.push_str("\n\n");
            }
        } else if ch == '>' {
            in_tag = false;
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result
        .split("\n\n")
        .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
