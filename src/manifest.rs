//! Per-document file manifest: the fixed set of upload categories and the
//! ordered object keys stored under each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("Unknown file category: {0}")]
    UnknownCategory(String),
}

/// Logical upload category. Multipart field names use the same spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    CompletePdf,
    CompleteDoc,
    ArticleFiles,
    ProgramFiles,
    WebFiles,
    PosterFiles,
    CertificateFiles,
    FrontFace,
}

impl FileCategory {
    pub const ALL: [FileCategory; 8] = [
        FileCategory::CompletePdf,
        FileCategory::CompleteDoc,
        FileCategory::ArticleFiles,
        FileCategory::ProgramFiles,
        FileCategory::WebFiles,
        FileCategory::PosterFiles,
        FileCategory::CertificateFiles,
        FileCategory::FrontFace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::CompletePdf => "complete_pdf",
            FileCategory::CompleteDoc => "complete_doc",
            FileCategory::ArticleFiles => "article_files",
            FileCategory::ProgramFiles => "program_files",
            FileCategory::WebFiles => "web_files",
            FileCategory::PosterFiles => "poster_files",
            FileCategory::CertificateFiles => "certificate_files",
            FileCategory::FrontFace => "front_face",
        }
    }

    /// Resolve a multipart field name. Browsers that post repeated fields
    /// as `name[]` are accepted too.
    pub fn from_field_name(name: &str) -> Option<Self> {
        name.trim_end_matches("[]").parse().ok()
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ManifestError::UnknownCategory(s.to_string()))
    }
}

/// Object keys grouped by category. Every category is always serialized,
/// empty ones as `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileManifest {
    pub complete_pdf: Vec<String>,
    pub complete_doc: Vec<String>,
    pub article_files: Vec<String>,
    pub program_files: Vec<String>,
    pub web_files: Vec<String>,
    pub poster_files: Vec<String>,
    pub certificate_files: Vec<String>,
    pub front_face: Vec<String>,
}

impl FileManifest {
    pub fn category(&self, category: FileCategory) -> &[String] {
        match category {
            FileCategory::CompletePdf => &self.complete_pdf,
            FileCategory::CompleteDoc => &self.complete_doc,
            FileCategory::ArticleFiles => &self.article_files,
            FileCategory::ProgramFiles => &self.program_files,
            FileCategory::WebFiles => &self.web_files,
            FileCategory::PosterFiles => &self.poster_files,
            FileCategory::CertificateFiles => &self.certificate_files,
            FileCategory::FrontFace => &self.front_face,
        }
    }

    fn category_mut(&mut self, category: FileCategory) -> &mut Vec<String> {
        match category {
            FileCategory::CompletePdf => &mut self.complete_pdf,
            FileCategory::CompleteDoc => &mut self.complete_doc,
            FileCategory::ArticleFiles => &mut self.article_files,
            FileCategory::ProgramFiles => &mut self.program_files,
            FileCategory::WebFiles => &mut self.web_files,
            FileCategory::PosterFiles => &mut self.poster_files,
            FileCategory::CertificateFiles => &mut self.certificate_files,
            FileCategory::FrontFace => &mut self.front_face,
        }
    }

    pub fn push(&mut self, category: FileCategory, key: String) {
        self.category_mut(category).push(key);
    }

    /// All keys, category by category, preserving order within each.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        FileCategory::ALL
            .into_iter()
            .flat_map(move |c| self.category(c).iter().map(String::as_str))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().any(|k| k == key)
    }

    /// Merge an update into this manifest. A category with at least one new
    /// key is replaced wholesale; categories without new keys are retained.
    /// Returns the keys that are no longer referenced.
    pub fn merge_replace(&mut self, delta: FileManifest) -> Vec<String> {
        let mut superseded = Vec::new();
        let mut delta = delta;
        for category in FileCategory::ALL {
            let incoming = std::mem::take(delta.category_mut(category));
            if incoming.is_empty() {
                continue;
            }
            let previous = std::mem::replace(self.category_mut(category), incoming);
            superseded.extend(previous);
        }
        superseded.retain(|k| !self.contains(k));
        superseded
    }
}

/// Collects uploaded keys per category in arrival order.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    manifest: FileManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: FileCategory, key: impl Into<String>) -> &mut Self {
        self.manifest.push(category, key.into());
        self
    }

    pub fn build(self) -> FileManifest {
        self.manifest
    }
}
