//! Rebuilds per-file display rows from a flat manifest.
//!
//! Stored keys look like `projects/<category>/<millis>-<name>.<ext>`. Files
//! sharing a base name (the poster's `.psd` and `.jpg`, say) collapse into a
//! single row with one cell per extension.

use serde::Serialize;

use crate::manifest::FileManifest;

/// One row per original upload, keyed by base filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileRow {
    pub name: String,
    pub pdf: Option<String>,
    pub doc: Option<String>,
    pub docx: Option<String>,
    pub ppt: Option<String>,
    pub pptx: Option<String>,
    pub xls: Option<String>,
    pub xlsx: Option<String>,
    pub psd: Option<String>,
    pub ai: Option<String>,
    pub jpg: Option<String>,
    pub png: Option<String>,
    pub mp4: Option<String>,
    pub html: Option<String>,
    pub zip: Option<String>,
    pub rar: Option<String>,
    /// Keys whose extension has no dedicated cell.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<String>,
}

impl FileRow {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn cell_mut(&mut self, extension: &str) -> Option<&mut Option<String>> {
        let cell = match extension {
            "pdf" => &mut self.pdf,
            "doc" => &mut self.doc,
            "docx" => &mut self.docx,
            "ppt" => &mut self.ppt,
            "pptx" => &mut self.pptx,
            "xls" => &mut self.xls,
            "xlsx" => &mut self.xlsx,
            "psd" => &mut self.psd,
            "ai" => &mut self.ai,
            "jpg" | "jpeg" => &mut self.jpg,
            "png" => &mut self.png,
            "mp4" => &mut self.mp4,
            "html" | "htm" => &mut self.html,
            "zip" => &mut self.zip,
            "rar" => &mut self.rar,
            _ => return None,
        };
        Some(cell)
    }

    fn fill(&mut self, extension: &str, key: &str) {
        match self.cell_mut(extension) {
            Some(cell) => *cell = Some(key.to_string()),
            None => self.other.push(key.to_string()),
        }
    }
}

/// Split a stored key into `(base name, lower-cased extension)`.
pub fn parse_key(key: &str) -> (&str, String) {
    let segment = key.rsplit('/').next().unwrap_or(key);
    let original = match segment.split_once('-') {
        Some((_, rest)) => rest,
        None => segment,
    };
    match original.rsplit_once('.') {
        Some((base, ext)) => (base, ext.to_lowercase()),
        None => (original, String::new()),
    }
}

/// Group the manifest's keys into display rows in first-seen order.
pub fn group_files(manifest: &FileManifest) -> Vec<FileRow> {
    let mut rows: Vec<FileRow> = Vec::new();

    for key in manifest.keys() {
        let (base, extension) = parse_key(key);
        let index = match rows.iter().position(|r| r.name == base) {
            Some(i) => i,
            None => {
                rows.push(FileRow::new(base));
                rows.len() - 1
            }
        };
        rows[index].fill(&extension, key);
    }

    rows
}
