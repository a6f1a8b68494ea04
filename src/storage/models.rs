use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::FileManifest;
use crate::state_machine::{ApprovalStatus, LifecycleStatus, ReviewState};

/// Three-state value for partial updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    /// Field was not included in the request (no change).
    #[default]
    Absent,
    /// Field was explicitly cleared.
    Null,
    /// Field was set to a new value.
    Value(T),
}

impl<T> Patch<T> {
    /// Write this patch into `slot`.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *slot = None,
            Patch::Value(v) => *slot = Some(v),
        }
    }
}

/// Category tag for a submission. A document carries any number of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Project,
    Thesis,
    IndependentStudy,
    Article,
    Research,
    Software,
    Website,
    Poster,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 9] = [
        DocumentType::Project,
        DocumentType::Thesis,
        DocumentType::IndependentStudy,
        DocumentType::Article,
        DocumentType::Research,
        DocumentType::Software,
        DocumentType::Website,
        DocumentType::Poster,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Project => "project",
            DocumentType::Thesis => "thesis",
            DocumentType::IndependentStudy => "independent_study",
            DocumentType::Article => "article",
            DocumentType::Research => "research",
            DocumentType::Software => "software",
            DocumentType::Website => "website",
            DocumentType::Poster => "poster",
            DocumentType::Other => "other",
        }
    }

    /// Parse the legacy comma-joined form (`"project, article"`).
    pub fn parse_set(joined: &str) -> Result<BTreeSet<DocumentType>, String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<DocumentType>)
            .collect()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown document type '{s}'"))
    }
}

/// Descriptive fields supplied by the author. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    #[serde(default)]
    pub document_type: BTreeSet<DocumentType>,
    #[serde(default)]
    pub title_eng: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub co_author: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub advisor_name: Option<String>,
    #[serde(default)]
    pub co_advisor_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub support_agency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publish_year: Option<String>,
    #[serde(default)]
    pub scan_date: Option<String>,
    #[serde(default)]
    pub display_date: Option<String>,
}

/// Partial metadata update from the owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub document_type: Option<BTreeSet<DocumentType>>,
    pub title_eng: Patch<String>,
    pub author: Patch<String>,
    pub co_author: Patch<String>,
    pub abstract_text: Patch<String>,
    pub advisor_name: Patch<String>,
    pub co_advisor_name: Patch<String>,
    pub department: Patch<String>,
    pub keywords: Patch<String>,
    pub support_agency: Patch<String>,
    pub language: Patch<String>,
    pub publish_year: Patch<String>,
    pub scan_date: Patch<String>,
    pub display_date: Patch<String>,
}

impl MetadataPatch {
    pub fn apply_to(self, metadata: &mut DocumentMetadata) {
        if let Some(title) = self.title {
            metadata.title = title;
        }
        if let Some(types) = self.document_type {
            metadata.document_type = types;
        }
        self.title_eng.apply_to(&mut metadata.title_eng);
        self.author.apply_to(&mut metadata.author);
        self.co_author.apply_to(&mut metadata.co_author);
        self.abstract_text.apply_to(&mut metadata.abstract_text);
        self.advisor_name.apply_to(&mut metadata.advisor_name);
        self.co_advisor_name.apply_to(&mut metadata.co_advisor_name);
        self.department.apply_to(&mut metadata.department);
        self.keywords.apply_to(&mut metadata.keywords);
        self.support_agency.apply_to(&mut metadata.support_agency);
        self.language.apply_to(&mut metadata.language);
        self.publish_year.apply_to(&mut metadata.publish_year);
        self.scan_date.apply_to(&mut metadata.scan_date);
        self.display_date.apply_to(&mut metadata.display_date);
    }
}

/// One submission, stored as a single row in redb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub metadata: DocumentMetadata,
    pub file_paths: FileManifest,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub status: LifecycleStatus,
    /// Caller id of the author who created the record.
    pub submitted_by: String,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// A fresh submission: pending, inactive, lifecycle active.
    pub fn new(
        id: String,
        metadata: DocumentMetadata,
        file_paths: FileManifest,
        submitted_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            metadata,
            file_paths,
            approval_status: ApprovalStatus::Pending,
            is_active: false,
            status: LifecycleStatus::Active,
            submitted_by,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn review_state(&self) -> ReviewState {
        ReviewState {
            approval_status: self.approval_status,
            is_active: self.is_active,
        }
    }

    pub fn set_review_state(&mut self, state: ReviewState) {
        self.approval_status = state.approval_status;
        self.is_active = state.is_active;
    }

    /// Approved, switched on, and not archived.
    pub fn is_public(&self) -> bool {
        self.status == LifecycleStatus::Active && self.review_state().is_visible()
    }

    pub fn is_owned_by(&self, caller_id: &str) -> bool {
        self.submitted_by == caller_id
    }
}

/// Filters for the document listing.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub approval_status: Option<ApprovalStatus>,
    pub search: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub document_type: Option<DocumentType>,
    /// Restrict to publicly visible documents.
    pub public_only: bool,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &DocumentRecord) -> bool {
        if self.public_only && !doc.is_public() {
            return false;
        }
        if self
            .approval_status
            .is_some_and(|s| s != doc.approval_status)
        {
            return false;
        }
        if let Some(ref wanted) = self.document_type {
            if !doc.metadata.document_type.contains(wanted) {
                return false;
            }
        }
        if let Some(ref department) = self.department {
            let matches = doc
                .metadata
                .department
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(department.trim()));
            if !matches {
                return false;
            }
        }
        if let Some(ref year) = self.year {
            if doc.metadata.publish_year.as_deref().map(str::trim) != Some(year.trim()) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let m = &doc.metadata;
                let haystacks = [
                    Some(m.title.as_str()),
                    m.title_eng.as_deref(),
                    m.author.as_deref(),
                    m.co_author.as_deref(),
                    m.keywords.as_deref(),
                    m.abstract_text.as_deref(),
                ];
                let found = haystacks
                    .into_iter()
                    .flatten()
                    .any(|h| h.to_lowercase().contains(&needle));
                if !found {
                    return false;
                }
            }
        }
        true
    }
}
