//! Role-based views of a document.
//!
//! One stored record, three shapes: the reviewer view for admins and
//! advisors, the owner view for the submitting student, and the public view
//! for everyone else.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grouping::{group_files, FileRow};
use crate::manifest::FileManifest;
use crate::state_machine::{ApprovalStatus, LifecycleStatus};
use crate::storage::models::{DocumentRecord, DocumentType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Advisor,
    Student,
    #[default]
    Guest,
}

impl Role {
    /// Unknown or missing roles degrade to guest.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "advisor" => Role::Advisor,
            "student" => Role::Student,
            _ => Role::Guest,
        }
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::Admin | Role::Advisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Advisor => "advisor",
            Role::Student => "student",
            Role::Guest => "guest",
        })
    }
}

/// Identity of whoever is making the request, as asserted by the fronting gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub id: Option<String>,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Option<String>, role: Role) -> Self {
        Self { id, role }
    }

    pub fn owns(&self, doc: &DocumentRecord) -> bool {
        self.id.as_deref().is_some_and(|id| doc.is_owned_by(id))
    }
}

/// Which representation a caller gets for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Reviewer,
    Owner,
    Public,
}

impl ViewKind {
    /// `None` when the caller may not see the document at all.
    pub fn select(caller: &Caller, doc: &DocumentRecord) -> Option<ViewKind> {
        if caller.role.is_reviewer() {
            Some(ViewKind::Reviewer)
        } else if caller.owns(doc) {
            Some(ViewKind::Owner)
        } else if doc.is_public() {
            Some(ViewKind::Public)
        } else {
            None
        }
    }
}

/// Whether `caller` may obtain download links for `doc`'s files.
pub fn can_download(caller: &Caller, doc: &DocumentRecord) -> bool {
    ViewKind::select(caller, doc).is_some()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerView {
    pub id: String,
    pub title: String,
    pub title_eng: Option<String>,
    pub document_type: BTreeSet<DocumentType>,
    pub author: Option<String>,
    pub co_author: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub advisor_name: Option<String>,
    pub co_advisor_name: Option<String>,
    pub department: Option<String>,
    pub keywords: Option<String>,
    pub support_agency: Option<String>,
    pub language: Option<String>,
    pub publish_year: Option<String>,
    pub scan_date: Option<String>,
    pub display_date: Option<String>,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub status: LifecycleStatus,
    pub submitted_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub file_paths: FileManifest,
    pub files: Vec<FileRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerView {
    pub id: String,
    pub title: String,
    pub title_eng: Option<String>,
    pub document_type: BTreeSet<DocumentType>,
    pub author: Option<String>,
    pub co_author: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub advisor_name: Option<String>,
    pub co_advisor_name: Option<String>,
    pub department: Option<String>,
    pub keywords: Option<String>,
    pub support_agency: Option<String>,
    pub language: Option<String>,
    pub publish_year: Option<String>,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub file_paths: FileManifest,
    pub files: Vec<FileRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicView {
    pub id: String,
    pub title: String,
    pub title_eng: Option<String>,
    pub document_type: BTreeSet<DocumentType>,
    pub author: Option<String>,
    pub co_author: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub keywords: Option<String>,
    pub language: Option<String>,
    pub publish_year: Option<String>,
    pub display_date: Option<String>,
    pub file_paths: FileManifest,
    pub files: Vec<FileRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum DocumentView {
    Reviewer(ReviewerView),
    Owner(OwnerView),
    Public(PublicView),
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339()
}

impl DocumentView {
    pub fn render(kind: ViewKind, doc: &DocumentRecord) -> Self {
        let m = &doc.metadata;
        let files = group_files(&doc.file_paths);
        match kind {
            ViewKind::Reviewer => DocumentView::Reviewer(ReviewerView {
                id: doc.id.clone(),
                title: m.title.clone(),
                title_eng: m.title_eng.clone(),
                document_type: m.document_type.clone(),
                author: m.author.clone(),
                co_author: m.co_author.clone(),
                abstract_text: m.abstract_text.clone(),
                advisor_name: m.advisor_name.clone(),
                co_advisor_name: m.co_advisor_name.clone(),
                department: m.department.clone(),
                keywords: m.keywords.clone(),
                support_agency: m.support_agency.clone(),
                language: m.language.clone(),
                publish_year: m.publish_year.clone(),
                scan_date: m.scan_date.clone(),
                display_date: m.display_date.clone(),
                approval_status: doc.approval_status,
                is_active: doc.is_active,
                status: doc.status,
                submitted_by: doc.submitted_by.clone(),
                reviewed_by: doc.reviewed_by.clone(),
                reviewed_at: doc.reviewed_at.as_ref().map(timestamp),
                created_at: timestamp(&doc.created_at),
                updated_at: timestamp(&doc.updated_at),
                file_paths: doc.file_paths.clone(),
                files,
            }),
            ViewKind::Owner => DocumentView::Owner(OwnerView {
                id: doc.id.clone(),
                title: m.title.clone(),
                title_eng: m.title_eng.clone(),
                document_type: m.document_type.clone(),
                author: m.author.clone(),
                co_author: m.co_author.clone(),
                abstract_text: m.abstract_text.clone(),
                advisor_name: m.advisor_name.clone(),
                co_advisor_name: m.co_advisor_name.clone(),
                department: m.department.clone(),
                keywords: m.keywords.clone(),
                support_agency: m.support_agency.clone(),
                language: m.language.clone(),
                publish_year: m.publish_year.clone(),
                approval_status: doc.approval_status,
                is_active: doc.is_active,
                created_at: timestamp(&doc.created_at),
                updated_at: timestamp(&doc.updated_at),
                file_paths: doc.file_paths.clone(),
                files,
            }),
            ViewKind::Public => DocumentView::Public(PublicView {
                id: doc.id.clone(),
                title: m.title.clone(),
                title_eng: m.title_eng.clone(),
                document_type: m.document_type.clone(),
                author: m.author.clone(),
                co_author: m.co_author.clone(),
                abstract_text: m.abstract_text.clone(),
                keywords: m.keywords.clone(),
                language: m.language.clone(),
                publish_year: m.publish_year.clone(),
                display_date: m.display_date.clone(),
                file_paths: doc.file_paths.clone(),
                files,
            }),
        }
    }

    /// Project `doc` for `caller`, or `None` if it should look nonexistent.
    pub fn for_caller(caller: &Caller, doc: &DocumentRecord) -> Option<Self> {
        ViewKind::select(caller, doc).map(|kind| Self::render(kind, doc))
    }
}
