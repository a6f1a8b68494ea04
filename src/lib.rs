//! project-archive - Submission, review and download service for academic project documents
//!
//! This crate provides:
//! - Multipart submission of a document record with files in fixed categories
//! - An approval workflow with an independent visibility flag
//! - Role-based views with files regrouped per original upload
//! - Time-limited download links from swappable object storage (local filesystem, GCS)
//! - redb embedded database for records (ACID, MVCC, crash-safe)

pub mod api;
pub mod config;
pub mod grouping;
pub mod manifest;
pub mod object_store;
pub mod projection;
pub mod state_machine;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use object_store::{LocalStore, ObjectGateway};
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub objects: ObjectGateway,
    /// Set when the local backend serves its own signed download links.
    pub local_objects: Option<Arc<LocalStore>>,
}
