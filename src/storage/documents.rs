use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{DocumentFilter, DocumentRecord, MetadataPatch};
use super::tables::*;
use crate::manifest::FileManifest;
use crate::state_machine::{LifecycleStatus, Transition};

/// Result of an owner edit.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub document: DocumentRecord,
    /// Keys dropped from the manifest by the replace-per-category merge.
    pub superseded: Vec<String>,
}

fn load(write_txn: &WriteTransaction, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
    let table = write_txn.open_table(DOCUMENTS)?;
    let result: Option<DocumentRecord> = match table.get(id)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

fn store(write_txn: &WriteTransaction, doc: &DocumentRecord) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(DOCUMENTS)?;
    let data = rmp_serde::to_vec_named(doc)?;
    table.insert(doc.id.as_str(), data.as_slice())?;
    Ok(())
}

/// Point each key at `doc_id`. A key already owned by another document is a conflict.
fn index_keys<'a>(
    write_txn: &WriteTransaction,
    doc_id: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(OBJECT_KEYS)?;
    for key in keys {
        let existing = table.get(key)?.map(|v| v.value().to_string());
        if let Some(owner) = existing {
            if owner != doc_id {
                return Err(DatabaseError::KeyConflict {
                    key: key.to_string(),
                    owner,
                });
            }
        }
        table.insert(key, doc_id)?;
    }
    Ok(())
}

fn unindex_keys<'a>(
    write_txn: &WriteTransaction,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(OBJECT_KEYS)?;
    for key in keys {
        table.remove(key)?;
    }
    Ok(())
}

fn owner_ids(write_txn: &WriteTransaction, owner: &str) -> Result<Vec<String>, DatabaseError> {
    let table = write_txn.open_table(OWNER_DOCUMENTS)?;
    let ids: Vec<String> = match table.get(owner)? {
        Some(data) => rmp_serde::from_slice(data.value())?,
        None => Vec::new(),
    };
    Ok(ids)
}

fn store_owner_ids(
    write_txn: &WriteTransaction,
    owner: &str,
    ids: &[String],
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(OWNER_DOCUMENTS)?;
    if ids.is_empty() {
        table.remove(owner)?;
    } else {
        let data = rmp_serde::to_vec_named(ids)?;
        table.insert(owner, data.as_slice())?;
    }
    Ok(())
}

impl Database {
    // ========================================================================
    // Document operations
    // ========================================================================

    /// Insert a new document row together with its key and owner index entries.
    pub fn create_document(&self, doc: &DocumentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!doc.id.is_empty(), "document id must not be empty");

        self.write(|write_txn| {
            store(write_txn, doc)?;
            index_keys(write_txn, &doc.id, doc.file_paths.keys())?;

            let mut ids = owner_ids(write_txn, &doc.submitted_by)?;
            if !ids.contains(&doc.id) {
                ids.push(doc.id.clone());
                store_owner_ids(write_txn, &doc.submitted_by, &ids)?;
            }
            Ok(())
        })
    }

    /// Get a document by id
    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        match table.get(id)? {
            Some(data) => {
                let doc: DocumentRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Owner edit: patch metadata, merge new uploads per category, and send
    /// the document back to review. Refused while approved.
    pub fn update_document(
        &self,
        id: &str,
        patch: MetadataPatch,
        delta: FileManifest,
    ) -> Result<Option<UpdateOutcome>, DatabaseError> {
        self.write(|write_txn| {
            let Some(mut doc) = load(write_txn, id)? else {
                return Ok(None);
            };

            let next = doc.review_state().apply(Transition::Resubmit)?;
            doc.set_review_state(next);

            patch.apply_to(&mut doc.metadata);
            let incoming: Vec<String> = delta.keys().map(str::to_string).collect();
            let superseded = doc.file_paths.merge_replace(delta);
            doc.updated_at = chrono::Utc::now();

            unindex_keys(write_txn, superseded.iter().map(String::as_str))?;
            index_keys(write_txn, &doc.id, incoming.iter().map(String::as_str))?;
            store(write_txn, &doc)?;

            Ok(Some(UpdateOutcome {
                document: doc,
                superseded,
            }))
        })
    }

    /// Apply a review transition (approve, reject, toggle visibility).
    pub fn review_document(
        &self,
        id: &str,
        transition: Transition,
        reviewer: &str,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        self.write(|write_txn| {
            let Some(mut doc) = load(write_txn, id)? else {
                return Ok(None);
            };

            let next = doc.review_state().apply(transition)?;
            doc.set_review_state(next);

            let now = chrono::Utc::now();
            if matches!(transition, Transition::Approve | Transition::Reject) {
                doc.reviewed_by = Some(reviewer.to_string());
                doc.reviewed_at = Some(now);
            }
            doc.updated_at = now;

            store(write_txn, &doc)?;
            Ok(Some(doc))
        })
    }

    /// Archive or restore a document without touching its review state.
    pub fn set_lifecycle(
        &self,
        id: &str,
        status: LifecycleStatus,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        self.write(|write_txn| {
            let Some(mut doc) = load(write_txn, id)? else {
                return Ok(None);
            };
            doc.status = status;
            doc.updated_at = chrono::Utc::now();
            store(write_txn, &doc)?;
            Ok(Some(doc))
        })
    }

    /// Remove the row and its index entries. Stored objects are left for the
    /// orphan sweep.
    pub fn delete_document(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        self.write(|write_txn| {
            let Some(doc) = load(write_txn, id)? else {
                return Ok(None);
            };

            {
                let mut table = write_txn.open_table(DOCUMENTS)?;
                table.remove(id)?;
            }
            unindex_keys(write_txn, doc.file_paths.keys())?;

            let mut ids = owner_ids(write_txn, &doc.submitted_by)?;
            ids.retain(|d| d != id);
            store_owner_ids(write_txn, &doc.submitted_by, &ids)?;

            Ok(Some(doc))
        })
    }

    /// Get all documents
    pub fn get_all_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        let mut docs = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let doc: DocumentRecord = rmp_serde::from_slice(value.value())?;
            docs.push(doc);
        }

        Ok(docs)
    }

    /// Filtered listing, newest first.
    pub fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let mut docs: Vec<DocumentRecord> = self
            .get_all_documents()?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    /// Documents submitted by one caller, in submission order.
    pub fn get_documents_by_owner(
        &self,
        owner: &str,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_DOCUMENTS)?;
        let documents = read_txn.open_table(DOCUMENTS)?;

        let ids: Vec<String> = match owner_table.get(owner)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut docs = Vec::new();
        for id in ids {
            if let Some(data) = documents.get(id.as_str())? {
                let doc: DocumentRecord = rmp_serde::from_slice(data.value())?;
                docs.push(doc);
            }
        }

        Ok(docs)
    }

    /// Resolve an object key to the document whose manifest references it.
    pub fn get_document_by_key(&self, key: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let key_table = read_txn.open_table(OBJECT_KEYS)?;

        let id = match key_table.get(key)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let documents = read_txn.open_table(DOCUMENTS)?;
        match documents.get(id.as_str())? {
            Some(data) => {
                let doc: DocumentRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Check if any document references an object key
    pub fn key_is_referenced(&self, key: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(OBJECT_KEYS)?;
        Ok(table.get(key)?.is_some())
    }
}
