//! Review workflow for submitted documents.
//!
//! Two axes: the approval status (pending / approved / rejected) and the
//! `is_active` visibility flag, which only carries meaning once approved.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        })
    }
}

/// Lifecycle flag for archival, independent of review and visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    /// The owner edited the document; sends it back to review.
    Resubmit,
    SetActive(bool),
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Approve => f.write_str("approve"),
            Transition::Reject => f.write_str("reject"),
            Transition::Resubmit => f.write_str("resubmit"),
            Transition::SetActive(v) => write!(f, "set active to {v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {transition} a document that is {from}")]
pub struct TransitionError {
    pub from: ApprovalStatus,
    pub transition: Transition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
}

impl ReviewState {
    /// Apply a transition, returning the next state or the reason it is illegal.
    pub fn apply(self, transition: Transition) -> Result<ReviewState, TransitionError> {
        use ApprovalStatus::*;

        let next = match (self.approval_status, transition) {
            (Pending, Transition::Approve) => ReviewState {
                approval_status: Approved,
                is_active: true,
            },
            (Pending, Transition::Reject) => ReviewState {
                approval_status: Rejected,
                is_active: false,
            },
            (Pending | Rejected, Transition::Resubmit) => ReviewState {
                approval_status: Pending,
                is_active: false,
            },
            (Approved, Transition::SetActive(is_active)) => ReviewState {
                approval_status: Approved,
                is_active,
            },
            (from, transition) => return Err(TransitionError { from, transition }),
        };
        Ok(next)
    }

    /// Whether the public listing may show a document in this state.
    pub fn is_visible(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved && self.is_active
    }
}
