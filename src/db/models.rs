//! Records as kept by a storage backend.
//!
//! These structures carry no behaviour; see [`crate::models`] for the types
//! the rest of the system works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Timeline;
use super::types::{
    Amount,
    Decision,
    PaymentStatus,
    ReviewStatus,
    Role,
    Severity,
    Status,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// User's email address. Unique among all users.
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    /// Reviewer's area of expertise.
    pub specialization: Option<String>,
    /// Is this reviewer accepting new assignments?
    pub available: bool,
    /// Inactive accounts can't perform any operation.
    pub active: bool,
    /// Accounts with portal access disabled can't perform any operation.
    pub portal_disabled: bool,
    pub disabled_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

/// Reference to a file kept in a [`crate::files::FileStore`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FileRef {
    /// Name under which the file is stored.
    pub path: String,
    /// Name of the file as uploaded.
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoAuthor {
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Submission {
    pub id: Uuid,
    /// Human-readable identifier, unique among all submissions.
    pub journal_id: String,
    pub author: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub keywords: Vec<String>,
    pub domain: Option<String>,
    pub cover_letter: Option<String>,
    pub co_authors: Vec<CoAuthor>,
    pub manuscript: Option<FileRef>,
    /// Extension of the manuscript file, without the leading dot.
    pub file_type: Option<String>,
    pub status: Status,
    pub timeline: Timeline,
    pub assigned_reviewer: Option<Uuid>,
    pub revision: Option<FileRef>,
    /// Last comment an editor forwarded to the author.
    pub editor_note: Option<String>,
    /// Comment file of the most recently completed review.
    pub reviewer_comment: Option<FileRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub submission: Uuid,
    pub reviewer: Uuid,
    pub decision: Option<Decision>,
    pub comments: Option<String>,
    pub recommendation: Option<String>,
    pub comment_file: Option<FileRef>,
    pub status: ReviewStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub submission: Uuid,
    pub author: Uuid,
    pub amount: Amount,
    /// Payment method, as declared by the author (UPI, bank transfer, ...).
    pub method: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Notification {
    pub id: Uuid,
    /// Recipient.
    pub user: Uuid,
    /// Kind of event this notification was created for.
    pub kind: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub is_unread: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// User responsible for the action, or `None` for the system.
    pub actor: Option<Uuid>,
    pub actor_email: Option<String>,
    pub actor_role: Option<Role>,
    pub action: String,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
