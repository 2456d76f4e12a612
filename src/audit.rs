//! Audit log.
//!
//! Every externally triggered operation which changes state leaves a record
//! of who did it, what they did and where the request came from. Failure to
//! record an entry is logged but never fails the operation itself.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::db::{DbError, models::AuditEntry, types::Role};

/// Maximal length (in characters) of a stored user agent string.
pub const USER_AGENT_LIMIT: usize = 500;

/// Entity responsible for an action.
#[derive(Clone, Debug)]
pub enum Actor {
    /// System. This actor is used for actions carried automatically by the
    /// system, and actions invoked from the CLI.
    System,
    /// A user.
    User {
        id: Uuid,
        email: String,
        role: Role,
    },
}

/// Kinds of audited actions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    SubmissionCreated,
    StatusUpdated,
    ReviewerAssigned,
    CommentForwarded,
    RevisionUploaded,
    ReviewSubmitted,
    PaymentSubmitted,
    PaymentVerified,
    SubmissionDeleted,
    UserCreated,
    UserUpdated,
    PortalDisabled,
    PortalEnabled,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::SubmissionCreated => "SUBMISSION_CREATED",
            Action::StatusUpdated => "STATUS_UPDATED",
            Action::ReviewerAssigned => "REVIEWER_ASSIGNED",
            Action::CommentForwarded => "COMMENT_FORWARDED",
            Action::RevisionUploaded => "REVISION_UPLOADED",
            Action::ReviewSubmitted => "REVIEW_SUBMITTED",
            Action::PaymentSubmitted => "PAYMENT_SUBMITTED",
            Action::PaymentVerified => "PAYMENT_VERIFIED",
            Action::SubmissionDeleted => "SUBMISSION_DELETED",
            Action::UserCreated => "USER_CREATED",
            Action::UserUpdated => "USER_UPDATED",
            Action::PortalDisabled => "PORTAL_DISABLED",
            Action::PortalEnabled => "PORTAL_ENABLED",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Information about the request which caused an action.
#[derive(Clone, Debug, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> RequestMeta {
        RequestMeta {
            ip,
            user_agent: user_agent.map(|ua| match ua.char_indices()
                .nth(USER_AGENT_LIMIT)
            {
                Some((end, _)) => ua[..end].to_string(),
                None => ua,
            }),
        }
    }
}

/// Storage for audit entries.
pub trait AuditLog: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), DbError>;

    /// Entries, newest first, optionally only those whose action contains
    /// `search` (case-insensitive). Returns a page of entries and the total
    /// number of matching entries.
    fn entries(&self, search: Option<&str>, offset: usize, limit: usize)
    -> Result<(Vec<AuditEntry>, usize), DbError>;
}

/// Store an event in the audit log.
pub fn log<D>(
    audit: &dyn AuditLog,
    actor: &Actor,
    action: Action,
    details: D,
    meta: &RequestMeta,
)
where
    D: Serialize,
{
    let details = serde_json::to_value(details).unwrap_or_else(|err| {
        error!("Cannot serialize details of {}: {}", action, err);
        serde_json::Value::Null
    });

    let (id, email, role) = match *actor {
        Actor::System => (None, None, None),
        Actor::User { id, ref email, role } =>
            (Some(id), Some(email.clone()), Some(role)),
    };

    let entry = AuditEntry {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        actor: id,
        actor_email: email,
        actor_role: role,
        action: action.as_str().to_string(),
        details,
        ip_address: meta.ip.clone(),
        user_agent: meta.user_agent.clone(),
    };

    if let Err(err) = audit.record(entry) {
        error!("Cannot record {} in audit log: {}", action, err);
    }
}
