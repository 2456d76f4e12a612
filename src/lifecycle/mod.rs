//! Submission lifecycle.
//!
//! [`Lifecycle`] is the single entry point for every externally triggered
//! operation. Each operation runs the role gate, computes new state with the
//! [`transition`] engine, commits all resulting changes atomically, and then
//! notifies affected users and records the action in the audit log. Neither
//! notifications nor audit entries can fail an operation.

use failure::Fail;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    audit::{self, Action, AuditLog, RequestMeta},
    config,
    db::{DbError, Storage},
    error::ApiError,
    events::{self, Event, Notifier},
    files::FileStore,
    models::{
        journal_id,
        submission::FindSubmissionError,
        user::FindUserError,
        Submission,
        User,
    },
    permissions::GateError,
};

pub mod transition;

mod admin;
mod inbox;
mod payment;
mod review;
mod submission;

pub use self::{
    admin::{
        AUDIT_PAGE_SIZE,
        AuditPage,
        ManageUserError,
        Stats,
    },
    payment::{CreatePaymentError, VerifyPaymentError},
    review::{AssignedReview, SubmitReviewError, ToggleAvailabilityError},
    submission::{
        AssignReviewerError,
        CreateSubmissionError,
        DeleteSubmissionError,
        DownloadError,
        ForwardCommentError,
        SubmissionDetails,
        UpdateStatusError,
        UploadRevisionError,
        ViewSubmissionError,
    },
    transition::{TransitionError, TransitionPolicy},
};

/// User on whose behalf an operation is performed.
#[derive(Clone, Debug)]
pub struct Caller {
    pub user: User,
    pub meta: RequestMeta,
}

impl Caller {
    pub fn new(user: User) -> Caller {
        Caller {
            user,
            meta: RequestMeta::default(),
        }
    }

    /// Load the calling user.
    pub fn load(db: &dyn Storage, id: Uuid, meta: RequestMeta)
    -> Result<Caller, FindUserError> {
        Ok(Caller {
            user: User::by_id(db, id)?,
            meta,
        })
    }

    pub fn with_meta(self, meta: RequestMeta) -> Caller {
        Caller { meta, ..self }
    }
}

/// Submission lifecycle orchestrator.
pub struct Lifecycle {
    db: Arc<dyn Storage>,
    files: Arc<dyn FileStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    policy: TransitionPolicy,
    journal_prefix: String,
}

impl Lifecycle {
    pub fn new(
        db: Arc<dyn Storage>,
        files: Arc<dyn FileStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
    ) -> Lifecycle {
        Lifecycle {
            db,
            files,
            notifier,
            audit,
            policy: TransitionPolicy::permissive(),
            journal_prefix: journal_id::DEFAULT_PREFIX.to_string(),
        }
    }

    /// Apply policy and journal settings from configuration.
    pub fn configure(self, config: &config::Config) -> Lifecycle {
        self.with_policy(config.lifecycle.policy())
            .with_journal_prefix(config.journal.prefix.clone())
    }

    pub fn with_policy(self, policy: TransitionPolicy) -> Lifecycle {
        Lifecycle { policy, ..self }
    }

    pub fn with_journal_prefix(self, journal_prefix: String) -> Lifecycle {
        Lifecycle { journal_prefix, ..self }
    }

    pub fn storage(&self) -> &dyn Storage {
        &*self.db
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    fn submission(&self, id: Uuid) -> Result<Submission, FindSubmissionError> {
        Submission::by_id(&*self.db, id)
    }

    fn notify(&self, user: Uuid, event: Event) {
        events::notify(&*self.notifier, user, event)
    }

    fn audit<D: Serialize>(&self, caller: &Caller, action: Action, details: D) {
        audit::log(&*self.audit, &caller.user.actor(), action, details,
            &caller.meta)
    }

    /// Remove a stored file which is no longer referenced.
    fn discard(&self, file: &crate::files::FileRef) {
        if let Err(err) = self.files.delete(file) {
            warn!("Could not remove file {}: {}", file.path, err);
        }
    }
}

/// Failure of the storage collaborator.
#[derive(ApiError, Debug, Fail)]
pub enum StorageError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    /// A record was changed by another operation since it was read.
    #[fail(display = "Record was modified concurrently")]
    #[api(code = "record:concurrent-modification", status = "CONFLICT")]
    ConcurrentModification,
}

impl_from! { for StorageError ;
    DbError => |e| match e {
        DbError::Conflict => StorageError::ConcurrentModification,
        e => StorageError::Internal(e),
    },
}

/// Failure of a read-only operation.
#[derive(ApiError, Debug, Fail, From)]
pub enum QueryError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for QueryError ;
    DbError => |e| QueryError::Storage(e.into()),
}

#[cfg(test)]
mod tests {
    use crate::error::StatusCode;
    use super::*;

    #[test]
    fn conflicts_are_not_tied_to_a_record_kind() {
        let err = StorageError::from(DbError::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code().unwrap(), "record:concurrent-modification");

        let err = QueryError::from(DbError::Conflict);
        assert_eq!(err.code().unwrap(), "record:concurrent-modification");
    }
}
