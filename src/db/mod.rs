//! Storage collaborator.
//!
//! The lifecycle never talks to a backend directly. It reads records through
//! [`Storage`] and writes them back as a [`Changeset`], which a backend must
//! apply atomically: either every change is stored or none is.

use failure::Fail;
use std::fmt;
use uuid::Uuid;

pub mod memory;
pub mod models;
pub mod types;

pub use self::memory::MemoryStorage;

#[derive(Debug, Fail)]
pub enum DbError {
    /// Record does not exist.
    #[fail(display = "Record not found")]
    NotFound,
    /// Change would break a uniqueness constraint.
    #[fail(display = "Duplicate value for {}", _0)]
    UniqueViolation(Constraint),
    /// Record was modified since it was read.
    #[fail(display = "Record was modified concurrently")]
    Conflict,
    /// Backend can't be used.
    #[fail(display = "Storage unavailable: {}", _0)]
    Unavailable(String),
}

/// Uniqueness constraints a backend must enforce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Constraint {
    /// Journal IDs of submissions.
    JournalId,
    /// Email addresses of users.
    UserEmail,
    /// Submission and reviewer pairs of reviews.
    ReviewAssignment,
}

impl fmt::Display for Constraint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            Constraint::JournalId => "journal id",
            Constraint::UserEmail => "user email",
            Constraint::ReviewAssignment => "review assignment",
        })
    }
}

/// Selection of records in a listing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    All,
    /// Records belonging to a submission.
    BySubmission(Uuid),
    /// Records belonging to a user: submissions and payments by author,
    /// reviews by reviewer.
    ByUser(Uuid),
}

/// Storage backend.
///
/// Listings are returned newest first.
pub trait Storage: Send + Sync {
    fn user(&self, id: Uuid) -> Result<models::User, DbError>;

    fn user_by_email(&self, email: &str) -> Result<models::User, DbError>;

    fn users(&self) -> Result<Vec<models::User>, DbError>;

    fn submission(&self, id: Uuid) -> Result<models::Submission, DbError>;

    fn submission_by_journal_id(&self, journal_id: &str)
    -> Result<models::Submission, DbError>;

    fn submissions(&self, filter: Filter)
    -> Result<Vec<models::Submission>, DbError>;

    fn review(&self, id: Uuid) -> Result<models::Review, DbError>;

    fn reviews(&self, filter: Filter) -> Result<Vec<models::Review>, DbError>;

    fn payment(&self, id: Uuid) -> Result<models::Payment, DbError>;

    fn payments(&self, filter: Filter) -> Result<Vec<models::Payment>, DbError>;

    fn insert_notification(&self, notification: models::Notification)
    -> Result<(), DbError>;

    /// Latest `limit` notifications of a user.
    fn notifications(&self, user: Uuid, limit: usize)
    -> Result<Vec<models::Notification>, DbError>;

    /// Mark a single notification, or all of user's notifications when `id`
    /// is `None`, as read. Returns number of notifications changed.
    fn mark_notifications_read(&self, user: Uuid, id: Option<Uuid>)
    -> Result<usize, DbError>;

    /// Apply all changes atomically.
    ///
    /// Updates must carry the version of the record they were derived from;
    /// if the stored version differs, the whole changeset is rejected with
    /// [`DbError::Conflict`]. Stored versions are incremented by one.
    fn commit(&self, changes: Changeset) -> Result<(), DbError>;
}

/// A single write.
#[derive(Clone, Debug)]
pub enum Change {
    InsertUser(models::User),
    UpdateUser(models::User),
    InsertSubmission(models::Submission),
    UpdateSubmission(models::Submission),
    DeleteSubmission(Uuid),
    InsertReview(models::Review),
    UpdateReview(models::Review),
    /// Delete all reviews of a submission.
    DeleteReviews(Uuid),
    InsertPayment(models::Payment),
    UpdatePayment(models::Payment),
    /// Delete all payments for a submission.
    DeletePayments(Uuid),
}

/// A list of writes to be applied together.
#[derive(Clone, Debug, Default)]
pub struct Changeset {
    changes: Vec<Change>,
}

impl Changeset {
    pub fn new() -> Changeset {
        Changeset::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Changeset {
        self.changes.push(change);
        self
    }

    pub fn with(mut self, change: Change) -> Changeset {
        self.changes.push(change);
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl From<Change> for Changeset {
    fn from(change: Change) -> Changeset {
        Changeset { changes: vec![change] }
    }
}
