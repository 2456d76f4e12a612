//! In-memory storage backend, optionally persisted to a snapshot file.

use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io,
    path::Path,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::audit::AuditLog;
use super::{Change, Changeset, Constraint, DbError, Filter, Storage, models};

/// Storage backend keeping all records in memory.
///
/// Records are kept in insertion order, and listings return them in reverse.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct State {
    users: Vec<models::User>,
    submissions: Vec<models::Submission>,
    reviews: Vec<models::Review>,
    payments: Vec<models::Payment>,
    notifications: Vec<models::Notification>,
    audit: Vec<models::AuditEntry>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Load state from a snapshot file.
    ///
    /// A missing file results in an empty storage.
    pub fn open(path: &Path) -> Result<MemoryStorage, SnapshotError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", path.display());
                return Ok(MemoryStorage::new());
            }
            Err(err) => return Err(err.into()),
        };

        let state = rmps::from_read_ref(&data)?;

        Ok(MemoryStorage {
            state: RwLock::new(state),
        })
    }

    /// Write current state to a snapshot file.
    ///
    /// The file is replaced atomically.
    pub fn persist(&self, path: &Path) -> Result<(), SnapshotError> {
        let data = {
            let state = self.state.read()
                .map_err(|_| SnapshotError::Poisoned)?;
            rmps::to_vec(&*state)?
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        io::Write::write_all(&mut file, &data)?;
        file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<State>, DbError> {
        self.state.read()
            .map_err(|_| DbError::Unavailable("state lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<State>, DbError> {
        self.state.write()
            .map_err(|_| DbError::Unavailable("state lock poisoned".into()))
    }
}

#[derive(Debug, Fail)]
pub enum SnapshotError {
    #[fail(display = "Cannot access snapshot: {}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "Cannot decode snapshot: {}", _0)]
    Decode(#[cause] rmps::decode::Error),
    #[fail(display = "Cannot encode snapshot: {}", _0)]
    Encode(#[cause] rmps::encode::Error),
    #[fail(display = "State lock poisoned")]
    Poisoned,
}

impl_from! { for SnapshotError ;
    io::Error => |e| SnapshotError::Io(e),
    rmps::decode::Error => |e| SnapshotError::Decode(e),
    rmps::encode::Error => |e| SnapshotError::Encode(e),
}

/// Find a record by ID.
fn find<T, F>(records: &[T], id: Uuid, key: F) -> Result<T, DbError>
where
    T: Clone,
    F: Fn(&T) -> Uuid,
{
    records.iter()
        .find(|r| key(r) == id)
        .cloned()
        .ok_or(DbError::NotFound)
}

/// List records matching a predicate, newest first.
fn list<T, F>(records: &[T], pred: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    records.iter().rev().filter(|r| pred(r)).cloned().collect()
}

/// Replace a stored record with a newer version of it.
fn update<T, K, V>(records: &mut [T], mut record: T, key: K, version: V)
-> Result<(), DbError>
where
    K: Fn(&T) -> Uuid,
    V: Fn(&mut T) -> &mut u32,
{
    let id = key(&record);
    let stored = records.iter_mut()
        .find(|r| key(r) == id)
        .ok_or(DbError::NotFound)?;

    if *version(stored) != *version(&mut record) {
        return Err(DbError::Conflict);
    }

    *version(&mut record) += 1;
    *stored = record;

    Ok(())
}

impl State {
    fn apply(&mut self, change: Change) -> Result<(), DbError> {
        match change {
            Change::InsertUser(user) => {
                if self.users.iter().any(|u| u.email == user.email) {
                    return Err(DbError::UniqueViolation(Constraint::UserEmail));
                }
                self.users.push(user);
            }
            Change::UpdateUser(user) => {
                if self.users.iter().any(|u| u.id != user.id && u.email == user.email) {
                    return Err(DbError::UniqueViolation(Constraint::UserEmail));
                }
                update(&mut self.users, user, |u| u.id, |u| &mut u.version)?;
            }
            Change::InsertSubmission(submission) => {
                if self.submissions.iter()
                    .any(|s| s.journal_id == submission.journal_id) {
                    return Err(DbError::UniqueViolation(Constraint::JournalId));
                }
                self.submissions.push(submission);
            }
            Change::UpdateSubmission(submission) => update(
                &mut self.submissions, submission, |s| s.id, |s| &mut s.version)?,
            Change::DeleteSubmission(id) => {
                let before = self.submissions.len();
                self.submissions.retain(|s| s.id != id);
                if self.submissions.len() == before {
                    return Err(DbError::NotFound);
                }
            }
            Change::InsertReview(review) => {
                if self.reviews.iter().any(|r| r.submission == review.submission
                    && r.reviewer == review.reviewer) {
                    return Err(DbError::UniqueViolation(
                        Constraint::ReviewAssignment));
                }
                self.reviews.push(review);
            }
            Change::UpdateReview(review) => update(
                &mut self.reviews, review, |r| r.id, |r| &mut r.version)?,
            Change::DeleteReviews(submission) =>
                self.reviews.retain(|r| r.submission != submission),
            Change::InsertPayment(payment) => self.payments.push(payment),
            Change::UpdatePayment(payment) => update(
                &mut self.payments, payment, |p| p.id, |p| &mut p.version)?,
            Change::DeletePayments(submission) =>
                self.payments.retain(|p| p.submission != submission),
        }

        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn user(&self, id: Uuid) -> Result<models::User, DbError> {
        find(&self.read()?.users, id, |u| u.id)
    }

    fn user_by_email(&self, email: &str) -> Result<models::User, DbError> {
        self.read()?.users.iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    fn users(&self) -> Result<Vec<models::User>, DbError> {
        Ok(list(&self.read()?.users, |_| true))
    }

    fn submission(&self, id: Uuid) -> Result<models::Submission, DbError> {
        find(&self.read()?.submissions, id, |s| s.id)
    }

    fn submission_by_journal_id(&self, journal_id: &str)
    -> Result<models::Submission, DbError> {
        self.read()?.submissions.iter()
            .find(|s| s.journal_id == journal_id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    fn submissions(&self, filter: Filter)
    -> Result<Vec<models::Submission>, DbError> {
        Ok(list(&self.read()?.submissions, |s| match filter {
            Filter::All => true,
            Filter::BySubmission(id) => s.id == id,
            Filter::ByUser(id) => s.author == id,
        }))
    }

    fn review(&self, id: Uuid) -> Result<models::Review, DbError> {
        find(&self.read()?.reviews, id, |r| r.id)
    }

    fn reviews(&self, filter: Filter) -> Result<Vec<models::Review>, DbError> {
        Ok(list(&self.read()?.reviews, |r| match filter {
            Filter::All => true,
            Filter::BySubmission(id) => r.submission == id,
            Filter::ByUser(id) => r.reviewer == id,
        }))
    }

    fn payment(&self, id: Uuid) -> Result<models::Payment, DbError> {
        find(&self.read()?.payments, id, |p| p.id)
    }

    fn payments(&self, filter: Filter) -> Result<Vec<models::Payment>, DbError> {
        Ok(list(&self.read()?.payments, |p| match filter {
            Filter::All => true,
            Filter::BySubmission(id) => p.submission == id,
            Filter::ByUser(id) => p.author == id,
        }))
    }

    fn insert_notification(&self, notification: models::Notification)
    -> Result<(), DbError> {
        self.write()?.notifications.push(notification);
        Ok(())
    }

    fn notifications(&self, user: Uuid, limit: usize)
    -> Result<Vec<models::Notification>, DbError> {
        Ok(self.read()?.notifications.iter()
            .rev()
            .filter(|n| n.user == user)
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_notifications_read(&self, user: Uuid, id: Option<Uuid>)
    -> Result<usize, DbError> {
        let mut state = self.write()?;
        let mut changed = 0;

        for notification in state.notifications.iter_mut()
            .filter(|n| n.user == user && n.is_unread)
            .filter(|n| id.map_or(true, |id| n.id == id))
        {
            notification.is_unread = false;
            changed += 1;
        }

        Ok(changed)
    }

    fn commit(&self, changes: Changeset) -> Result<(), DbError> {
        let mut state = self.write()?;
        let mut next = state.clone();

        for change in changes.into_changes() {
            next.apply(change)?;
        }

        *state = next;
        Ok(())
    }
}

impl AuditLog for MemoryStorage {
    fn record(&self, entry: models::AuditEntry) -> Result<(), DbError> {
        self.write()?.audit.push(entry);
        Ok(())
    }

    fn entries(&self, search: Option<&str>, offset: usize, limit: usize)
    -> Result<(Vec<models::AuditEntry>, usize), DbError> {
        let state = self.read()?;
        let search = search.map(str::to_lowercase);
        let matching = state.audit.iter()
            .rev()
            .filter(|e| match search {
                Some(ref search) => e.action.to_lowercase().contains(search),
                None => true,
            })
            .collect::<Vec<_>>();
        let total = matching.len();
        let page = matching.into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        db::types::{ReviewStatus, Role, Status},
        ledger::{Entry, Timeline},
    };
    use super::*;

    fn user(email: &str) -> models::User {
        models::User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: email.into(),
            role: Role::Author,
            phone: None,
            institution: None,
            department: None,
            specialization: None,
            available: true,
            active: true,
            portal_disabled: false,
            disabled_reason: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    fn submission(author: Uuid, journal_id: &str) -> models::Submission {
        models::Submission {
            id: Uuid::new_v4(),
            journal_id: journal_id.into(),
            author,
            title: "Title".into(),
            summary: "Abstract".into(),
            keywords: Vec::new(),
            domain: None,
            cover_letter: None,
            co_authors: Vec::new(),
            manuscript: None,
            file_type: None,
            status: Status::Submitted,
            timeline: Timeline::seeded(
                Entry::new(Status::Submitted, "note".into(), author)),
            assigned_reviewer: None,
            revision: None,
            editor_note: None,
            reviewer_comment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    fn review(submission: Uuid, reviewer: Uuid) -> models::Review {
        models::Review {
            id: Uuid::new_v4(),
            submission,
            reviewer,
            decision: None,
            comments: None,
            recommendation: None,
            comment_file: None,
            status: ReviewStatus::Pending,
            completed_at: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = MemoryStorage::new();
        db.commit(Change::InsertUser(user("a@example.com")).into()).unwrap();

        match db.commit(Change::InsertUser(user("a@example.com")).into()) {
            Err(DbError::UniqueViolation(Constraint::UserEmail)) => (),
            r => panic!("unexpected result: {:?}", r),
        }

        assert_eq!(db.users().unwrap().len(), 1);
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let db = MemoryStorage::new();
        let author = user("a@example.com");
        let first = submission(author.id, "J-1");
        db.commit(Change::InsertSubmission(first.clone()).into()).unwrap();

        let second = submission(author.id, "J-2");
        let changes = Changeset::new()
            .with(Change::InsertSubmission(second.clone()))
            .with(Change::InsertSubmission(submission(author.id, "J-1")));

        match db.commit(changes) {
            Err(DbError::UniqueViolation(Constraint::JournalId)) => (),
            r => panic!("unexpected result: {:?}", r),
        }

        assert!(db.submission(second.id).is_err());
        assert_eq!(db.submissions(Filter::All).unwrap().len(), 1);
    }

    #[test]
    fn stale_update_conflicts() {
        let db = MemoryStorage::new();
        let record = submission(Uuid::new_v4(), "J-1");
        db.commit(Change::InsertSubmission(record.clone()).into()).unwrap();

        let mut first = record.clone();
        first.title = "First".into();
        db.commit(Change::UpdateSubmission(first).into()).unwrap();

        let mut second = record.clone();
        second.title = "Second".into();
        match db.commit(Change::UpdateSubmission(second).into()) {
            Err(DbError::Conflict) => (),
            r => panic!("unexpected result: {:?}", r),
        }

        let stored = db.submission(record.id).unwrap();
        assert_eq!(stored.title, "First");
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn review_pair_unique() {
        let db = MemoryStorage::new();
        let (submission, reviewer) = (Uuid::new_v4(), Uuid::new_v4());
        db.commit(Change::InsertReview(review(submission, reviewer)).into())
            .unwrap();

        match db.commit(Change::InsertReview(review(submission, reviewer)).into()) {
            Err(DbError::UniqueViolation(Constraint::ReviewAssignment)) => (),
            r => panic!("unexpected result: {:?}", r),
        }

        db.commit(Change::InsertReview(review(submission, Uuid::new_v4())).into())
            .unwrap();
        assert_eq!(db.reviews(Filter::BySubmission(submission)).unwrap().len(), 2);
    }

    #[test]
    fn listings_newest_first() {
        let db = MemoryStorage::new();
        let author = Uuid::new_v4();

        for inx in 0..3 {
            let record = submission(author, &format!("J-{}", inx));
            db.commit(Change::InsertSubmission(record).into()).unwrap();
        }

        let ids = db.submissions(Filter::ByUser(author)).unwrap()
            .into_iter()
            .map(|s| s.journal_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["J-2", "J-1", "J-0"]);
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");

        let db = MemoryStorage::open(&path).unwrap();
        let author = user("a@example.com");
        db.commit(Change::InsertUser(author.clone()).into()).unwrap();
        db.commit(Change::InsertSubmission(submission(author.id, "J-1")).into())
            .unwrap();
        db.persist(&path).unwrap();

        let db = MemoryStorage::open(&path).unwrap();
        assert_eq!(db.user_by_email("a@example.com").unwrap().id, author.id);
        let stored = db.submission_by_journal_id("J-1").unwrap();
        assert_eq!(stored.timeline.len(), 1);
    }
}
