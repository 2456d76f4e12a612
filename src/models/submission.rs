use chrono::Utc;
use failure::Fail;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::{
    db::{
        Change,
        Changeset,
        Constraint,
        DbError,
        Filter,
        Storage,
        models::{self as db, CoAuthor, FileRef},
        types::Status,
    },
    error::ApiError,
    ledger::{Entry, Timeline},
};
use super::journal_id;

/// A manuscript submitted for publication.
///
/// Submissions can only be changed through [`crate::lifecycle`].
#[derive(Clone, Debug)]
pub struct Submission {
    data: db::Submission,
}

/// Metadata of a new submission.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewSubmission {
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub co_authors: Vec<CoAuthor>,
}

/// Files attached to a submission.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// The manuscript as originally submitted.
    Main,
    /// Latest revision uploaded by the author.
    Revision,
    /// Comment file of the latest completed review.
    ReviewerComment,
}

impl FromStr for FileKind {
    type Err = ParseFileKindError;

    fn from_str(v: &str) -> Result<FileKind, ParseFileKindError> {
        match v {
            "main" => Ok(FileKind::Main),
            "revision" => Ok(FileKind::Revision),
            "reviewer_comment" => Ok(FileKind::ReviewerComment),
            _ => Err(ParseFileKindError(v.to_string())),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            FileKind::Main => "main",
            FileKind::Revision => "revision",
            FileKind::ReviewerComment => "reviewer_comment",
        })
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "submission:file:invalid-kind", status = "BAD_REQUEST")]
#[fail(display = "Invalid file kind: {}", _0)]
pub struct ParseFileKindError(pub String);

impl Submission {
    /// Construct `Submission` from its database counterpart.
    pub(crate) fn from_db(data: db::Submission) -> Submission {
        Submission { data }
    }

    /// Unpack database data.
    pub fn into_db(self) -> db::Submission {
        self.data
    }

    /// Find a submission by ID.
    pub fn by_id(db: &dyn Storage, id: Uuid)
    -> Result<Submission, FindSubmissionError> {
        db.submission(id).map(Submission::from_db).map_err(Into::into)
    }

    /// Find a submission by its journal ID.
    pub fn by_journal_id(db: &dyn Storage, journal_id: &str)
    -> Result<Submission, FindSubmissionError> {
        db.submission_by_journal_id(journal_id)
            .map(Submission::from_db)
            .map_err(Into::into)
    }

    /// Get all submissions, newest first.
    pub fn all(db: &dyn Storage) -> Result<Vec<Submission>, DbError> {
        db.submissions(Filter::All)
            .map(|v| v.into_iter().map(Submission::from_db).collect())
    }

    /// Get all submissions by an author, newest first.
    pub fn by_author(db: &dyn Storage, author: Uuid)
    -> Result<Vec<Submission>, DbError> {
        db.submissions(Filter::ByUser(author))
            .map(|v| v.into_iter().map(Submission::from_db).collect())
    }

    /// Create and store a new submission.
    ///
    /// A fresh journal ID is generated for as long as the generated one is
    /// already taken, up to [`journal_id::MAX_ATTEMPTS`] times.
    pub(crate) fn create(
        db: &dyn Storage,
        prefix: &str,
        author: Uuid,
        new: NewSubmission,
        manuscript: FileRef,
        first: Entry,
    ) -> Result<Submission, DbError> {
        Submission::create_with_rng(
            db, &mut rand::thread_rng(), prefix, author, new, manuscript, first)
    }

    /// Like [`Submission::create`], drawing journal IDs from `rng`.
    pub(crate) fn create_with_rng<R: Rng + ?Sized>(
        db: &dyn Storage,
        rng: &mut R,
        prefix: &str,
        author: Uuid,
        new: NewSubmission,
        manuscript: FileRef,
        first: Entry,
    ) -> Result<Submission, DbError> {
        let file_type = std::path::Path::new(&manuscript.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        let mut data = db::Submission {
            id: Uuid::new_v4(),
            journal_id: String::new(),
            author,
            title: new.title,
            summary: new.summary,
            keywords: new.keywords,
            domain: new.domain,
            cover_letter: new.cover_letter,
            co_authors: new.co_authors,
            manuscript: Some(manuscript),
            file_type,
            status: first.status,
            created_at: first.timestamp,
            updated_at: first.timestamp,
            timeline: Timeline::seeded(first),
            assigned_reviewer: None,
            revision: None,
            editor_note: None,
            reviewer_comment: None,
            version: 0,
        };

        let mut attempt = 0;

        loop {
            attempt += 1;
            data.journal_id = journal_id::generate(rng, prefix);

            match db.commit(Change::InsertSubmission(data.clone()).into()) {
                Ok(()) => return Ok(Submission::from_db(data)),
                Err(DbError::UniqueViolation(Constraint::JournalId))
                if attempt < journal_id::MAX_ATTEMPTS => {
                    debug!("Journal ID {} already taken, regenerating",
                        data.journal_id);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Create a copy of this submission with an entry appended to its
    /// timeline and its status set to that of the entry.
    pub(crate) fn transitioned(&self, entry: Entry) -> Submission {
        let mut data = self.data.clone();
        data.status = entry.status;
        data.updated_at = entry.timestamp;
        data.timeline = data.timeline.appended(entry);
        Submission { data }
    }

    pub(crate) fn assign_reviewer(&mut self, reviewer: Uuid) {
        self.data.assigned_reviewer = Some(reviewer);
    }

    pub(crate) fn set_editor_note(&mut self, note: String) {
        self.data.editor_note = Some(note);
    }

    pub(crate) fn set_revision(&mut self, file: FileRef) {
        self.data.revision = Some(file);
    }

    pub(crate) fn set_reviewer_comment(&mut self, file: FileRef) {
        self.data.reviewer_comment = Some(file);
    }

    /// Store this submission, together with other changes.
    ///
    /// The update is applied after all other changes in `extra`.
    pub(crate) fn save(&mut self, db: &dyn Storage, extra: Changeset)
    -> Result<(), DbError> {
        let changes = extra.with(Change::UpdateSubmission(self.data.clone()));
        db.commit(changes)?;
        self.data.version += 1;
        Ok(())
    }

    /// Get a file attached to this submission.
    pub fn file(&self, kind: FileKind) -> Option<&FileRef> {
        match kind {
            FileKind::Main => self.data.manuscript.as_ref(),
            FileKind::Revision => self.data.revision.as_ref(),
            FileKind::ReviewerComment => self.data.reviewer_comment.as_ref(),
        }
    }

    /// All files attached to this submission.
    pub fn files(&self) -> Vec<&FileRef> {
        [FileKind::Main, FileKind::Revision, FileKind::ReviewerComment]
            .iter()
            .filter_map(|&kind| self.file(kind))
            .collect()
    }
}

impl std::ops::Deref for Submission {
    type Target = db::Submission;

    fn deref(&self) -> &db::Submission {
        &self.data
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum FindSubmissionError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    #[fail(display = "No such submission")]
    #[api(code = "submission:not-found", status = "NOT_FOUND")]
    NotFound,
}

impl_from! { for FindSubmissionError ;
    DbError => |e| match e {
        DbError::NotFound => FindSubmissionError::NotFound,
        e => FindSubmissionError::Internal(e),
    },
}
