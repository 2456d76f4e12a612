use failure::Fail;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::Action,
    db::{
        Change,
        Changeset,
        Constraint,
        DbError,
        types::{Role, Status},
    },
    error::ApiError,
    events::Event,
    files::{FileError, FileRef, Upload},
    ledger::Entry,
    models::{
        submission::FindSubmissionError,
        user::FindUserError,
        FileKind,
        NewSubmission,
        Payment,
        Review,
        Submission,
        User,
    },
    permissions::{self, GateError, Operation},
};
use super::{
    Caller,
    Lifecycle,
    QueryError,
    StorageError,
    transition::{self, TransitionError},
};

/// A submission together with its reviews and payments.
#[derive(Clone, Debug)]
pub struct SubmissionDetails {
    pub submission: Submission,
    pub reviews: Vec<Review>,
    pub payments: Vec<Payment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionLog<'a> {
    journal_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reviewer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
}

impl<'a> SubmissionLog<'a> {
    fn new(journal_id: &'a str) -> Self {
        SubmissionLog {
            journal_id,
            title: None,
            status: None,
            note: None,
            reviewer_id: None,
            file_name: None,
        }
    }
}

impl Lifecycle {
    /// Submit a new manuscript.
    pub fn create_submission(
        &self,
        caller: &Caller,
        new: NewSubmission,
        manuscript: Option<Upload>,
    ) -> Result<Submission, CreateSubmissionError> {
        permissions::require(&caller.user, Operation::CreateSubmission)?;

        if new.title.trim().is_empty() {
            return Err(CreateSubmissionError::MissingField("title"));
        }

        if new.summary.trim().is_empty() {
            return Err(CreateSubmissionError::MissingField("abstract"));
        }

        let manuscript = manuscript.ok_or(CreateSubmissionError::MissingFile)?;
        let file = self.files.store(&manuscript)?;

        let first = Entry::new(
            Status::Submitted,
            "Manuscript submitted by author".to_string(),
            caller.user.id,
        );

        let submission = match Submission::create(
            &*self.db, &self.journal_prefix, caller.user.id, new, file.clone(),
            first)
        {
            Ok(submission) => submission,
            Err(err) => {
                self.discard(&file);
                return Err(err.into());
            }
        };

        info!("Submission {} created by {}", submission.journal_id,
            caller.user.id);

        self.notify(submission.author, Event::SubmissionReceived {
            title: submission.title.clone(),
            journal_id: submission.journal_id.clone(),
        });
        self.audit(caller, Action::SubmissionCreated, SubmissionLog {
            title: Some(submission.title.as_str()),
            ..SubmissionLog::new(&submission.journal_id)
        });

        Ok(submission)
    }

    /// Get caller's own submissions, newest first.
    pub fn my_submissions(&self, caller: &Caller)
    -> Result<Vec<Submission>, QueryError> {
        permissions::require(&caller.user, Operation::ViewOwnSubmissions)?;
        Ok(Submission::by_author(&*self.db, caller.user.id)?)
    }

    /// Get all submissions, newest first.
    pub fn all_submissions(&self, caller: &Caller)
    -> Result<Vec<Submission>, QueryError> {
        permissions::require(&caller.user, Operation::ViewAllSubmissions)?;
        Ok(Submission::all(&*self.db)?)
    }

    /// Get a submission with its reviews and payments.
    ///
    /// Authors can only view their own submissions, and reviewers only those
    /// they were assigned to.
    pub fn submission_details(&self, caller: &Caller, id: Uuid)
    -> Result<SubmissionDetails, ViewSubmissionError> {
        permissions::require(&caller.user, Operation::ViewSubmission)?;

        let submission = self.submission(id)?;
        let reviews = Review::by_submission(&*self.db, id)?;
        self.require_viewer(caller, &submission, &reviews)?;
        let payments = Payment::by_submission(&*self.db, id)?;

        Ok(SubmissionDetails { submission, reviews, payments })
    }

    /// Select a file attached to a submission for download.
    pub fn download(&self, caller: &Caller, id: Uuid, kind: FileKind)
    -> Result<FileRef, DownloadError> {
        permissions::require(&caller.user, Operation::ViewSubmission)?;

        let submission = self.submission(id)?;
        let reviews = Review::by_submission(&*self.db, id)?;
        self.require_viewer(caller, &submission, &reviews)?;

        match submission.file(kind) {
            Some(file) if self.files.exists(file) => Ok(file.clone()),
            _ => Err(DownloadError::FileNotFound(kind)),
        }
    }

    fn require_viewer(
        &self,
        caller: &Caller,
        submission: &Submission,
        reviews: &[Review],
    ) -> Result<(), GateError> {
        let user = &caller.user;

        match user.role {
            Role::Admin | Role::Editor => Ok(()),
            Role::Author =>
                permissions::require_owner(user, Operation::ViewSubmission,
                    submission.author),
            Role::Reviewer => {
                if submission.assigned_reviewer == Some(user.id)
                || reviews.iter().any(|r| r.reviewer == user.id) {
                    Ok(())
                } else {
                    trace!("Refusing {} to {}: not assigned",
                        Operation::ViewSubmission, user.id);
                    Err(GateError::AccessDenied(Operation::ViewSubmission))
                }
            }
        }
    }

    /// Change status of a submission.
    ///
    /// `status` must name one of the statuses. When `note` is not given the
    /// default note for the new status is recorded.
    pub fn update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: &str,
        note: Option<String>,
    ) -> Result<Submission, UpdateStatusError> {
        permissions::require(&caller.user, Operation::UpdateStatus)?;

        let submission = self.submission(id)?;
        let (mut next, entry) = transition::apply_named(
            &submission, status, note, caller.user.id, &self.policy)?;
        next.save(&*self.db, Changeset::new()).map_err(StorageError::from)?;

        info!("Submission {} status updated to {}", next.journal_id,
            entry.status);

        self.notify(next.author, Event::StatusChanged {
            title: next.title.clone(),
            status: entry.status,
        });
        self.audit(caller, Action::StatusUpdated, SubmissionLog {
            status: Some(entry.status),
            note: Some(entry.note.as_str()),
            ..SubmissionLog::new(&next.journal_id)
        });

        Ok(next)
    }

    /// Assign a reviewer to a submission.
    ///
    /// A reviewer can only be assigned to a submission once.
    pub fn assign_reviewer(&self, caller: &Caller, id: Uuid, reviewer: Uuid)
    -> Result<(Submission, Review), AssignReviewerError> {
        permissions::require(&caller.user, Operation::AssignReviewer)?;

        let submission = self.submission(id)?;

        let reviewer = match User::by_id(&*self.db, reviewer) {
            Ok(user) if user.role == Role::Reviewer && user.active => user,
            Ok(_) | Err(FindUserError::NotFound) =>
                return Err(AssignReviewerError::ReviewerNotFound),
            Err(FindUserError::Internal(err)) => return Err(err.into()),
        };

        if Review::by_submission(&*self.db, id)?
            .iter()
            .any(|r| r.reviewer == reviewer.id)
        {
            return Err(AssignReviewerError::DuplicateAssignment);
        }

        let review = Review::pending(id, reviewer.id);
        let (mut next, _) = transition::apply(
            &submission,
            Status::SubmittedReviewer,
            Some(format!("Assigned to reviewer: {}", reviewer.name)),
            caller.user.id,
            &self.policy,
        )?;
        next.assign_reviewer(reviewer.id);
        next.save(&*self.db, review.insert().into())?;

        info!("Reviewer {} assigned to {}", reviewer.id, next.journal_id);

        self.notify(reviewer.id, Event::ReviewAssigned {
            title: next.title.clone(),
            journal_id: next.journal_id.clone(),
        });
        self.notify(next.author, Event::ReviewerAssigned {
            title: next.title.clone(),
        });
        self.audit(caller, Action::ReviewerAssigned, SubmissionLog {
            reviewer_id: Some(reviewer.id),
            ..SubmissionLog::new(&next.journal_id)
        });

        Ok((next, review))
    }

    /// Forward reviewers' comments to the author, asking for a revision.
    pub fn forward_comment(&self, caller: &Caller, id: Uuid, note: Option<String>)
    -> Result<Submission, ForwardCommentError> {
        permissions::require(&caller.user, Operation::ForwardComment)?;

        let submission = self.submission(id)?;
        let note = note
            .filter(|note| !note.trim().is_empty())
            .unwrap_or_else(|| {
                "Editor forwarded reviewer comments to author".to_string()
            });
        let (mut next, entry) = transition::apply(
            &submission, Status::Suggestion, Some(note), caller.user.id,
            &self.policy)?;
        next.set_editor_note(entry.note);
        next.save(&*self.db, Changeset::new()).map_err(StorageError::from)?;

        self.notify(next.author, Event::CommentsShared {
            title: next.title.clone(),
        });
        self.audit(caller, Action::CommentForwarded, SubmissionLog {
            note: next.editor_note.as_ref().map(String::as_str),
            ..SubmissionLog::new(&next.journal_id)
        });

        Ok(next)
    }

    /// Upload a revised manuscript.
    pub fn upload_revision(&self, caller: &Caller, id: Uuid, file: Option<Upload>)
    -> Result<Submission, UploadRevisionError> {
        permissions::require(&caller.user, Operation::UploadRevision)?;

        let submission = self.submission(id)?;
        permissions::require_owner(
            &caller.user, Operation::UploadRevision, submission.author)?;

        let upload = file.ok_or(UploadRevisionError::MissingFile)?;
        let (mut next, _) = transition::apply(
            &submission,
            Status::Revision,
            Some("Revision submitted by author".to_string()),
            caller.user.id,
            &self.policy,
        )?;

        let file = self.files.store(&upload)?;
        next.set_revision(file.clone());

        if let Err(err) = next.save(&*self.db, Changeset::new()) {
            self.discard(&file);
            return Err(StorageError::from(err).into());
        }

        self.audit(caller, Action::RevisionUploaded, SubmissionLog {
            file_name: Some(file.name.as_str()),
            ..SubmissionLog::new(&next.journal_id)
        });

        Ok(next)
    }

    /// Delete a submission, together with its reviews, payments and files.
    ///
    /// Records are removed in a single commit; files are removed afterwards,
    /// and files which are already missing are ignored.
    pub fn delete_submission(&self, caller: &Caller, id: Uuid)
    -> Result<(), DeleteSubmissionError> {
        permissions::require(&caller.user, Operation::DeleteSubmission)?;

        let submission = self.submission(id)?;
        let reviews = Review::by_submission(&*self.db, id)?;

        let changes = Changeset::new()
            .with(Change::DeleteReviews(id))
            .with(Change::DeletePayments(id))
            .with(Change::DeleteSubmission(id));

        self.db.commit(changes).map_err(|err| match err {
            DbError::NotFound => DeleteSubmissionError::Find(
                FindSubmissionError::NotFound),
            err => StorageError::from(err).into(),
        })?;

        let files = submission.files()
            .into_iter()
            .chain(reviews.iter().filter_map(|r| r.comment_file.as_ref()));

        for file in files {
            self.discard(file);
        }

        info!("Submission {} deleted", submission.journal_id);

        self.audit(caller, Action::SubmissionDeleted,
            SubmissionLog::new(&submission.journal_id));

        Ok(())
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateSubmissionError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    /// A required field is empty.
    #[fail(display = "Missing required field: {}", _0)]
    #[api(code = "submission:new:missing-field", status = "BAD_REQUEST")]
    MissingField(&'static str),
    #[fail(display = "Manuscript file required (PDF or Word)")]
    #[api(code = "submission:new:missing-file", status = "BAD_REQUEST")]
    MissingFile,
    #[fail(display = "{}", _0)]
    File(#[cause] #[from] FileError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for CreateSubmissionError ;
    DbError => |e| CreateSubmissionError::Storage(e.into()),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ViewSubmissionError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for ViewSubmissionError ;
    DbError => |e| ViewSubmissionError::Storage(e.into()),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum DownloadError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    /// Requested file was never uploaded, or is missing from the file store.
    #[fail(display = "File not found: {}", _0)]
    #[api(code = "submission:file:not-found", status = "NOT_FOUND")]
    FileNotFound(FileKind),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for DownloadError ;
    DbError => |e| DownloadError::Storage(e.into()),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UpdateStatusError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum AssignReviewerError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    /// User does not exist, is not a reviewer, or is inactive.
    #[fail(display = "Reviewer not found")]
    #[api(code = "review:reviewer:not-found", status = "NOT_FOUND")]
    ReviewerNotFound,
    #[fail(display = "Reviewer already assigned")]
    #[api(code = "submission:assign:duplicate", status = "BAD_REQUEST")]
    DuplicateAssignment,
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for AssignReviewerError ;
    DbError => |e| match e {
        DbError::UniqueViolation(Constraint::ReviewAssignment) =>
            AssignReviewerError::DuplicateAssignment,
        e => AssignReviewerError::Storage(e.into()),
    },
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ForwardCommentError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UploadRevisionError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "File required")]
    #[api(code = "submission:revision:missing-file", status = "BAD_REQUEST")]
    MissingFile,
    #[fail(display = "{}", _0)]
    File(#[cause] #[from] FileError),
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum DeleteSubmissionError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for DeleteSubmissionError ;
    DbError => |e| DeleteSubmissionError::Storage(e.into()),
}
