use failure::Fail;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::Action,
    db::{Changeset, DbError, types::{Decision, Status}},
    error::ApiError,
    events::Event,
    files::{FileError, Upload},
    models::{
        review::FindReviewError,
        submission::FindSubmissionError,
        user::FindUserError,
        Review,
        Submission,
        User,
        Verdict,
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

/// A review assignment together with the submission under review.
#[derive(Clone, Debug)]
pub struct AssignedReview {
    pub review: Review,
    pub submission: Submission,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewLog<'a> {
    review_id: Uuid,
    journal_id: &'a str,
    decision: Decision,
}

impl Lifecycle {
    /// Get reviews assigned to the caller, newest first.
    pub fn assigned_reviews(&self, caller: &Caller)
    -> Result<Vec<AssignedReview>, QueryError> {
        permissions::require(&caller.user, Operation::ViewAssignedReviews)?;

        let mut assigned = Vec::new();

        for review in Review::by_reviewer(&*self.db, caller.user.id)? {
            match self.db.submission(review.submission) {
                Ok(submission) => assigned.push(AssignedReview {
                    submission: Submission::from_db(submission),
                    review,
                }),
                Err(DbError::NotFound) => warn!(
                    "Review {} refers to missing submission {}",
                    review.id, review.submission),
                Err(err) => return Err(err.into()),
            }
        }

        Ok(assigned)
    }

    /// Record a reviewer's verdict.
    ///
    /// The submission moves to [`Status::Review`]. A review can only be
    /// submitted once.
    pub fn submit_review(
        &self,
        caller: &Caller,
        id: Uuid,
        verdict: Verdict,
        comment_file: Option<Upload>,
    ) -> Result<(Review, Submission), SubmitReviewError> {
        permissions::require(&caller.user, Operation::SubmitReview)?;

        let review = Review::by_id(&*self.db, id)?;
        permissions::require_owner(
            &caller.user, Operation::SubmitReview, review.reviewer)?;

        if review.is_completed() {
            return Err(SubmitReviewError::AlreadyCompleted);
        }

        let submission = self.submission(review.submission)?;
        let decision = verdict.decision;
        let (mut next, _) = transition::apply(
            &submission,
            Status::Review,
            Some(format!("Review completed. Decision: {}", decision)),
            caller.user.id,
            &self.policy,
        )?;

        let file = match comment_file {
            Some(upload) => Some(self.files.store(&upload)?),
            None => None,
        };

        let mut done = match review.completed(verdict, file.clone()) {
            Ok(done) => done,
            Err(_) => {
                if let Some(ref file) = file {
                    self.discard(file);
                }
                return Err(SubmitReviewError::AlreadyCompleted);
            }
        };

        if let Some(ref file) = file {
            next.set_reviewer_comment(file.clone());
        }

        if let Err(err) = next.save(&*self.db, Changeset::from(done.update())) {
            if let Some(ref file) = file {
                self.discard(file);
            }
            return Err(StorageError::from(err).into());
        }
        done.saved();

        info!("Review {} of {} completed: {}", done.id, next.journal_id,
            decision);

        self.notify(next.author, Event::ReviewCompleted {
            title: next.title.clone(),
        });
        self.audit(caller, Action::ReviewSubmitted, ReviewLog {
            review_id: done.id,
            journal_id: &next.journal_id,
            decision,
        });

        Ok((done, next))
    }

    /// Flip caller's availability for new assignments. Returns the new
    /// availability.
    pub fn toggle_availability(&self, caller: &Caller)
    -> Result<bool, ToggleAvailabilityError> {
        permissions::require(&caller.user, Operation::ToggleAvailability)?;

        let mut user = User::by_id(&*self.db, caller.user.id)?;
        let available = !user.available;
        user.set_available(&*self.db, available)
            .map_err(StorageError::from)?;

        Ok(available)
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum SubmitReviewError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    FindReview(#[cause] #[from] FindReviewError),
    #[fail(display = "{}", _0)]
    FindSubmission(#[cause] #[from] FindSubmissionError),
    #[fail(display = "Review already submitted")]
    #[api(code = "review:submit:already-completed", status = "BAD_REQUEST")]
    AlreadyCompleted,
    #[fail(display = "{}", _0)]
    File(#[cause] #[from] FileError),
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ToggleAvailabilityError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    FindUser(#[cause] #[from] FindUserError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}
