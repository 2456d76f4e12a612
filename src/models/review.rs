use chrono::Utc;
use failure::Fail;
use uuid::Uuid;

use crate::{
    db::{
        Change,
        DbError,
        Filter,
        Storage,
        models::{self as db, FileRef},
        types::{Decision, ReviewStatus},
    },
    error::ApiError,
};

/// A reviewer's assessment of a submission.
#[derive(Clone, Debug)]
pub struct Review {
    data: db::Review,
}

/// Reviewer's verdict on a submission.
#[derive(Clone, Debug)]
pub struct Verdict {
    pub decision: Decision,
    pub comments: Option<String>,
    pub recommendation: Option<String>,
}

impl Review {
    /// Construct `Review` from its database counterpart.
    pub(crate) fn from_db(data: db::Review) -> Review {
        Review { data }
    }

    /// Unpack database data.
    pub fn into_db(self) -> db::Review {
        self.data
    }

    /// Create a new pending review. The review is not stored.
    pub(crate) fn pending(submission: Uuid, reviewer: Uuid) -> Review {
        Review::from_db(db::Review {
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
        })
    }

    /// Find a review by ID.
    pub fn by_id(db: &dyn Storage, id: Uuid) -> Result<Review, FindReviewError> {
        db.review(id).map(Review::from_db).map_err(Into::into)
    }

    /// Get all reviews of a submission, newest first.
    pub fn by_submission(db: &dyn Storage, submission: Uuid)
    -> Result<Vec<Review>, DbError> {
        db.reviews(Filter::BySubmission(submission))
            .map(|v| v.into_iter().map(Review::from_db).collect())
    }

    /// Get all reviews assigned to a reviewer, newest first.
    pub fn by_reviewer(db: &dyn Storage, reviewer: Uuid)
    -> Result<Vec<Review>, DbError> {
        db.reviews(Filter::ByUser(reviewer))
            .map(|v| v.into_iter().map(Review::from_db).collect())
    }

    pub fn is_completed(&self) -> bool {
        self.data.status == ReviewStatus::Completed
    }

    /// Create a completed copy of this review. Completed reviews can't be
    /// completed again.
    pub(crate) fn completed(&self, verdict: Verdict, file: Option<FileRef>)
    -> Result<Review, AlreadyCompleted> {
        if self.is_completed() {
            return Err(AlreadyCompleted);
        }

        let mut data = self.data.clone();
        data.decision = Some(verdict.decision);
        data.comments = verdict.comments;
        data.recommendation = verdict.recommendation;
        data.comment_file = file;
        data.status = ReviewStatus::Completed;
        data.completed_at = Some(Utc::now());

        Ok(Review { data })
    }

    /// Change inserting this review into storage.
    pub(crate) fn insert(&self) -> Change {
        Change::InsertReview(self.data.clone())
    }

    /// Change storing this review's current state.
    pub(crate) fn update(&self) -> Change {
        Change::UpdateReview(self.data.clone())
    }

    /// Note that [`Review::update`] was committed.
    pub(crate) fn saved(&mut self) {
        self.data.version += 1;
    }
}

impl std::ops::Deref for Review {
    type Target = db::Review;

    fn deref(&self) -> &db::Review {
        &self.data
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Review was already completed")]
pub struct AlreadyCompleted;

#[derive(ApiError, Debug, Fail)]
pub enum FindReviewError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    #[fail(display = "No such review")]
    #[api(code = "review:not-found", status = "NOT_FOUND")]
    NotFound,
}

impl_from! { for FindReviewError ;
    DbError => |e| match e {
        DbError::NotFound => FindReviewError::NotFound,
        e => FindReviewError::Internal(e),
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_once() {
        let review = Review::pending(Uuid::new_v4(), Uuid::new_v4());
        let verdict = Verdict {
            decision: Decision::Accept,
            comments: Some("Good".into()),
            recommendation: None,
        };

        let done = review.completed(verdict.clone(), None).unwrap();
        assert!(!review.is_completed());
        assert!(done.is_completed());
        assert_eq!(done.decision, Some(Decision::Accept));
        assert!(done.completed_at.is_some());

        assert!(done.completed(
            Verdict { decision: Decision::Reject, ..verdict }, None).is_err());
    }
}
