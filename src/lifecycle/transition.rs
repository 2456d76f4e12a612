//! Status transition engine.
//!
//! The engine computes the next state of a submission. It performs no
//! authorization, persistence or notification; those are the orchestrator's
//! responsibility.

use failure::Fail;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::types::{ParseStatusError, Status},
    error::ApiError,
    ledger::Entry,
    models::Submission,
};

/// Which status changes are allowed.
///
/// A permissive policy allows changing any status into any other. A strict
/// policy only allows changes listed in its transition table.
#[derive(Clone, Debug, Default)]
pub struct TransitionPolicy {
    strict: Option<HashMap<Status, Vec<Status>>>,
}

impl TransitionPolicy {
    pub fn permissive() -> TransitionPolicy {
        TransitionPolicy { strict: None }
    }

    /// Strict policy with the default transition table.
    pub fn strict() -> TransitionPolicy {
        use self::Status::*;

        let table = vec![
            (Submitted, vec![Received, DeskRejection, SubmittedReviewer]),
            (Received, vec![DeskRejection, SubmittedReviewer, UnderReview]),
            // Further reviewers may be assigned or report at any time.
            (SubmittedReviewer, vec![SubmittedReviewer, UnderReview, Review]),
            (UnderReview, vec![Review, SubmittedReviewer]),
            (Review, vec![Review, Suggestion, Accepted, SubmittedReviewer, PendingFee]),
            (Suggestion, vec![Revision]),
            (Revision, vec![SubmittedReviewer, UnderReview, Review, Accepted]),
            (Accepted, vec![PendingFee]),
            (PendingFee, vec![PendingFee, Paid, Accepted]),
            (Paid, vec![Published]),
        ];

        TransitionPolicy {
            strict: Some(table.into_iter().collect()),
        }
    }

    /// Replace allowed successors of some statuses.
    ///
    /// Overrides only have effect on a strict policy.
    pub fn with_overrides<I>(mut self, overrides: I) -> TransitionPolicy
    where
        I: IntoIterator<Item = (Status, Vec<Status>)>,
    {
        if let Some(ref mut table) = self.strict {
            table.extend(overrides);
        }
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict.is_some()
    }

    /// Statuses into which a submission in status `from` may move, or `None`
    /// if any status is allowed.
    pub fn successors(&self, from: Status) -> Option<&[Status]> {
        self.strict.as_ref().map(|table| table.get(&from)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn permits(&self, from: Status, to: Status) -> bool {
        match self.successors(from) {
            Some(successors) => successors.contains(&to),
            None => true,
        }
    }
}

/// Compute the next state of a submission.
///
/// Returns a copy of `submission` in status `to`, with a new entry appended
/// to its timeline, and the new entry. When `note` is missing or blank the
/// status's default note is used.
pub fn apply(
    submission: &Submission,
    to: Status,
    note: Option<String>,
    actor: Uuid,
    policy: &TransitionPolicy,
) -> Result<(Submission, Entry), TransitionError> {
    let from = submission.status;

    if !policy.permits(from, to) {
        return Err(TransitionError::NotPermitted { from, to });
    }

    let note = note
        .filter(|note| !note.trim().is_empty())
        .unwrap_or_else(|| to.default_note());
    let entry = Entry::new(to, note, actor);

    debug!("Submission {} moves from {} to {}", submission.id, from, to);

    Ok((submission.transitioned(entry.clone()), entry))
}

/// Like [`apply`], but with the target status given by name.
pub fn apply_named(
    submission: &Submission,
    to: &str,
    note: Option<String>,
    actor: Uuid,
    policy: &TransitionPolicy,
) -> Result<(Submission, Entry), TransitionError> {
    apply(submission, to.parse()?, note, actor, policy)
}

#[derive(ApiError, Debug, Fail)]
pub enum TransitionError {
    /// Target status is not one of the known statuses.
    #[fail(display = "{}", _0)]
    InvalidStatus(#[cause] ParseStatusError),
    /// Policy does not allow this change.
    #[api(code = "submission:status:not-permitted", status = "BAD_REQUEST")]
    #[fail(display = "Changing status from {} to {} is not permitted", from, to)]
    NotPermitted {
        from: Status,
        to: Status,
    },
}

impl_from! { for TransitionError ;
    ParseStatusError => |e| TransitionError::InvalidStatus(e),
}

#[cfg(test)]
mod tests {
    use crate::{
        db::{MemoryStorage, models::FileRef},
        models::NewSubmission,
    };
    use super::*;

    fn submission() -> Submission {
        let author = Uuid::new_v4();
        Submission::create(
            &MemoryStorage::new(),
            "TEST",
            author,
            NewSubmission {
                title: "Title".into(),
                summary: "Abstract".into(),
                ..NewSubmission::default()
            },
            FileRef { path: "a.pdf".into(), name: "a.pdf".into() },
            Entry::new(Status::Submitted, "Manuscript submitted by author".into(),
                author),
        ).unwrap()
    }

    #[test]
    fn status_and_length() {
        let policy = TransitionPolicy::permissive();
        let actor = Uuid::new_v4();
        let mut current = submission();

        for &to in Status::ALL {
            let (next, entry) = apply(&current, to, None, actor, &policy).unwrap();

            assert_eq!(next.status, to);
            assert_eq!(next.timeline.len(), current.timeline.len() + 1);
            assert_eq!(next.timeline.last(), Some(&entry));
            assert_eq!(&next.timeline.entries()[..current.timeline.len()],
                current.timeline.entries());
            assert_eq!(next.journal_id, current.journal_id);
            assert_eq!(entry.actor, actor);

            current = next;
        }
    }

    #[test]
    fn original_is_untouched() {
        let original = submission();
        let (next, _) = apply(&original, Status::Received, None, Uuid::nil(),
            &TransitionPolicy::default()).unwrap();

        assert_eq!(original.status, Status::Submitted);
        assert_eq!(original.timeline.len(), 1);
        assert_eq!(next.version, original.version);
    }

    #[test]
    fn notes() {
        let policy = TransitionPolicy::permissive();
        let original = submission();

        let (_, entry) = apply(&original, Status::Accepted, None, Uuid::nil(),
            &policy).unwrap();
        assert_eq!(entry.note, "Status updated to accepted");

        let (_, entry) = apply(&original, Status::Accepted, Some("  ".into()),
            Uuid::nil(), &policy).unwrap();
        assert_eq!(entry.note, "Status updated to accepted");

        let (_, entry) = apply(&original, Status::Accepted,
            Some("Looks good".into()), Uuid::nil(), &policy).unwrap();
        assert_eq!(entry.note, "Looks good");
    }

    #[test]
    fn invalid_status() {
        let err = apply_named(&submission(), "closed", None, Uuid::nil(),
            &TransitionPolicy::permissive()).unwrap_err();

        match err {
            TransitionError::InvalidStatus(_) => (),
            ref e => panic!("unexpected error: {:?}", e),
        }

        assert_eq!(err.code().unwrap(), "submission:status:invalid");
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn permissive_allows_anything() {
        let policy = TransitionPolicy::permissive();

        for &from in Status::ALL {
            for &to in Status::ALL {
                assert!(policy.permits(from, to));
            }
        }
    }

    #[test]
    fn strict_policy() {
        let policy = TransitionPolicy::strict();

        assert!(policy.permits(Status::Submitted, Status::SubmittedReviewer));
        assert!(policy.permits(Status::Review, Status::PendingFee));
        assert!(!policy.permits(Status::Submitted, Status::Published));
        assert!(!policy.permits(Status::Published, Status::Submitted));
        assert_eq!(policy.successors(Status::DeskRejection), Some(&[][..]));

        match apply(&submission(), Status::Paid, None, Uuid::nil(), &policy) {
            Err(TransitionError::NotPermitted {
                from: Status::Submitted,
                to: Status::Paid,
            }) => (),
            r => panic!("unexpected result: {:?}", r.map(|(_, e)| e)),
        }
    }

    #[test]
    fn strict_policy_allows_repeated_review_steps() {
        let policy = TransitionPolicy::strict();

        assert!(policy.permits(Status::SubmittedReviewer, Status::SubmittedReviewer));
        assert!(policy.permits(Status::Review, Status::Review));
        assert!(policy.permits(Status::Review, Status::SubmittedReviewer));
        assert!(!policy.permits(Status::Accepted, Status::Accepted));
    }

    #[test]
    fn overrides() {
        let policy = TransitionPolicy::strict()
            .with_overrides(vec![(Status::Accepted, vec![Status::Published])]);

        assert!(policy.permits(Status::Accepted, Status::Published));
        assert!(!policy.permits(Status::Accepted, Status::PendingFee));

        let policy = TransitionPolicy::permissive()
            .with_overrides(vec![(Status::Accepted, vec![Status::Published])]);
        assert!(policy.permits(Status::Accepted, Status::PendingFee));
    }
}
