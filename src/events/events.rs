use serde::{Deserialize, Serialize};

use crate::db::types::{Amount, Severity, Status};

/// Events users are notified of.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Event {
    /// Author's manuscript was received.
    SubmissionReceived {
        title: String,
        journal_id: String,
    },
    /// Status of author's manuscript changed.
    StatusChanged {
        title: String,
        status: Status,
    },
    /// Reviewer was assigned to review a manuscript.
    ReviewAssigned {
        title: String,
        journal_id: String,
    },
    /// A reviewer was assigned to author's manuscript.
    ReviewerAssigned {
        title: String,
    },
    /// Editor forwarded reviewer's comments to the author.
    CommentsShared {
        title: String,
    },
    /// A review of author's manuscript was completed.
    ReviewCompleted {
        title: String,
    },
    PaymentSubmitted {
        amount: Amount,
        journal_id: String,
    },
    PaymentVerified {
        journal_id: String,
    },
    PaymentRejected {
        journal_id: String,
        notes: Option<String>,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match *self {
            Event::SubmissionReceived { .. } => "submission-received",
            Event::StatusChanged { .. } => "status-changed",
            Event::ReviewAssigned { .. } => "review-assigned",
            Event::ReviewerAssigned { .. } => "reviewer-assigned",
            Event::CommentsShared { .. } => "comments-shared",
            Event::ReviewCompleted { .. } => "review-completed",
            Event::PaymentSubmitted { .. } => "payment-submitted",
            Event::PaymentVerified { .. } => "payment-verified",
            Event::PaymentRejected { .. } => "payment-rejected",
        }
    }

    pub fn title(&self) -> &'static str {
        match *self {
            Event::SubmissionReceived { .. } => "Submission Received",
            Event::StatusChanged { .. } => "Submission Status Updated",
            Event::ReviewAssigned { .. } => "New Review Assignment",
            Event::ReviewerAssigned { .. } => "Reviewer Assigned",
            Event::CommentsShared { .. } => "Reviewer Comments Shared",
            Event::ReviewCompleted { .. } => "Review Completed",
            Event::PaymentSubmitted { .. } => "Payment Submitted",
            Event::PaymentVerified { .. } => "Payment Verified",
            Event::PaymentRejected { .. } => "Payment Rejected",
        }
    }

    pub fn message(&self) -> String {
        match *self {
            Event::SubmissionReceived { ref title, ref journal_id } => format!(
                "Your manuscript \"{}\" ({}) has been received.",
                title, journal_id),
            Event::StatusChanged { ref title, status } => format!(
                "Your manuscript \"{}\" status changed to: {}", title, status),
            Event::ReviewAssigned { ref title, ref journal_id } => format!(
                "You have been assigned to review \"{}\" ({})",
                title, journal_id),
            Event::ReviewerAssigned { ref title } => format!(
                "A reviewer has been assigned to your manuscript \"{}\"", title),
            Event::CommentsShared { ref title } => format!(
                "Editor has shared reviewer feedback for \"{}\". Please review \
                and revise.", title),
            Event::ReviewCompleted { ref title } => format!(
                "A review decision has been made for \"{}\"", title),
            Event::PaymentSubmitted { amount, ref journal_id } => format!(
                "Payment of ₹{} submitted for {}. Awaiting verification.",
                amount, journal_id),
            Event::PaymentVerified { ref journal_id } => format!(
                "Your payment for {} has been verified.", journal_id),
            Event::PaymentRejected { ref journal_id, notes: Some(ref notes) } =>
                format!("Your payment for {} was rejected: {}", journal_id, notes),
            Event::PaymentRejected { ref journal_id, notes: None } => format!(
                "Your payment for {} was rejected.", journal_id),
        }
    }

    pub fn severity(&self) -> Severity {
        match *self {
            Event::SubmissionReceived { .. }
            | Event::PaymentVerified { .. } => Severity::Success,
            Event::CommentsShared { .. } => Severity::Warning,
            Event::PaymentRejected { .. } => Severity::Error,
            Event::StatusChanged { .. }
            | Event::ReviewAssigned { .. }
            | Event::ReviewerAssigned { .. }
            | Event::ReviewCompleted { .. }
            | Event::PaymentSubmitted { .. } => Severity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let event = Event::SubmissionReceived {
            title: "Graph Embeddings".into(),
            journal_id: "CSPG-ISR-AAAAAAAA-BBBBBBBB".into(),
        };
        assert_eq!(event.title(), "Submission Received");
        assert_eq!(event.message(), "Your manuscript \"Graph Embeddings\" \
            (CSPG-ISR-AAAAAAAA-BBBBBBBB) has been received.");
        assert_eq!(event.severity(), Severity::Success);

        let event = Event::PaymentSubmitted {
            amount: Amount::from_rupees(2000),
            journal_id: "J".into(),
        };
        assert_eq!(event.message(),
            "Payment of ₹2000 submitted for J. Awaiting verification.");

        let event = Event::StatusChanged {
            title: "T".into(),
            status: Status::UnderReview,
        };
        assert_eq!(event.message(),
            "Your manuscript \"T\" status changed to: under_review");

        let event = Event::CommentsShared { title: "T".into() };
        assert_eq!(event.severity(), Severity::Warning);
        assert_eq!(event.message(), "Editor has shared reviewer feedback for \
            \"T\". Please review and revise.");
    }
}
