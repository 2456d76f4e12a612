//! Data and behaviours modelled as objects.

pub mod journal_id;
pub mod notification;
pub mod payment;
pub mod review;
pub mod submission;
pub mod user;

pub use self::{
    notification::Notification,
    payment::{NewPayment, Payment},
    review::{Review, Verdict},
    submission::{FileKind, NewSubmission, Submission},
    user::{NewUser, User, UserUpdate},
};
