use failure::Fail;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::Action,
    db::{Changeset, DbError, types::{Amount, PaymentStatus, Status}},
    error::ApiError,
    events::Event,
    models::{
        payment::{FindPaymentError, VerifyError},
        submission::FindSubmissionError,
        NewPayment,
        Payment,
        Submission,
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentLog<'a> {
    payment_id: Uuid,
    submission_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PaymentStatus>,
}

impl Lifecycle {
    /// Record a fee payment for caller's submission.
    ///
    /// The submission moves to [`Status::PendingFee`] and stays there until
    /// an editor verifies the payment.
    pub fn create_payment(&self, caller: &Caller, id: Uuid, new: NewPayment)
    -> Result<(Payment, Submission), CreatePaymentError> {
        permissions::require(&caller.user, Operation::CreatePayment)?;

        let submission = self.submission(id)?;
        permissions::require_owner(
            &caller.user, Operation::CreatePayment, submission.author)?;

        if new.amount.is_zero() {
            return Err(CreatePaymentError::InvalidAmount);
        }

        if new.method.trim().is_empty() {
            return Err(CreatePaymentError::MissingField("method"));
        }

        if new.transaction_id.trim().is_empty() {
            return Err(CreatePaymentError::MissingField("transactionId"));
        }

        let note = format!("Payment of ₹{} submitted via {}", new.amount,
            new.method);
        let (mut next, _) = transition::apply(
            &submission, Status::PendingFee, Some(note), caller.user.id,
            &self.policy)?;

        let payment = Payment::pending(id, caller.user.id, new);
        next.save(&*self.db, Changeset::from(payment.insert()))
            .map_err(StorageError::from)?;

        info!("Payment {} of {} submitted for {}", payment.id, payment.amount,
            next.journal_id);

        self.notify(caller.user.id, Event::PaymentSubmitted {
            amount: payment.amount,
            journal_id: next.journal_id.clone(),
        });
        self.audit(caller, Action::PaymentSubmitted, PaymentLog {
            payment_id: payment.id,
            submission_id: id,
            amount: Some(payment.amount),
            method: Some(payment.method.as_str()),
            transaction_id: Some(payment.transaction_id.as_str()),
            status: None,
        });

        Ok((payment, next))
    }

    /// Verify a pending payment.
    ///
    /// A completed payment moves its submission to [`Status::Paid`]. A
    /// rejected payment leaves the submission's status as is; the author is
    /// told about the rejection and can submit another payment.
    pub fn verify_payment(
        &self,
        caller: &Caller,
        id: Uuid,
        status: PaymentStatus,
        notes: Option<String>,
    ) -> Result<(Payment, Submission), VerifyPaymentError> {
        permissions::require(&caller.user, Operation::VerifyPayment)?;

        let payment = Payment::by_id(&*self.db, id)?;
        let submission = self.submission(payment.submission)?;
        let notes = notes.filter(|notes| !notes.trim().is_empty());
        let mut verified = payment.verified(caller.user.id, status, notes)?;

        let submission = match status {
            PaymentStatus::Completed => {
                let (mut next, _) = transition::apply(
                    &submission,
                    Status::Paid,
                    Some(format!("Payment verified by {}", caller.user.name)),
                    caller.user.id,
                    &self.policy,
                )?;
                next.save(&*self.db, Changeset::from(verified.update()))
                    .map_err(StorageError::from)?;
                next
            }
            _ => {
                self.db.commit(Changeset::from(verified.update()))
                    .map_err(StorageError::from)?;
                submission
            }
        };
        verified.saved();

        info!("Payment {} for {} verified as {}", verified.id,
            submission.journal_id, verified.status);

        let event = match verified.status {
            PaymentStatus::Completed => Event::PaymentVerified {
                journal_id: submission.journal_id.clone(),
            },
            _ => Event::PaymentRejected {
                journal_id: submission.journal_id.clone(),
                notes: verified.notes.clone(),
            },
        };
        self.notify(verified.author, event);
        self.audit(caller, Action::PaymentVerified, PaymentLog {
            payment_id: verified.id,
            submission_id: verified.submission,
            amount: None,
            method: None,
            transaction_id: None,
            status: Some(verified.status),
        });

        Ok((verified, submission))
    }

    /// Get payments made by the caller, newest first.
    pub fn my_payments(&self, caller: &Caller)
    -> Result<Vec<Payment>, QueryError> {
        permissions::require(&caller.user, Operation::ViewOwnPayments)?;
        Ok(Payment::by_author(&*self.db, caller.user.id)?)
    }

    /// Get all payments, newest first.
    pub fn all_payments(&self, caller: &Caller)
    -> Result<Vec<Payment>, QueryError> {
        permissions::require(&caller.user, Operation::ViewAllPayments)?;
        Ok(Payment::all(&*self.db)?)
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreatePaymentError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    Find(#[cause] #[from] FindSubmissionError),
    #[fail(display = "Payment amount must be greater than zero")]
    #[api(code = "payment:amount:invalid", status = "BAD_REQUEST")]
    InvalidAmount,
    #[fail(display = "Missing required field: {}", _0)]
    #[api(code = "payment:new:missing-field", status = "BAD_REQUEST")]
    MissingField(&'static str),
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum VerifyPaymentError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    FindPayment(#[cause] #[from] FindPaymentError),
    #[fail(display = "{}", _0)]
    FindSubmission(#[cause] #[from] FindSubmissionError),
    #[fail(display = "Payment was already verified")]
    #[api(code = "payment:verify:already-verified", status = "BAD_REQUEST")]
    AlreadyVerified,
    #[fail(display = "Payment can only be verified as completed or rejected")]
    #[api(code = "payment:verify:invalid-status", status = "BAD_REQUEST")]
    InvalidVerdict,
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for VerifyPaymentError ;
    VerifyError => |e| match e {
        VerifyError::AlreadyVerified => VerifyPaymentError::AlreadyVerified,
        VerifyError::InvalidVerdict => VerifyPaymentError::InvalidVerdict,
    },
    DbError => |e| VerifyPaymentError::Storage(e.into()),
}
