use chrono::Utc;
use failure::Fail;
use uuid::Uuid;

use crate::{
    db::{
        Change,
        DbError,
        Filter,
        Storage,
        models as db,
        types::{Amount, PaymentStatus},
    },
    error::ApiError,
};

/// A publication fee paid by an author.
#[derive(Clone, Debug)]
pub struct Payment {
    data: db::Payment,
}

/// Details of a payment, as declared by the author.
#[derive(Clone, Debug)]
pub struct NewPayment {
    pub amount: Amount,
    pub method: String,
    pub transaction_id: String,
}

impl Payment {
    /// Construct `Payment` from its database counterpart.
    pub(crate) fn from_db(data: db::Payment) -> Payment {
        Payment { data }
    }

    /// Unpack database data.
    pub fn into_db(self) -> db::Payment {
        self.data
    }

    /// Create a new pending payment. The payment is not stored.
    pub(crate) fn pending(submission: Uuid, author: Uuid, new: NewPayment)
    -> Payment {
        Payment::from_db(db::Payment {
            id: Uuid::new_v4(),
            submission,
            author,
            amount: new.amount,
            method: new.method,
            transaction_id: new.transaction_id,
            status: PaymentStatus::Pending,
            verified_by: None,
            verified_at: None,
            notes: None,
            created_at: Utc::now(),
            version: 0,
        })
    }

    /// Find a payment by ID.
    pub fn by_id(db: &dyn Storage, id: Uuid)
    -> Result<Payment, FindPaymentError> {
        db.payment(id).map(Payment::from_db).map_err(Into::into)
    }

    /// Get all payments, newest first.
    pub fn all(db: &dyn Storage) -> Result<Vec<Payment>, DbError> {
        db.payments(Filter::All)
            .map(|v| v.into_iter().map(Payment::from_db).collect())
    }

    /// Get all payments made by an author, newest first.
    pub fn by_author(db: &dyn Storage, author: Uuid)
    -> Result<Vec<Payment>, DbError> {
        db.payments(Filter::ByUser(author))
            .map(|v| v.into_iter().map(Payment::from_db).collect())
    }

    /// Get all payments for a submission, newest first.
    pub fn by_submission(db: &dyn Storage, submission: Uuid)
    -> Result<Vec<Payment>, DbError> {
        db.payments(Filter::BySubmission(submission))
            .map(|v| v.into_iter().map(Payment::from_db).collect())
    }

    /// Create a verified copy of this payment.
    ///
    /// Only pending payments can be verified, and only as either completed or
    /// rejected.
    pub(crate) fn verified(
        &self,
        verifier: Uuid,
        status: PaymentStatus,
        notes: Option<String>,
    ) -> Result<Payment, VerifyError> {
        if self.data.status != PaymentStatus::Pending {
            return Err(VerifyError::AlreadyVerified);
        }

        if status == PaymentStatus::Pending {
            return Err(VerifyError::InvalidVerdict);
        }

        let mut data = self.data.clone();
        data.status = status;
        data.verified_by = Some(verifier);
        data.verified_at = Some(Utc::now());
        data.notes = notes;

        Ok(Payment { data })
    }

    /// Change inserting this payment into storage.
    pub(crate) fn insert(&self) -> Change {
        Change::InsertPayment(self.data.clone())
    }

    /// Change storing this payment's current state.
    pub(crate) fn update(&self) -> Change {
        Change::UpdatePayment(self.data.clone())
    }

    /// Note that [`Payment::update`] was committed.
    pub(crate) fn saved(&mut self) {
        self.data.version += 1;
    }
}

impl std::ops::Deref for Payment {
    type Target = db::Payment;

    fn deref(&self) -> &db::Payment {
        &self.data
    }
}

#[derive(Debug, Eq, Fail, PartialEq)]
pub enum VerifyError {
    #[fail(display = "Payment was already verified")]
    AlreadyVerified,
    #[fail(display = "Payment can only be verified as completed or rejected")]
    InvalidVerdict,
}

#[derive(ApiError, Debug, Fail)]
pub enum FindPaymentError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    #[fail(display = "No such payment")]
    #[api(code = "payment:not-found", status = "NOT_FOUND")]
    NotFound,
}

impl_from! { for FindPaymentError ;
    DbError => |e| match e {
        DbError::NotFound => FindPaymentError::NotFound,
        e => FindPaymentError::Internal(e),
    },
}
