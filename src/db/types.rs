use failure::Fail;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use std::{fmt, str::FromStr};

use crate::error::ApiError;

/// Implement string conversions (`as_str`, [`fmt::Display`], [`FromStr`])
/// for a unit-only enumeration.
macro_rules! string_enum {
    {
        $type:ident / $error:ident ;
        $( $variant:ident = $name:literal ),+ $(,)*
    } => {
        impl $type {
            /// All values of this enumeration.
            pub const ALL: &'static [$type] = &[$($type::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($type::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str(self.as_str())
            }
        }

        impl FromStr for $type {
            type Err = $error;

            fn from_str(v: &str) -> Result<$type, $error> {
                match v {
                    $($name => Ok($type::$variant),)+
                    _ => Err($error(v.to_string())),
                }
            }
        }
    };
}

/// Role of a user in the system.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits manuscripts, uploads revisions and pays publication fees.
    Author,
    /// Reviews manuscripts assigned to them.
    Reviewer,
    /// Manages the editorial process.
    Editor,
    /// Manages the editorial process and the system itself.
    Admin,
}

string_enum! { Role / ParseRoleError ;
    Author = "author",
    Reviewer = "reviewer",
    Editor = "editor",
    Admin = "admin",
}

impl Role {
    /// Is this one of the roles managing the editorial process?
    pub fn is_privileged(self) -> bool {
        match self {
            Role::Editor | Role::Admin => true,
            Role::Author | Role::Reviewer => false,
        }
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "user:role:invalid", status = "BAD_REQUEST")]
#[fail(display = "Invalid role: {}", _0)]
pub struct ParseRoleError(pub String);

/// Status of a submission.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Submitted,
    Received,
    DeskRejection,
    SubmittedReviewer,
    UnderReview,
    Suggestion,
    Revision,
    Review,
    Accepted,
    PendingFee,
    Paid,
    Published,
}

string_enum! { Status / ParseStatusError ;
    Submitted = "submitted",
    Received = "received",
    DeskRejection = "desk_rejection",
    SubmittedReviewer = "submitted_reviewer",
    UnderReview = "under_review",
    Suggestion = "suggestion",
    Revision = "revision",
    Review = "review",
    Accepted = "accepted",
    PendingFee = "pending_fee",
    Paid = "paid",
    Published = "published",
}

impl Status {
    /// Note recorded for a transition into this status when the caller did
    /// not provide one.
    pub fn default_note(self) -> String {
        format!("Status updated to {}", self)
    }
}

/// Status name outside of the fixed enumeration.
#[derive(ApiError, Debug, Fail)]
#[api(code = "submission:status:invalid", status = "BAD_REQUEST")]
#[fail(display = "Invalid status: {}", _0)]
pub struct ParseStatusError(pub String);

/// Reviewer's verdict.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

string_enum! { Decision / ParseDecisionError ;
    Accept = "accept",
    MinorRevision = "minor_revision",
    MajorRevision = "major_revision",
    Reject = "reject",
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "review:decision:invalid", status = "BAD_REQUEST")]
#[fail(display = "Invalid decision: {}", _0)]
pub struct ParseDecisionError(pub String);

/// State of a review. Completed reviews are immutable.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Completed,
}

/// State of a payment. Only pending payments can be verified.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Rejected,
}

string_enum! { PaymentStatus / ParsePaymentStatusError ;
    Pending = "pending",
    Completed = "completed",
    Rejected = "rejected",
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "payment:status:invalid", status = "BAD_REQUEST")]
#[fail(display = "Invalid payment status: {}", _0)]
pub struct ParsePaymentStatusError(pub String);

/// Severity of a notification.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A sum of money in rupees, stored as a whole number of paise.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Amount(u64);

impl Amount {
    pub fn from_paise(paise: u64) -> Amount {
        Amount(paise)
    }

    /// Amounts beyond `u64::MAX` paise saturate.
    pub fn from_rupees(rupees: u64) -> Amount {
        Amount(rupees.saturating_mul(100))
    }

    pub fn paise(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::default(), std::ops::Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let (rupees, paise) = (self.0 / 100, self.0 % 100);

        if paise == 0 {
            write!(fmt, "{}", rupees)
        } else {
            write!(fmt, "{}.{:02}", rupees, paise)
        }
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(v: &str) -> Result<Amount, ParseAmountError> {
        let invalid = || ParseAmountError(v.to_string());
        let v = v.trim();
        let (whole, fraction) = match v.find('.') {
            Some(inx) if inx + 1 < v.len() => (&v[..inx], &v[inx + 1..]),
            Some(_) => return Err(invalid()),
            None => (v, ""),
        };

        if whole.is_empty()
        || fraction.len() > 2
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let rupees = whole.parse::<u64>().map_err(|_| invalid())?;
        let paise = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };

        rupees.checked_mul(100)
            .and_then(|v| v.checked_add(paise))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "payment:amount:invalid", status = "BAD_REQUEST")]
#[fail(display = "Invalid amount: {}", _0)]
pub struct ParseAmountError(pub String);

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
        let v = String::deserialize(d)?;
        v.parse().map_err(D::Error::custom)
    }
}
