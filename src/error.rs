use failure::Fail;
use log::error;
use serde::Serialize;
use std::borrow::Cow;

pub use http::StatusCode;
pub use scriptorium_macros::ApiError;

use crate::db::DbError;

/// An error that occurred while handling a request.
pub trait ApiError: Fail {
    /// Transport-level status code.
    fn status(&self) -> StatusCode;

    /// Internal code describing this error.
    ///
    /// This code is used to identify this error outside the system, and thus
    /// should only be present for errors which are intended to be reported
    /// to the user in detail.
    fn code(&self) -> Option<Cow<str>>;
}

/// This implementation is required to make `#[cause]` on a `Box<dyn ApiError>`
/// work.
impl Fail for Box<dyn ApiError> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        (**self).cause()
    }

    fn backtrace(&self) -> Option<&failure::Backtrace> {
        (**self).backtrace()
    }
}

/// A wrapper around many types of errors, including user-facing [`ApiError`]s
/// as well as errors that should not be reported to the user in detail, such
/// as an unavailable storage backend.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Api(#[cause] Box<dyn ApiError>),
    /// Generic system error.
    #[fail(display = "{}", _0)]
    System(#[cause] std::io::Error),
    /// Error communicating with the storage collaborator.
    #[fail(display = "{}", _0)]
    Db(#[cause] DbError),
}

impl<T: ApiError> From<T> for Error {
    fn from(error: T) -> Error {
        Error::Api(Box::new(error))
    }
}

impl_from! { for Error ;
    std::io::Error => |e| Error::System(e),
    DbError => |e| Error::Db(e),
}

impl Error {
    /// Status code with which this error should be reported.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Api(err) => err.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Describe this error for a transport layer.
    ///
    /// Errors without a code are logged, and reported without any details.
    pub fn to_response(&self) -> (StatusCode, Option<ErrorResponse>) {
        match self {
            Error::Api(err) => match err.code() {
                Some(code) => (err.status(), Some(ErrorResponse {
                    error: code.into_owned(),
                    raw: err.to_string(),
                })),
                None => {
                    error!("{}", err);
                    (err.status(), None)
                }
            },
            _ => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        }
    }
}

/// Body of an error response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use crate::{
        db::types::{ParseStatusError, Role},
        permissions::{GateError, Operation},
    };
    use super::*;

    #[test]
    fn coded_errors_are_described() {
        let err = Error::from(GateError::RoleNotAuthorized(
            Role::Author, Operation::VerifyPayment));
        let (status, body) = err.to_response();

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.unwrap(), ErrorResponse {
            error: "user:role-not-authorized".to_string(),
            raw: "Role author is not allowed to verify payments".to_string(),
        });

        let err = Error::from(ParseStatusError("closed".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_are_hidden() {
        let err = Error::from(DbError::Unavailable("disk full".to_string()));
        assert_eq!(err.to_response(), (StatusCode::INTERNAL_SERVER_ERROR, None));
    }
}
