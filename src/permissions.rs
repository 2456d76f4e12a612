//! Role gate.
//!
//! Decides which users may perform which operations. Refusals are reported
//! as [`GateError`]s, all of which are transported as 403; the distinct
//! variants and log lines exist for observability.

use failure::Fail;
use std::fmt;
use uuid::Uuid;

use crate::{
    db::types::Role,
    error::ApiError,
    models::User,
};

bitflags! {
    /// A set of roles.
    pub struct RoleSet: u8 {
        const AUTHOR = 0x01;
        const REVIEWER = 0x02;
        const EDITOR = 0x04;
        const ADMIN = 0x08;
        /// Roles managing the editorial process.
        const PRIVILEGED = Self::EDITOR.bits | Self::ADMIN.bits;
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> RoleSet {
        match role {
            Role::Author => RoleSet::AUTHOR,
            Role::Reviewer => RoleSet::REVIEWER,
            Role::Editor => RoleSet::EDITOR,
            Role::Admin => RoleSet::ADMIN,
        }
    }
}

/// Operations subject to the role gate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    CreateSubmission,
    ViewOwnSubmissions,
    ViewAllSubmissions,
    /// View a single submission. Authors can only view their own, and
    /// reviewers only those assigned to them.
    ViewSubmission,
    UpdateStatus,
    AssignReviewer,
    DeleteSubmission,
    ForwardComment,
    /// Authors can only revise their own submissions.
    UploadRevision,
    /// Reviewers can only submit their own reviews.
    SubmitReview,
    ViewAssignedReviews,
    ToggleAvailability,
    /// Authors can only pay for their own submissions.
    CreatePayment,
    VerifyPayment,
    ViewOwnPayments,
    ViewAllPayments,
    ViewNotifications,
    ManageUsers,
    ViewStatistics,
    ViewAuditLog,
}

impl Operation {
    /// Roles allowed to perform this operation.
    pub fn allowed(self) -> RoleSet {
        use self::Operation::*;

        match self {
            CreateSubmission | ViewOwnSubmissions | CreatePayment
            | ViewOwnPayments => RoleSet::AUTHOR,
            SubmitReview | ViewAssignedReviews | ToggleAvailability =>
                RoleSet::REVIEWER,
            UploadRevision => RoleSet::AUTHOR | RoleSet::PRIVILEGED,
            ViewAllSubmissions | UpdateStatus | AssignReviewer
            | DeleteSubmission | ForwardComment | VerifyPayment
            | ViewAllPayments | ManageUsers | ViewStatistics =>
                RoleSet::PRIVILEGED,
            ViewAuditLog => RoleSet::ADMIN,
            ViewSubmission | ViewNotifications => RoleSet::all(),
        }
    }

    /// Is a role allowed to perform this operation?
    pub fn permits(self, role: Role) -> bool {
        self.allowed().contains(role.into())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::Operation::*;

        fmt.write_str(match *self {
            CreateSubmission => "create submissions",
            ViewOwnSubmissions => "view own submissions",
            ViewAllSubmissions => "view all submissions",
            ViewSubmission => "view this submission",
            UpdateStatus => "update submission status",
            AssignReviewer => "assign reviewers",
            DeleteSubmission => "delete submissions",
            ForwardComment => "forward reviewer comments",
            UploadRevision => "upload revisions",
            SubmitReview => "submit reviews",
            ViewAssignedReviews => "view assigned reviews",
            ToggleAvailability => "change reviewer availability",
            CreatePayment => "submit payments",
            VerifyPayment => "verify payments",
            ViewOwnPayments => "view own payments",
            ViewAllPayments => "view all payments",
            ViewNotifications => "view notifications",
            ManageUsers => "manage users",
            ViewStatistics => "view statistics",
            ViewAuditLog => "view the audit log",
        })
    }
}

/// Verify that a user may perform an operation.
pub fn require(user: &User, operation: Operation) -> Result<(), GateError> {
    if !user.active {
        trace!("Refusing {} to {}: account deactivated", operation, user.id);
        return Err(GateError::Inactive);
    }

    if user.portal_disabled {
        trace!("Refusing {} to {}: portal access disabled", operation, user.id);
        let reason = match user.disabled_reason {
            Some(ref reason) if !reason.trim().is_empty() => reason.clone(),
            _ => "Contact admin".to_string(),
        };
        return Err(GateError::PortalDisabled(reason));
    }

    if !operation.permits(user.role) {
        trace!("Refusing {} to {}: role {} not authorized",
            operation, user.id, user.role);
        return Err(GateError::RoleNotAuthorized(user.role, operation));
    }

    Ok(())
}

/// Verify that a user may perform an operation on a resource owned by
/// `owner`.
///
/// Privileged users are not subject to ownership checks.
pub fn require_owner(user: &User, operation: Operation, owner: Uuid)
-> Result<(), GateError> {
    require(user, operation)?;

    if user.role.is_privileged() || user.id == owner {
        Ok(())
    } else {
        trace!("Refusing {} to {}: resource owned by {}",
            operation, user.id, owner);
        Err(GateError::AccessDenied(operation))
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum GateError {
    /// User's role is not allowed to perform an operation.
    #[api(code = "user:role-not-authorized", status = "FORBIDDEN")]
    #[fail(display = "Role {} is not allowed to {}", _0, _1)]
    RoleNotAuthorized(Role, Operation),
    /// User doesn't own the resource.
    #[api(code = "user:access-denied", status = "FORBIDDEN")]
    #[fail(display = "Access denied: not allowed to {}", _0)]
    AccessDenied(Operation),
    #[api(code = "user:inactive", status = "FORBIDDEN")]
    #[fail(display = "Account deactivated")]
    Inactive,
    #[api(code = "user:portal-disabled", status = "FORBIDDEN")]
    #[fail(display = "Portal access disabled: {}", _0)]
    PortalDisabled(String),
}

#[cfg(test)]
mod tests {
    use crate::{
        db::MemoryStorage,
        models::{NewUser, UserUpdate},
    };
    use super::*;

    fn user(db: &MemoryStorage, role: Role) -> User {
        let email = format!("{}@example.com", Uuid::new_v4());
        User::create(db, NewUser::new("Test", email, role)).unwrap()
    }

    #[test]
    fn role_table() {
        use self::Operation::*;

        let cases: &[(Operation, &[Role])] = &[
            (CreateSubmission, &[Role::Author]),
            (ViewOwnSubmissions, &[Role::Author]),
            (ViewAllSubmissions, &[Role::Admin, Role::Editor]),
            (UpdateStatus, &[Role::Admin, Role::Editor]),
            (AssignReviewer, &[Role::Admin, Role::Editor]),
            (DeleteSubmission, &[Role::Admin, Role::Editor]),
            (UploadRevision, &[Role::Author, Role::Admin, Role::Editor]),
            (SubmitReview, &[Role::Reviewer]),
            (ForwardComment, &[Role::Admin, Role::Editor]),
            (CreatePayment, &[Role::Author]),
            (VerifyPayment, &[Role::Admin, Role::Editor]),
            (ViewAuditLog, &[Role::Admin]),
        ];

        for &(operation, allowed) in cases {
            for &role in Role::ALL {
                assert_eq!(
                    operation.permits(role),
                    allowed.contains(&role),
                    "{} / {}", operation, role,
                );
            }
        }
    }

    #[test]
    fn ownership_is_distinct_from_role() {
        let db = MemoryStorage::new();
        let author = user(&db, Role::Author);
        let editor = user(&db, Role::Editor);
        let other = Uuid::new_v4();

        require_owner(&author, Operation::CreatePayment, author.id).unwrap();

        let err = require_owner(&author, Operation::CreatePayment, other)
            .unwrap_err();
        assert_eq!(err.code().unwrap(), "user:access-denied");
        assert_eq!(err.status(), http::StatusCode::FORBIDDEN);

        let err = require_owner(&editor, Operation::CreatePayment, other)
            .unwrap_err();
        assert_eq!(err.code().unwrap(), "user:role-not-authorized");
        assert_eq!(err.status(), http::StatusCode::FORBIDDEN);

        require_owner(&editor, Operation::UploadRevision, other).unwrap();
    }

    #[test]
    fn disabled_accounts_refused() {
        let db = MemoryStorage::new();
        let mut editor = user(&db, Role::Editor);

        editor.set_portal_access(&db, false, Some("Audit".into())).unwrap();
        match require(&editor, Operation::UpdateStatus) {
            Err(GateError::PortalDisabled(ref reason)) if reason == "Audit" => (),
            r => panic!("unexpected result: {:?}", r),
        }

        editor.set_portal_access(&db, true, None).unwrap();
        editor.update(&db, UserUpdate {
            active: Some(false),
            ..UserUpdate::default()
        }).unwrap();
        match require(&editor, Operation::UpdateStatus) {
            Err(GateError::Inactive) => (),
            r => panic!("unexpected result: {:?}", r),
        }
    }
}
