use failure::Fail;
use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::Action,
    db::{
        Constraint,
        DbError,
        Storage,
        models::AuditEntry,
        types::{Amount, PaymentStatus, Role, Status},
    },
    error::ApiError,
    models::{
        user::{CreateUserError, FindUserError},
        NewUser,
        Payment,
        Submission,
        User,
        UserUpdate,
    },
    permissions::{self, GateError, Operation},
};
use super::{Caller, Lifecycle, QueryError, StorageError};

/// Default number of audit log entries per page.
pub const AUDIT_PAGE_SIZE: usize = 100;

/// Dashboard statistics.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_submissions: usize,
    pub under_review: usize,
    pub accepted: usize,
    pub published: usize,
    pub pending_fee: usize,
    pub total_users: usize,
    /// Sum of all completed payments.
    pub fee_collected: Amount,
}

/// A page of the audit log.
#[derive(Clone, Debug, Serialize)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    /// Number of entries matching the query, on all pages.
    pub total: usize,
}

impl Stats {
    pub fn compute(db: &dyn Storage) -> Result<Stats, DbError> {
        let submissions = Submission::all(db)?;
        let by_status = submissions.iter().map(|s| s.status).counts();
        let count = |status: Status|
            by_status.get(&status).copied().unwrap_or(0);

        let fee_collected: Amount = Payment::all(db)?
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();

        Ok(Stats {
            total_submissions: submissions.len(),
            under_review: count(Status::UnderReview),
            accepted: count(Status::Accepted),
            published: count(Status::Published),
            pending_fee: count(Status::PendingFee),
            total_users: User::all(db)?.len(),
            fee_collected,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserLog<'a> {
    user_id: Uuid,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl Lifecycle {
    /// Get all users.
    pub fn users(&self, caller: &Caller) -> Result<Vec<User>, QueryError> {
        permissions::require(&caller.user, Operation::ManageUsers)?;
        Ok(User::all(&*self.db)?)
    }

    /// Get all active reviewers, ordered by name.
    pub fn reviewers(&self, caller: &Caller) -> Result<Vec<User>, QueryError> {
        permissions::require(&caller.user, Operation::AssignReviewer)?;
        Ok(User::reviewers(&*self.db)?)
    }

    /// Create a new account.
    pub fn create_user(&self, caller: &Caller, new: NewUser)
    -> Result<User, ManageUserError> {
        permissions::require(&caller.user, Operation::ManageUsers)?;

        let user = User::create(&*self.db, new)?;

        info!("User {} ({}) created by {}", user.email, user.role,
            caller.user.id);

        self.audit(caller, Action::UserCreated, UserLog {
            user_id: user.id,
            email: &user.email,
            role: Some(user.role),
            reason: None,
        });

        Ok(user)
    }

    /// Change a user's profile.
    pub fn update_user(&self, caller: &Caller, id: Uuid, update: UserUpdate)
    -> Result<User, ManageUserError> {
        permissions::require(&caller.user, Operation::ManageUsers)?;

        let mut user = User::by_id(&*self.db, id)?;
        user.update(&*self.db, update)?;

        self.audit(caller, Action::UserUpdated, UserLog {
            user_id: user.id,
            email: &user.email,
            role: Some(user.role),
            reason: None,
        });

        Ok(user)
    }

    /// Enable or disable a user's access to the portal.
    pub fn set_portal_access(
        &self,
        caller: &Caller,
        id: Uuid,
        enabled: bool,
        reason: Option<String>,
    ) -> Result<User, ManageUserError> {
        permissions::require(&caller.user, Operation::ManageUsers)?;

        let mut user = User::by_id(&*self.db, id)?;
        user.set_portal_access(&*self.db, enabled, reason)?;

        let action = if enabled {
            info!("Portal access enabled for {}", user.email);
            Action::PortalEnabled
        } else {
            info!("Portal access disabled for {}", user.email);
            Action::PortalDisabled
        };

        self.audit(caller, action, UserLog {
            user_id: user.id,
            email: &user.email,
            role: None,
            reason: user.disabled_reason.as_ref().map(String::as_str),
        });

        Ok(user)
    }

    /// Compute dashboard statistics.
    pub fn stats(&self, caller: &Caller) -> Result<Stats, QueryError> {
        permissions::require(&caller.user, Operation::ViewStatistics)?;
        Ok(Stats::compute(&*self.db)?)
    }

    /// Get a page of the audit log, newest entries first.
    ///
    /// `search` matches action names, case-insensitively. Pages are numbered
    /// from one.
    pub fn audit_log(
        &self,
        caller: &Caller,
        search: Option<&str>,
        page: usize,
        limit: Option<usize>,
    ) -> Result<AuditPage, QueryError> {
        permissions::require(&caller.user, Operation::ViewAuditLog)?;

        let limit = limit.filter(|&l| l > 0).unwrap_or(AUDIT_PAGE_SIZE);
        let offset = page.saturating_sub(1) * limit;
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let (entries, total) = self.audit.entries(search, offset, limit)
            .map_err(StorageError::from)?;

        Ok(AuditPage { entries, total })
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ManageUserError {
    #[fail(display = "{}", _0)]
    Gate(#[cause] #[from] GateError),
    #[fail(display = "{}", _0)]
    FindUser(#[cause] #[from] FindUserError),
    #[fail(display = "{}", _0)]
    Create(#[cause] #[from] CreateUserError),
    /// Another user already uses this email address.
    #[fail(display = "User with this email already exists")]
    #[api(code = "user:email:exists", status = "BAD_REQUEST")]
    Duplicate,
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
}

impl_from! { for ManageUserError ;
    DbError => |e| match e {
        DbError::UniqueViolation(Constraint::UserEmail) =>
            ManageUserError::Duplicate,
        e => ManageUserError::Storage(e.into()),
    },
}
