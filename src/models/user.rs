use chrono::Utc;
use failure::Fail;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    audit::Actor,
    db::{
        Change,
        Constraint,
        DbError,
        Storage,
        models as db,
        types::Role,
    },
    error::ApiError,
};

/// A single user in the system.
#[derive(Clone, Debug)]
pub struct User {
    data: db::User,
}

/// Data needed to create a new user.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
}

impl NewUser {
    pub fn new<N, E>(name: N, email: E, role: Role) -> NewUser
    where
        N: Into<String>,
        E: Into<String>,
    {
        NewUser {
            name: name.into(),
            email: email.into(),
            role,
            phone: None,
            institution: None,
            department: None,
            specialization: None,
        }
    }
}

/// Changes to a user's profile. Fields left as `None` are not changed.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub active: Option<bool>,
}

/// A subset of user's data that can safely be exposed to other users.
#[derive(Clone, Debug, Serialize)]
pub struct PublicData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub institution: Option<String>,
    pub specialization: Option<String>,
}

impl User {
    /// Construct `User` from its database counterpart.
    pub(crate) fn from_db(data: db::User) -> User {
        User { data }
    }

    /// Unpack database data.
    pub fn into_db(self) -> db::User {
        self.data
    }

    /// Get all users.
    pub fn all(db: &dyn Storage) -> Result<Vec<User>, DbError> {
        db.users().map(|v| v.into_iter().map(User::from_db).collect())
    }

    /// Get all active reviewers, ordered by name.
    pub fn reviewers(db: &dyn Storage) -> Result<Vec<User>, DbError> {
        let mut reviewers = db.users()?
            .into_iter()
            .filter(|u| u.role == Role::Reviewer && u.active)
            .map(User::from_db)
            .collect::<Vec<_>>();
        reviewers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(reviewers)
    }

    /// Find an user by ID.
    pub fn by_id(db: &dyn Storage, id: Uuid) -> Result<User, FindUserError> {
        db.user(id).map(User::from_db).map_err(Into::into)
    }

    /// Find an user by email address.
    pub fn by_email(db: &dyn Storage, email: &str)
    -> Result<User, FindUserError> {
        db.user_by_email(&normalize_email(email))
            .map(User::from_db)
            .map_err(Into::into)
    }

    /// Create a new user.
    pub fn create(db: &dyn Storage, new: NewUser)
    -> Result<User, CreateUserError> {
        let name = new.name.trim();
        let email = normalize_email(&new.email);

        if name.is_empty() {
            return Err(CreateUserError::Invalid("name"));
        }

        if email.is_empty() || !email.contains('@') {
            return Err(CreateUserError::Invalid("email"));
        }

        let data = db::User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role: new.role,
            phone: new.phone,
            institution: new.institution,
            department: new.department,
            specialization: new.specialization,
            available: true,
            active: true,
            portal_disabled: false,
            disabled_reason: None,
            created_at: Utc::now(),
            version: 0,
        };

        db.commit(Change::InsertUser(data.clone()).into())?;

        Ok(User::from_db(data))
    }

    /// Change user's profile.
    pub fn update(&mut self, db: &dyn Storage, update: UserUpdate)
    -> Result<(), DbError> {
        let mut data = self.data.clone();

        if let Some(name) = update.name {
            data.name = name;
        }
        if let Some(email) = update.email {
            data.email = normalize_email(&email);
        }
        if let Some(role) = update.role {
            data.role = role;
        }
        if update.phone.is_some() {
            data.phone = update.phone;
        }
        if update.institution.is_some() {
            data.institution = update.institution;
        }
        if update.department.is_some() {
            data.department = update.department;
        }
        if update.specialization.is_some() {
            data.specialization = update.specialization;
        }
        if let Some(active) = update.active {
            data.active = active;
        }

        self.save(db, data)
    }

    /// Enable or disable this user's access to the portal.
    pub fn set_portal_access(
        &mut self,
        db: &dyn Storage,
        enabled: bool,
        reason: Option<String>,
    ) -> Result<(), DbError> {
        let mut data = self.data.clone();
        data.portal_disabled = !enabled;
        data.disabled_reason = if enabled { None } else { reason };
        self.save(db, data)
    }

    /// Change whether this reviewer accepts new assignments.
    pub fn set_available(&mut self, db: &dyn Storage, available: bool)
    -> Result<(), DbError> {
        let mut data = self.data.clone();
        data.available = available;
        self.save(db, data)
    }

    fn save(&mut self, db: &dyn Storage, mut data: db::User)
    -> Result<(), DbError> {
        db.commit(Change::UpdateUser(data.clone()).into())?;
        data.version += 1;
        self.data = data;
        Ok(())
    }

    /// Can this user perform any operations?
    pub fn can_sign_in(&self) -> bool {
        self.data.active && !self.data.portal_disabled
    }

    /// Actor to which this user's actions are attributed.
    pub fn actor(&self) -> Actor {
        Actor::User {
            id: self.data.id,
            email: self.data.email.clone(),
            role: self.data.role,
        }
    }

    /// Get the public portion of this user's data.
    pub fn get_public(&self) -> PublicData {
        let db::User {
            id, ref name, ref email, role, ref institution, ref specialization,
            ..
        } = self.data;

        PublicData {
            id,
            name: name.clone(),
            email: email.clone(),
            role,
            institution: institution.clone(),
            specialization: specialization.clone(),
        }
    }
}

impl std::ops::Deref for User {
    type Target = db::User;

    fn deref(&self) -> &db::User {
        &self.data
    }
}

/// Email addresses are compared case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(ApiError, Debug, Fail)]
pub enum FindUserError {
    /// Lookup failed due to a database error.
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    /// No user found for given ID or email address.
    #[fail(display = "No such user")]
    #[api(code = "user:not-found", status = "NOT_FOUND")]
    NotFound,
}

impl_from! { for FindUserError ;
    DbError => |e| match e {
        DbError::NotFound => FindUserError::NotFound,
        e => FindUserError::Internal(e),
    },
}

#[derive(ApiError, Debug, Fail)]
pub enum CreateUserError {
    /// Creation failed due to a database error.
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] DbError),
    /// Duplicate user.
    #[fail(display = "User with this email already exists")]
    #[api(code = "user:new:exists", status = "BAD_REQUEST")]
    Duplicate,
    /// A required field is missing or malformed.
    #[fail(display = "Invalid {}", _0)]
    #[api(code = "user:new:invalid", status = "BAD_REQUEST")]
    Invalid(&'static str),
}

impl_from! { for CreateUserError ;
    DbError => |e| match e {
        DbError::UniqueViolation(Constraint::UserEmail) =>
            CreateUserError::Duplicate,
        e => CreateUserError::Internal(e),
    },
}

#[cfg(test)]
mod tests {
    use crate::db::MemoryStorage;
    use super::*;

    #[test]
    fn create_and_find() {
        let db = MemoryStorage::new();
        let user = User::create(
            &db, NewUser::new("Ana", " Ana@Example.com ", Role::Author)).unwrap();

        assert_eq!(user.email, "ana@example.com");
        assert!(user.can_sign_in());
        assert_eq!(User::by_email(&db, "ANA@example.com").unwrap().id, user.id);

        match User::create(&db, NewUser::new("Ana", "ana@example.com", Role::Editor)) {
            Err(CreateUserError::Duplicate) => (),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn portal_access() {
        let db = MemoryStorage::new();
        let mut user = User::create(
            &db, NewUser::new("Ana", "ana@example.com", Role::Author)).unwrap();

        user.set_portal_access(&db, false, Some("Unpaid fees".into())).unwrap();
        assert!(!user.can_sign_in());
        assert_eq!(user.disabled_reason.as_ref().unwrap(), "Unpaid fees");

        user.set_portal_access(&db, true, Some("ignored".into())).unwrap();
        assert!(user.can_sign_in());
        assert!(user.disabled_reason.is_none());

        let stored = User::by_id(&db, user.id).unwrap();
        assert_eq!(stored.version, user.version);
    }

    #[test]
    fn missing_user() {
        match User::by_id(&MemoryStorage::new(), Uuid::new_v4()) {
            Err(FindUserError::NotFound) => (),
            r => panic!("unexpected result: {:?}", r),
        }
    }
}
