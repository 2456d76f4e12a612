//! Seeding of default accounts.

use crate::{
    config::BootstrapAccount,
    db::Storage,
    models::{user::CreateUserError, NewUser, User},
};

/// Create configured default accounts.
///
/// An account is only created when no user with its role exists yet, so
/// running this repeatedly has no further effect. Returns the created users.
pub fn run(db: &dyn Storage, accounts: &[BootstrapAccount])
-> Result<Vec<User>, CreateUserError> {
    let existing = User::all(db)?;
    let mut created: Vec<User> = Vec::new();

    for account in accounts {
        let taken = existing.iter()
            .chain(created.iter())
            .any(|user| user.role == account.role);

        if taken {
            debug!("Skipping bootstrap of {}: a user with role {} exists",
                account.email, account.role);
            continue;
        }

        let user = User::create(db, NewUser {
            institution: account.institution.clone(),
            ..NewUser::new(account.name.as_str(), account.email.as_str(),
                account.role)
        })?;

        info!("Created default {} account {}", user.role, user.email);
        created.push(user);
    }

    Ok(created)
}
