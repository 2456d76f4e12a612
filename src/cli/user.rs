//! Commands for managing users.

use serde::Serialize;
use structopt::StructOpt;
use uuid::Uuid;

use crate::{
    Result,
    audit::Action,
    db::types::Role,
    models::{NewUser, User},
};
use super::{State, util::print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Add a new user
    #[structopt(name = "add")]
    Add(AddOpts),
    /// List users
    #[structopt(name = "list")]
    List,
    /// Disable user's access to the portal
    #[structopt(name = "disable")]
    Disable(DisableOpts),
    /// Restore user's access to the portal
    #[structopt(name = "enable")]
    Enable(EnableOpts),
}

pub fn main(state: &mut State, opts: Opts) -> Result<()> {
    match opts.command {
        Command::Add(opts) => add_user(state, opts),
        Command::List => list(state),
        Command::Disable(opts) => set_access(state, &opts.email, false,
            opts.reason),
        Command::Enable(opts) => set_access(state, &opts.email, true, None),
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

#[derive(StructOpt)]
pub struct AddOpts {
    /// User's email address
    email: String,
    /// User's name
    #[structopt(long = "name", short = "n")]
    name: String,
    /// User's role (author, reviewer, editor or admin)
    #[structopt(long = "role", short = "r", default_value = "author")]
    role: Role,
    /// User's institution
    #[structopt(long = "institution")]
    institution: Option<String>,
}

fn add_user(state: &mut State, opts: AddOpts) -> Result<()> {
    let user = User::create(&state.db, NewUser {
        institution: opts.institution,
        ..NewUser::new(opts.name, opts.email, opts.role)
    })?;

    state.audit(Action::UserCreated, UserLog {
        user_id: user.id,
        email: &user.email,
        role: Some(user.role),
        reason: None,
    });
    state.save()?;

    println!("Created user {}", user.id);

    Ok(())
}

fn list(state: &State) -> Result<()> {
    let users = User::all(&state.db)?;

    let rows = users.iter()
        .map(|user| (
            user.id.to_string(),
            user.email.as_str(),
            user.name.as_str(),
            user.role.as_str(),
            if !user.active {
                "inactive"
            } else if user.portal_disabled {
                "disabled"
            } else {
                "active"
            },
        ))
        .collect::<Vec<_>>();

    print_table(("ID", "Email", "Name", "Role", "Status"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct DisableOpts {
    /// User's email address
    email: String,
    /// Reason shown to the user
    #[structopt(long = "reason")]
    reason: Option<String>,
}

#[derive(StructOpt)]
pub struct EnableOpts {
    /// User's email address
    email: String,
}

fn set_access(state: &mut State, email: &str, enabled: bool,
    reason: Option<String>)
-> Result<()> {
    let mut user = User::by_email(&state.db, email)?;
    user.set_portal_access(&state.db, enabled, reason)?;

    let action = if enabled {
        Action::PortalEnabled
    } else {
        Action::PortalDisabled
    };

    state.audit(action, UserLog {
        user_id: user.id,
        email: &user.email,
        role: None,
        reason: user.disabled_reason.as_ref().map(String::as_str),
    });
    state.save()?;

    println!("Portal access {} for {}",
        if enabled { "enabled" } else { "disabled" }, user.email);

    Ok(())
}
