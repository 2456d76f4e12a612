use std::path::PathBuf;
use structopt::StructOpt;

use crate::{
    Result,
    audit::{self, Actor, AuditLog, RequestMeta},
    bootstrap,
    config::{self, Config},
    db::{MemoryStorage, models::AuditEntry},
    lifecycle::{Stats, AUDIT_PAGE_SIZE},
};
use self::util::{format_time, print_table};

mod payment;
mod submission;
mod user;
mod util;

#[derive(StructOpt)]
#[structopt(name = "scriptorium")]
struct Opts {
    /// Path to the configuration file
    #[structopt(long = "config", short = "c", global = true, parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Create default administrator and editor accounts
    #[structopt(name = "bootstrap")]
    Bootstrap,
    /// Manage users
    #[structopt(name = "user")]
    User(user::Opts),
    /// Inspect submissions
    #[structopt(name = "submission")]
    Submission(submission::Opts),
    /// Inspect payments
    #[structopt(name = "payment")]
    Payment(payment::Opts),
    /// Show dashboard statistics
    #[structopt(name = "stats")]
    Stats,
    /// Show the audit log
    #[structopt(name = "log")]
    Log(LogOpts),
}

pub fn main() -> Result<()> {
    let opts = Opts::from_args();
    let config = config::load(opts.config.as_ref())?;

    setup_logging(&config.logging)?;

    let mut state = State::open(&config)?;

    match opts.command {
        Command::Bootstrap => run_bootstrap(&mut state),
        Command::User(opts) => user::main(&mut state, opts),
        Command::Submission(opts) => submission::main(&state, opts),
        Command::Payment(opts) => payment::main(&state, opts),
        Command::Stats => stats(&state),
        Command::Log(opts) => show_log(&state, opts),
    }
}

fn setup_logging(config: &config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;
    Ok(())
}

/// State snapshot on which commands operate.
pub(crate) struct State {
    pub config: Config,
    pub db: MemoryStorage,
    dirty: bool,
}

impl State {
    fn open(config: &Config) -> Result<State> {
        let db = MemoryStorage::open(&config.storage.state)?;
        Ok(State {
            config: config.clone(),
            db,
            dirty: false,
        })
    }

    /// Record an administrative action performed from the command line.
    pub fn audit<D>(&mut self, action: audit::Action, details: D)
    where
        D: serde::Serialize,
    {
        audit::log(&self.db, &Actor::System, action, details,
            &RequestMeta::new(None, Some("scriptorium-cli".to_string())));
        self.dirty = true;
    }

    /// Note that the state was changed and needs to be saved.
    pub fn touch(&mut self) {
        self.dirty = true;
    }

    /// Save state if it was changed.
    pub fn save(&mut self) -> Result<()> {
        if self.dirty {
            self.db.persist(&self.config.storage.state)?;
            debug!("State saved to {}", self.config.storage.state.display());
            self.dirty = false;
        }
        Ok(())
    }
}

fn run_bootstrap(state: &mut State) -> Result<()> {
    let created = bootstrap::run(&state.db, &state.config.bootstrap)?;

    if created.is_empty() {
        println!("Nothing to do");
        return Ok(());
    }

    for user in &created {
        println!("Created {} {} ({})", user.role, user.email, user.id);
    }

    state.touch();
    state.save()
}

fn stats(state: &State) -> Result<()> {
    let stats = Stats::compute(&state.db)?;

    let rows = vec![
        ("Total submissions", stats.total_submissions.to_string()),
        ("Under review", stats.under_review.to_string()),
        ("Accepted", stats.accepted.to_string()),
        ("Published", stats.published.to_string()),
        ("Pending fee", stats.pending_fee.to_string()),
        ("Total users", stats.total_users.to_string()),
        ("Fee collected", format!("₹{}", stats.fee_collected)),
    ];

    print_table(("Statistic", "Value"), &rows);

    Ok(())
}

#[derive(StructOpt)]
struct LogOpts {
    /// Only show entries mentioning this text
    #[structopt(long = "search", short = "s")]
    search: Option<String>,
    /// Page to show, starting from 1
    #[structopt(long = "page", short = "p", default_value = "1")]
    page: usize,
    /// Number of entries per page
    #[structopt(long = "limit", short = "l")]
    limit: Option<usize>,
}

fn show_log(state: &State, opts: LogOpts) -> Result<()> {
    let limit = opts.limit.filter(|&l| l > 0).unwrap_or(AUDIT_PAGE_SIZE);
    let offset = opts.page.saturating_sub(1) * limit;
    let (entries, total) = state.db.entries(
        opts.search.as_ref().map(String::as_str), offset, limit)?;

    let rows = entries.iter()
        .map(|entry: &AuditEntry| (
            format_time(&entry.timestamp),
            entry.actor_email.clone().unwrap_or_else(|| "system".to_string()),
            entry.action.clone(),
            entry.details.to_string(),
        ))
        .collect::<Vec<_>>();

    print_table(("Time", "Actor", "Action", "Details"), &rows);
    println!("Showing {} of {} entries", entries.len(), total);

    Ok(())
}
