//! Commands for inspecting payments.

use structopt::StructOpt;

use crate::{
    Result,
    db::types::PaymentStatus,
    models::{Payment, Submission},
};
use super::{State, util::{format_time, print_table}};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List payments
    #[structopt(name = "list")]
    List(ListOpts),
}

pub fn main(state: &State, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List(opts) => list(state, opts),
    }
}

#[derive(StructOpt)]
pub struct ListOpts {
    /// Only list payments in this state (pending, completed or rejected)
    #[structopt(long = "status")]
    status: Option<PaymentStatus>,
}

fn list(state: &State, opts: ListOpts) -> Result<()> {
    let payments = Payment::all(&state.db)?;

    let rows = payments.iter()
        .filter(|p| opts.status.map_or(true, |status| p.status == status))
        .map(|p| (
            format_time(&p.created_at),
            Submission::by_id(&state.db, p.submission)
                .map(|s| s.journal_id.clone())
                .unwrap_or_else(|_| p.submission.to_string()),
            format!("₹{}", p.amount),
            p.method.as_str(),
            p.transaction_id.as_str(),
            p.status.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(
        ("Time", "Submission", "Amount", "Method", "Transaction", "Status"),
        &rows);

    Ok(())
}
