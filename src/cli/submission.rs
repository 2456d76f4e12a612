//! Commands for inspecting submissions.

use structopt::StructOpt;
use uuid::Uuid;

use crate::{
    Result,
    db::types::Status,
    models::{Payment, Review, Submission, User},
};
use super::{State, util::{format_time, print_table}};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List submissions
    #[structopt(name = "list")]
    List(ListOpts),
    /// Show details of a submission
    #[structopt(name = "show")]
    Show(ShowOpts),
}

pub fn main(state: &State, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List(opts) => list(state, opts),
        Command::Show(opts) => show(state, opts),
    }
}

#[derive(StructOpt)]
pub struct ListOpts {
    /// Only list submissions in this status
    #[structopt(long = "status")]
    status: Option<Status>,
}

fn list(state: &State, opts: ListOpts) -> Result<()> {
    let submissions = Submission::all(&state.db)?;

    let rows = submissions.iter()
        .filter(|s| opts.status.map_or(true, |status| s.status == status))
        .map(|s| (
            s.journal_id.as_str(),
            s.status.as_str(),
            format_time(&s.updated_at),
            s.title.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(("Journal ID", "Status", "Updated", "Title"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct ShowOpts {
    /// Journal ID or UUID of the submission
    id: String,
}

fn show(state: &State, opts: ShowOpts) -> Result<()> {
    let submission = match opts.id.parse::<Uuid>() {
        Ok(id) => Submission::by_id(&state.db, id)?,
        Err(_) => Submission::by_journal_id(&state.db, &opts.id)?,
    };
    let name = |id: Uuid| User::by_id(&state.db, id)
        .map(|user| user.name.clone())
        .unwrap_or_else(|_| id.to_string());

    println!("{} {}", submission.journal_id, submission.title);
    println!("Author:    {}", name(submission.author));
    println!("Status:    {}", submission.status);
    println!("Submitted: {}", format_time(&submission.created_at));

    if !submission.keywords.is_empty() {
        println!("Keywords:  {}", submission.keywords.join(", "));
    }

    if let Some(reviewer) = submission.assigned_reviewer {
        println!("Reviewer:  {}", name(reviewer));
    }

    for file in submission.files() {
        println!("File:      {} ({})", file.name, file.path);
    }

    println!();

    let rows = submission.timeline.iter()
        .map(|entry| (
            format_time(&entry.timestamp),
            entry.status.as_str(),
            name(entry.actor),
            entry.note.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(("Time", "Status", "By", "Note"), &rows);

    let reviews = Review::by_submission(&state.db, submission.id)?;

    if !reviews.is_empty() {
        println!();

        let rows = reviews.iter()
            .map(|review| (
                name(review.reviewer),
                if review.is_completed() { "completed" } else { "pending" },
                review.decision.map_or("", |d| d.as_str()),
                review.comments.as_ref().map_or("", String::as_str),
            ))
            .collect::<Vec<_>>();

        print_table(("Reviewer", "Status", "Decision", "Comments"), &rows);
    }

    let payments = Payment::by_submission(&state.db, submission.id)?;

    if !payments.is_empty() {
        println!();

        let rows = payments.iter()
            .map(|payment| (
                format_time(&payment.created_at),
                format!("₹{}", payment.amount),
                payment.method.as_str(),
                payment.transaction_id.as_str(),
                payment.status.as_str(),
            ))
            .collect::<Vec<_>>();

        print_table(("Time", "Amount", "Method", "Transaction", "Status"),
            &rows);
    }

    Ok(())
}
