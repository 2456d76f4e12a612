//! Support framework.
//!
//! This module contains the test harness wiring a [`Lifecycle`] to in-memory
//! and temporary collaborators, and helpers for running tests.

use failure::Error;
use scriptorium::{
    config::Config,
    db::{MemoryStorage, types::Role},
    files::{LocalFileStore, Upload},
    events::Notifier,
    lifecycle::{Caller, Lifecycle},
    models::{NewSubmission, NewUser, Submission, User},
};
use std::sync::Arc;
use tempfile::TempDir;

use super::mock::RecordingNotifier;

/// Only types implementing this trait can be returned from test functions.
pub trait TestResult {
    /// Convert this value into a test result.
    fn into_result(self) -> Result<(), Error>;
}

impl<T, E> TestResult for Result<T, E>
where
    Error: From<E>,
{
    fn into_result(self) -> Result<(), Error> {
        self.map(|_| ()).map_err(From::from)
    }
}

impl TestResult for () {
    fn into_result(self) -> Result<(), Error> {
        Ok(self)
    }
}

/// Run a test case against a fresh harness.
pub fn run_test<F, R>(test: F)
where
    F: FnOnce(Harness) -> R,
    R: TestResult,
{
    if let Err(err) = test(Harness::new()).into_result() {
        panic!("{}", err);
    }
}

/// A manuscript upload.
pub fn manuscript(name: &str) -> Upload {
    Upload::new(name, &b"%PDF-1.4 manuscript"[..])
}

/// A lifecycle over an empty store, with one user of each role.
pub struct Harness {
    pub db: Arc<MemoryStorage>,
    pub files: Arc<LocalFileStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub lifecycle: Lifecycle,
    pub admin: Caller,
    pub editor: Caller,
    pub author: Caller,
    pub other_author: Caller,
    pub reviewer: Caller,
    pub other_reviewer: Caller,
    _uploads: TempDir,
}

impl Harness {
    pub fn new() -> Harness {
        Harness::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Harness {
        let notifier = Arc::new(RecordingNotifier::new());
        Harness::build(config, notifier.clone(), notifier)
    }

    /// Harness whose lifecycle sends notifications through `notifier`.
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Harness {
        Harness::build(&Config::default(), Arc::new(RecordingNotifier::new()),
            notifier)
    }

    fn build(
        config: &Config,
        recorder: Arc<RecordingNotifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();

        let uploads = TempDir::new().unwrap();
        let db = Arc::new(MemoryStorage::new());
        let files = Arc::new(LocalFileStore::new(
            uploads.path(), config.storage.max_upload_size));
        let lifecycle = Lifecycle::new(
            db.clone(), files.clone(), notifier, db.clone())
            .configure(config);

        let user = |name: &str, email: &str, role| Caller::new(User::create(
            &*db, NewUser::new(name, email, role)).unwrap());

        Harness {
            admin: user("Admin", "admin@cspg.test", Role::Admin),
            editor: user("Editor", "editor@cspg.test", Role::Editor),
            author: user("Asha Rao", "author@cspg.test", Role::Author),
            other_author: user("Other", "other@cspg.test", Role::Author),
            reviewer: user("Rahul Sen", "reviewer@cspg.test", Role::Reviewer),
            other_reviewer: user("Meera Iyer", "reviewer2@cspg.test",
                Role::Reviewer),
            db,
            files,
            notifier: recorder,
            lifecycle,
            _uploads: uploads,
        }
    }

    /// Submit a manuscript as the harness's author.
    pub fn submit(&self, title: &str) -> Submission {
        self.lifecycle.create_submission(
            &self.author,
            NewSubmission {
                title: title.to_string(),
                summary: "Abstract".to_string(),
                keywords: vec!["graphs".to_string()],
                ..NewSubmission::default()
            },
            Some(manuscript("manuscript.pdf")),
        ).unwrap()
    }
}
