#![allow(dead_code)]

mod mock;
mod support;

pub use self::{
    mock::{FailingNotifier, RecordingNotifier},
    support::{Harness, TestResult, manuscript, run_test},
};
