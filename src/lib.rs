#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;
#[macro_use] extern crate scriptorium_macros;

pub use self::cli::main;

#[macro_use] mod macros;

pub mod audit;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod files;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod permissions;

pub type Result<T, E=failure::Error> = std::result::Result<T, E>;
