//! Memory calculator for MySQL server variables.
//!
//! The [`session::Session`] owns the current variable values; totals and
//! advisory warnings are pulled from it after every change.

pub mod calculator;
pub mod cli;
pub mod config;
pub mod repl;
pub mod report;
pub mod session;
pub mod units;
pub mod utils;
pub mod variables;
