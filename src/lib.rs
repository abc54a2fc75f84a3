//! Cross-repository git activity: discovers every repository under a
//! directory, queries each with the `git` binary and merges the results
//! into one report.

pub mod aggregate;
pub mod branch;
pub mod cli;
pub mod config;
pub mod decode;
pub mod deliver;
pub mod error;
pub mod git;
pub mod history;
pub mod locate;
pub mod model;
pub mod report;
pub mod util;

pub use error::{Result, SweepError};
