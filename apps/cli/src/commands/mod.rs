//! Command implementations for the QCC CLI.

pub mod config;
pub mod run;
