#![forbid(unsafe_code)]

pub mod agents;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod metadata;
pub mod scenarios;
pub mod utils;
pub mod workspace;
