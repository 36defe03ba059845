// Frameworks: configuration, logging bootstrap and the interactive CLI.

pub mod cli;
pub mod config;
