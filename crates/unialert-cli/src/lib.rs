//! Command-line driver for the alert migration: configuration loading and
//! the `migrate` / `revert` / `status` commands.

pub mod commands;
pub mod config;
