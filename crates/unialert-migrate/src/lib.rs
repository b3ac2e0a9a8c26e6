//! Migration of legacy dashboard alerts to unified alerting, and its reversal.
//!
//! The forward pass reads every legacy alert, dashboard, ACL entry, data
//! source and notification channel ([`loader`]), places each alert's rule in
//! a folder ([`folder`]), translates its condition ([`condition`]), builds the
//! rule and its route ([`rule`], [`routing`]) and writes everything in one
//! transaction ([`commit`]). [`reversal`] deletes what the forward pass
//! created.
//!
//! [`AlertMigration::run`] takes an explicit [`Directive`]; deciding whether a
//! pass is due belongs to the caller.

pub mod commit;
pub mod condition;
pub mod error;
pub mod folder;
pub mod loader;
pub mod migrator;
pub mod reversal;
pub mod routing;
pub mod rule;

#[cfg(test)]
mod tests;

pub use error::{MigrationError, Result};
pub use migrator::{AlertMigration, Directive, ForwardSummary, Outcome};
pub use reversal::ReversalSummary;
pub use routing::RoutingConfiguration;
