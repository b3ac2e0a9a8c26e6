//! Storage layer for the alert migration.
//!
//! [`entities`] maps both the legacy dashboard-alerting tables and the
//! unified alerting tables. [`store::Store`] opens the database and applies
//! the schema; [`crypto`] holds the secret service used for channel secure
//! settings.

pub mod crypto;
pub mod entities;
pub mod error;
pub mod store;


pub use crypto::{AesGcmSecrets, SecretService};
pub use store::{Store, TableCounts};
