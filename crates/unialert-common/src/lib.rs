//! Shared vocabulary for the legacy and unified alerting models.

pub mod id;
pub mod types;
