//! Candidate pipeline workflow for recruitment event dashboards.
//!
//! The crate owns the rules that decide which stage a candidate is in, which actions a
//! reviewer may take next, and how an action is committed against the candidate store,
//! together with the stage/position scoped filtering every dashboard screen shares.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
