//! Solar thermal simulator: a collector under a daily sun and ambient cycle,
//! a ten-layer stratified storage tank and a differential pump controller,
//! advanced on a fixed cadence and published as read-only snapshots.

pub mod config;
pub mod error;
pub mod runner;
pub mod simulation;
pub mod telemetry;

pub use error::{Result, SimError};
