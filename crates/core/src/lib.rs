//! Core types for the observatory data-access layer
//!
//! This crate contains domain types shared across all other crates.

mod constants;
mod env_config;
mod modifier;
mod observation;
mod query;

pub use constants::*;
pub use env_config::*;
pub use modifier::*;
pub use observation::*;
pub use query::*;
