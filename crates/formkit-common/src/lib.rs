//! formkit Common - Shared types for validated form fields
//!
//! This crate provides the ambient pieces every formkit crate builds on:
//! - Error taxonomy for programming-contract violations
//! - Configuration (mutation mode, validation message overrides)
//! - Tracing subscriber initialisation
//!
//! Validation failures are never errors here: they are data, carried by
//! `ValidationResult` in `formkit-validators`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::*;
pub use error::*;
