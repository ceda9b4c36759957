//! Shared test utilities for micro-kit crates.
//!
//! This crate provides:
//! - Proptest generators for service names, paths, bodies and levels
//! - A scripted registry and an in-memory log capture
//! - Fixtures with sample payloads and discovery responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{CaptureWriter, MockRegistry};
