//! Shared test utilities for bulk-studio integration tests.
//!
//! This module provides:
//! - `TestHarness` for building image folders inside temp directories
//! - Fake transforms, generation services and credential selectors

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::*;
