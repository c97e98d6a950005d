//! Common types shared across the stress generator.
//!
//! This module provides the building blocks used by every component:
//! 1. **Constants:** Byte-size units used for geometry and reporting.
//! 2. **Error Handling:** The [`ThrashError`] type, its categories and exit codes.

/// Byte-size constants.
pub mod constants;

/// Error types and their classification.
pub mod error;

pub use constants::{GIB, MIB};
pub use error::{ErrorCategory, Result, ThrashError};
