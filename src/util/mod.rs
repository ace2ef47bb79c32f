//! Utility types and functions for the sampler.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and transform decomposition

mod error;
mod math;

pub use error::*;
pub use math::*;
