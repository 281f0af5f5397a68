//! Error types for the motion primitives library.

use core::fmt;

/// Errors that can occur when constructing motion primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitivesError {
    /// Error for an invalid robot footprint.
    /// This variant is returned when a footprint extent is not positive and finite.
    InvalidFootprint(&'static str),
    /// Error for an invalid lattice step.
    /// This variant is returned when a move step is not positive and finite.
    InvalidStep(&'static str),
}

impl fmt::Display for PrimitivesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitivesError::InvalidFootprint(msg) => write!(f, "Invalid footprint: {}", msg),
            PrimitivesError::InvalidStep(msg) => write!(f, "Invalid move step: {}", msg),
        }
    }
}

impl core::error::Error for PrimitivesError {}
