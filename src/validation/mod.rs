//! Result validation
//!
//! Two independent passes over a [`FrameProfile`](crate::profile::FrameProfile):
//! rule checks that can fail a result outright, and confidence scoring
//! that grades a result that passed.

pub mod checks;
pub mod confidence;

pub use checks::{validate_profile, ValidationResult, ValidationRules};
pub use confidence::{ConfidenceScorer, ConfidenceScores};
