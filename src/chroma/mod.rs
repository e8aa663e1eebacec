//! Chroma sequence representation
//!
//! Pitch-class energy time series shared by both scorers:
//! - Frames-major sequence type with validation
//! - Pitch-class rotation (transposition)

pub mod sequence;
pub mod shift;

pub use sequence::ChromaSequence;

/// Number of pitch classes in a chroma frame
pub const N_PITCH_CLASSES: usize = 12;
