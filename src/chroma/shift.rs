//! Pitch-class rotation
//!
//! Transposing a piece by `n` semitones moves the energy of pitch class `k`
//! to pitch class `(k + n) mod 12`. Useful for probing how a matcher reacts
//! to a transcription that is off by a semitone.

use super::{ChromaSequence, N_PITCH_CLASSES};
use crate::error::MatchError;

impl ChromaSequence {
    /// Rotate every frame by `semitones` pitch classes (negative shifts down)
    ///
    /// # Errors
    ///
    /// Returns `MatchError::DimensionMismatch` unless the sequence has 12 features.
    pub fn rotate_pitch_classes(&self, semitones: i32) -> Result<ChromaSequence, MatchError> {
        if self.n_features() != N_PITCH_CLASSES {
            return Err(MatchError::DimensionMismatch {
                expected: N_PITCH_CLASSES,
                found: self.n_features(),
            });
        }

        let shift = semitones.rem_euclid(N_PITCH_CLASSES as i32) as usize;
        log::debug!(
            "Rotating {} chroma frames by {} semitones",
            self.n_frames(),
            shift
        );

        let frames = self
            .frames()
            .iter()
            .map(|frame| {
                let mut rotated = vec![0.0f32; N_PITCH_CLASSES];
                for (k, &v) in frame.iter().enumerate() {
                    rotated[(k + shift) % N_PITCH_CLASSES] = v;
                }
                rotated
            })
            .collect();

        let rotated = ChromaSequence::from_frames(frames)?;
        Ok(match self.hop_length() {
            Some(hop) => rotated.with_hop_length(hop),
            None => rotated,
        })
    }
}
