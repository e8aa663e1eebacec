//! Frames-major chroma sequence
//!
//! Chroma extractors conventionally emit a (pitch classes × frames) matrix.
//! Both scorers consume one observation per frame, so sequences are stored
//! frames-major and the transpose happens once, at construction, through
//! [`ChromaSequence::from_pitch_major`].

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Ordered sequence of equally-sized, non-negative feature frames
///
/// Deserialization runs the same checks as [`ChromaSequence::from_frames`];
/// a serialized `n_features` is ignored and recomputed from the frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SerializedSequence")]
pub struct ChromaSequence {
    frames: Vec<Vec<f32>>,
    n_features: usize,
    hop_length: Option<usize>,
}

#[derive(Deserialize)]
struct SerializedSequence {
    frames: Vec<Vec<f32>>,
    #[serde(default)]
    hop_length: Option<usize>,
}

impl TryFrom<SerializedSequence> for ChromaSequence {
    type Error = MatchError;

    fn try_from(raw: SerializedSequence) -> Result<Self, Self::Error> {
        let sequence = Self::from_frames(raw.frames)?;
        Ok(match raw.hop_length {
            Some(hop) => sequence.with_hop_length(hop),
            None => sequence,
        })
    }
}

impl ChromaSequence {
    /// Build a sequence from frames-major data (one inner vector per frame)
    ///
    /// # Errors
    ///
    /// Returns `MatchError::InvalidInput` if:
    /// - There are no frames, or frames have no features
    /// - Frames have differing lengths
    /// - Any value is negative or non-finite
    pub fn from_frames(frames: Vec<Vec<f32>>) -> Result<Self, MatchError> {
        if frames.is_empty() {
            return Err(MatchError::InvalidInput(
                "Empty chroma sequence".to_string(),
            ));
        }

        let n_features = frames[0].len();
        if n_features == 0 {
            return Err(MatchError::InvalidInput(
                "Chroma frames must have at least one feature".to_string(),
            ));
        }

        for (i, frame) in frames.iter().enumerate() {
            if frame.len() != n_features {
                return Err(MatchError::InvalidInput(format!(
                    "Chroma frame at index {} has {} features, expected {}",
                    i,
                    frame.len(),
                    n_features
                )));
            }
            if let Some(v) = frame.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(MatchError::InvalidInput(format!(
                    "Chroma frame at index {} contains invalid value {}",
                    i, v
                )));
            }
        }

        Ok(Self {
            frames,
            n_features,
            hop_length: None,
        })
    }

    /// Build a sequence from pitch-major data (one inner vector per feature row)
    ///
    /// This is the layout chroma extractors produce; rows are transposed into
    /// frames before validation.
    pub fn from_pitch_major(rows: &[Vec<f32>]) -> Result<Self, MatchError> {
        if rows.is_empty() {
            return Err(MatchError::InvalidInput(
                "Empty chroma matrix".to_string(),
            ));
        }

        let n_frames = rows[0].len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_frames) {
            return Err(MatchError::InvalidInput(format!(
                "Chroma row {} has {} frames, expected {}",
                i,
                row.len(),
                n_frames
            )));
        }

        let frames = (0..n_frames)
            .map(|t| rows.iter().map(|row| row[t]).collect())
            .collect();
        Self::from_frames(frames)
    }

    /// Tag the sequence with the hop length it was extracted with
    pub fn with_hop_length(mut self, hop_length: usize) -> Self {
        self.hop_length = Some(hop_length);
        self
    }

    /// Hop length tag, if known
    pub fn hop_length(&self) -> Option<usize> {
        self.hop_length
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of features per frame (12 for chroma)
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Frame at index `t`
    pub fn frame(&self, t: usize) -> &[f32] {
        &self.frames[t]
    }

    /// All frames in time order
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Pitch-major copy of the data (one vector per feature)
    pub fn to_pitch_major(&self) -> Vec<Vec<f32>> {
        (0..self.n_features)
            .map(|k| self.frames.iter().map(|frame| frame[k]).collect())
            .collect()
    }

    /// Check that `other` can be compared against `self`
    ///
    /// # Errors
    ///
    /// - `MatchError::DimensionMismatch` if feature counts differ
    /// - `MatchError::InvalidInput` if both carry different hop lengths
    pub fn ensure_comparable(&self, other: &ChromaSequence) -> Result<(), MatchError> {
        if self.n_features != other.n_features {
            return Err(MatchError::DimensionMismatch {
                expected: self.n_features,
                found: other.n_features,
            });
        }
        if let (Some(a), Some(b)) = (self.hop_length, other.hop_length) {
            if a != b {
                return Err(MatchError::InvalidInput(format!(
                    "Hop length mismatch: {} vs {}",
                    a, b
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frames_rejects_empty() {
        assert!(ChromaSequence::from_frames(vec![]).is_err());
        assert!(ChromaSequence::from_frames(vec![vec![]]).is_err());
    }

    #[test]
    fn test_from_frames_rejects_ragged() {
        let result = ChromaSequence::from_frames(vec![vec![0.1; 12], vec![0.1; 11]]);
        assert!(matches!(result, Err(MatchError::InvalidInput(_))));
    }

    #[test]
    fn test_from_frames_rejects_negative_and_nan() {
        let mut frame = vec![0.5f32; 12];
        frame[3] = -0.1;
        assert!(ChromaSequence::from_frames(vec![frame]).is_err());

        let mut frame = vec![0.5f32; 12];
        frame[7] = f32::NAN;
        assert!(ChromaSequence::from_frames(vec![frame]).is_err());
    }

    #[test]
    fn test_pitch_major_transpose() {
        // 12 rows x 3 frames, value encodes (pitch, frame)
        let rows: Vec<Vec<f32>> = (0..12)
            .map(|k| (0..3).map(|t| (k * 10 + t) as f32).collect())
            .collect();
        let seq = ChromaSequence::from_pitch_major(&rows).unwrap();

        assert_eq!(seq.n_frames(), 3);
        assert_eq!(seq.n_features(), 12);
        assert_eq!(seq.frame(2)[5], 52.0);
        assert_eq!(seq.to_pitch_major(), rows);
    }

    #[test]
    fn test_ensure_comparable() {
        let a = ChromaSequence::from_frames(vec![vec![0.0; 12]; 4]).unwrap();
        let b = ChromaSequence::from_frames(vec![vec![0.0; 10]; 4]).unwrap();
        assert_eq!(
            a.ensure_comparable(&b),
            Err(MatchError::DimensionMismatch {
                expected: 12,
                found: 10
            })
        );

        let a = a.with_hop_length(2048);
        let c = ChromaSequence::from_frames(vec![vec![0.0; 12]; 4])
            .unwrap()
            .with_hop_length(512);
        assert!(matches!(
            a.ensure_comparable(&c),
            Err(MatchError::InvalidInput(_))
        ));

        let untagged = ChromaSequence::from_frames(vec![vec![0.0; 12]; 2]).unwrap();
        assert!(a.ensure_comparable(&untagged).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let seq = ChromaSequence::from_frames(vec![vec![0.25; 12]; 3])
            .unwrap()
            .with_hop_length(2048);
        let json = serde_json::to_string(&seq).unwrap();
        let back: ChromaSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);

        let empty = r#"{"frames":[],"n_features":12,"hop_length":null}"#;
        assert!(serde_json::from_str::<ChromaSequence>(empty).is_err());

        let ragged = r#"{"frames":[[1.0,1.0],[5.0]],"n_features":12}"#;
        assert!(serde_json::from_str::<ChromaSequence>(ragged).is_err());

        let negative = r#"{"frames":[[0.5,-1.0]]}"#;
        assert!(serde_json::from_str::<ChromaSequence>(negative).is_err());
    }

    #[test]
    fn test_deserialize_recomputes_width() {
        // declared width disagrees with the frames
        let json = r#"{"frames":[[1.0,1.0],[5.0,0.0]],"n_features":12}"#;
        let seq: ChromaSequence = serde_json::from_str(json).unwrap();
        assert_eq!(seq.n_features(), 2);
        assert_eq!(seq.hop_length(), None);

        let zeros = ChromaSequence::from_frames(vec![vec![0.0; 12]; 2]).unwrap();
        assert!(matches!(
            crate::scoring::dtw_distance(&seq, &zeros),
            Err(MatchError::DimensionMismatch {
                expected: 2,
                found: 12
            })
        ));
    }
}
