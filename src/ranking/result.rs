//! Ranking result types

use serde::{Deserialize, Serialize};

use crate::scoring::ScoreOrder;

/// Whether a ranked entry carries a real score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStatus {
    /// Score computed by the scorer
    Scored,
    /// Placeholder score: the query or the candidate's artifact was unavailable
    Missing,
}

/// One candidate in a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Candidate id
    pub id: String,

    /// Score under the ranking's scorer (placeholder when `status` is `Missing`)
    ///
    /// Serialized as a number when finite, otherwise as `"inf"`, `"-inf"` or `"nan"`.
    #[serde(with = "score_repr")]
    pub score: f64,

    /// Origin of the score
    pub status: ScoreStatus,
}

/// What could not be resolved while ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// The query sequence itself was unavailable
    MissingQuery,
    /// The candidate's sequence or model was unavailable
    MissingCandidate,
}

/// Warning recorded for a candidate that could not be scored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingWarning {
    /// Candidate the warning applies to
    pub candidate_id: String,

    /// What was missing
    pub kind: WarningKind,

    /// Human-readable description
    pub message: String,
}

/// Candidates ordered best-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    /// Query the candidates were scored against
    pub query_id: String,

    /// Sort convention used
    pub order: ScoreOrder,

    /// Ranked entries, best first
    pub entries: Vec<RankedCandidate>,

    /// Unresolved artifacts, in candidate id order
    pub warnings: Vec<RankingWarning>,
}

impl Ranking {
    /// Best entry, if any
    pub fn best(&self) -> Option<&RankedCandidate> {
        self.entries.first()
    }

    /// Zero-based rank of `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Candidate ids, best first
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    /// Number of ranked entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was ranked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries, best first
    pub fn iter(&self) -> std::slice::Iter<'_, RankedCandidate> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Ranking {
    type Item = &'a RankedCandidate;
    type IntoIter = std::slice::Iter<'a, RankedCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Serde representation of scores that survives JSON for non-finite values
mod score_repr {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_f64(*score)
        } else if score.is_nan() {
            serializer.serialize_str("nan")
        } else if *score > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(ScoreVisitor)
    }

    struct ScoreVisitor;

    impl<'de> Visitor<'de> for ScoreVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or one of \"inf\", \"-inf\", \"nan\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

/// Sort entries best-first: by score under `order`, then by candidate id
pub(crate) fn sort_entries(entries: &mut [RankedCandidate], order: ScoreOrder) {
    entries.sort_by(|a, b| order.compare(a.score, b.score).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, score: f64) -> RankedCandidate {
        RankedCandidate {
            id: id.to_string(),
            score,
            status: ScoreStatus::Scored,
        }
    }

    #[test]
    fn test_ties_break_on_id() {
        let mut entries = vec![entry("c", 1.0), entry("a", 1.0), entry("b", 2.0)];
        sort_entries(&mut entries, ScoreOrder::LowerIsBetter);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);

        sort_entries(&mut entries, ScoreOrder::HigherIsBetter);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_accessors() {
        let ranking = Ranking {
            query_id: "q".to_string(),
            order: ScoreOrder::HigherIsBetter,
            entries: vec![entry("x", 3.0), entry("y", 1.0)],
            warnings: vec![],
        };
        assert_eq!(ranking.best().map(|e| e.id.as_str()), Some("x"));
        assert_eq!(ranking.position("y"), Some(1));
        assert_eq!(ranking.position("z"), None);
        assert_eq!(ranking.len(), 2);
        assert_eq!((&ranking).into_iter().count(), 2);
    }

    #[test]
    fn test_non_finite_scores_survive_json() {
        let missing = |id: &str, score: f64| RankedCandidate {
            id: id.to_string(),
            score,
            status: ScoreStatus::Missing,
        };
        let ranking = Ranking {
            query_id: "q".to_string(),
            order: ScoreOrder::LowerIsBetter,
            entries: vec![entry("x", 2.5), entry("y", 3.0), missing("absent", f64::INFINITY)],
            warnings: vec![],
        };

        let json = serde_json::to_string(&ranking).unwrap();
        assert!(json.contains(r#""score":"inf""#));
        let back: Ranking = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ranking);

        let low = missing("gone", f64::NEG_INFINITY);
        let back: RankedCandidate =
            serde_json::from_str(&serde_json::to_string(&low).unwrap()).unwrap();
        assert_eq!(back.score, f64::NEG_INFINITY);

        let back: RankedCandidate =
            serde_json::from_str(r#"{"id":"n","score":"nan","status":"Missing"}"#).unwrap();
        assert!(back.score.is_nan());

        assert!(serde_json::from_str::<RankedCandidate>(
            r#"{"id":"n","score":null,"status":"Missing"}"#
        )
        .is_err());
    }
}
