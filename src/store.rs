//! Artifact lookup and naming
//!
//! The ranking core never touches storage. It resolves candidate ids through
//! [`ArtifactStore`], which callers implement over whatever cache they keep
//! (an in-memory map is the common case).

use std::collections::{BTreeMap, HashMap};

/// Kind of precomputed artifact bound to a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Chroma sequence (alignment scoring, model training)
    Sequence,
    /// Trained statistical model (likelihood scoring)
    Model,
}

impl ArtifactKind {
    /// File-name suffix used when artifacts of this kind are persisted
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Sequence => "vector",
            ArtifactKind::Model => "model",
        }
    }
}

/// Read-only lookup from candidate id to artifact
pub trait ArtifactStore<A> {
    /// Resolve `id`, or `None` if no artifact is available
    fn get(&self, id: &str) -> Option<&A>;

    /// All ids with an artifact, sorted ascending
    fn ids(&self) -> Vec<String>;
}

impl<A> ArtifactStore<A> for HashMap<String, A> {
    fn get(&self, id: &str) -> Option<&A> {
        HashMap::get(self, id)
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<A> ArtifactStore<A> for BTreeMap<String, A> {
    fn get(&self, id: &str) -> Option<&A> {
        BTreeMap::get(self, id)
    }

    fn ids(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// Candidate id for a source file name: everything before the last `.`
///
/// # Example
///
/// ```
/// use chroma_match::store::candidate_id;
///
/// assert_eq!(candidate_id("Queen - Bohemian Rhapsody.wav"), "Queen - Bohemian Rhapsody");
/// assert_eq!(candidate_id("I Feel Love (v1).mid"), "I Feel Love (v1)");
/// assert_eq!(candidate_id("no_extension"), "no_extension");
/// ```
pub fn candidate_id(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((name, _)) if !name.is_empty() => name,
        _ => file_name,
    }
}

/// Stored artifact name for a candidate id, e.g. `Queen.model`
pub fn artifact_name(id: &str, kind: ArtifactKind) -> String {
    format!("{}.{}", id, kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_round_trip() {
        let name = artifact_name("Donna Summer - I Feel Love", ArtifactKind::Sequence);
        assert_eq!(name, "Donna Summer - I Feel Love.vector");
        assert_eq!(candidate_id(&name), "Donna Summer - I Feel Love");
        assert_eq!(artifact_name("a", ArtifactKind::Model), "a.model");
    }

    #[test]
    fn test_hidden_file_keeps_name() {
        assert_eq!(candidate_id(".hidden"), ".hidden");
    }

    #[test]
    fn test_hashmap_ids_sorted() {
        let mut store: HashMap<String, u32> = HashMap::new();
        store.insert("b".to_string(), 2);
        store.insert("c".to_string(), 3);
        store.insert("a".to_string(), 1);
        assert_eq!(ArtifactStore::ids(&store), vec!["a", "b", "c"]);
        assert_eq!(ArtifactStore::get(&store, "b"), Some(&2));
        assert_eq!(ArtifactStore::get(&store, "z"), None);
    }
}
