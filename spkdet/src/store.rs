use std::io::{Read, Write};
use std::sync::{Arc, RwLock};

use voxid_gmm::{read_gmm, write_gmm, Gmm};

use crate::error::SpkDetError;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    model: Arc<Gmm>,
}

/// Thread-safe speaker registry keyed by id.
///
/// Entries keep their insertion order; replacing a model under an
/// existing id keeps the original position. Identification walks entries
/// in this order, so ties resolve to the earliest enrollment. Stored
/// models are immutable; adaptation swaps in a new one.
#[derive(Debug, Default)]
pub struct ModelStore {
    inner: RwLock<Vec<Entry>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the model under `id`.
    pub fn put(&self, id: &str, model: Gmm) {
        let model = Arc::new(model);
        let mut entries = self.inner.write().unwrap();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.model = model,
            None => entries.push(Entry {
                id: id.to_string(),
                model,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Gmm>> {
        let entries = self.inner.read().unwrap();
        entries.iter().find(|e| e.id == id).map(|e| e.model.clone())
    }

    /// Removes the model under `id`, reporting whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.inner.write().unwrap();
        match entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().unwrap().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }

    /// Speaker ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    /// Copies all entries out in insertion order, for scoring without
    /// holding the lock.
    pub fn snapshot(&self) -> Vec<(String, Arc<Gmm>)> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .map(|e| (e.id.clone(), e.model.clone()))
            .collect()
    }

    /// Writes the model stored under `id` in the model file format.
    pub fn serialize(&self, id: &str, w: &mut dyn Write) -> Result<(), SpkDetError> {
        let model = self
            .get(id)
            .ok_or_else(|| SpkDetError::UnknownSpeaker(id.to_string()))?;
        write_gmm(&model, w)?;
        Ok(())
    }

    /// Reads a model in the model file format and stores it under `id`.
    ///
    /// When `expected` gives a (dimension, component count) pair the model
    /// must match it; a mismatch leaves the store untouched.
    pub fn deserialize(
        &self,
        id: &str,
        r: &mut dyn Read,
        expected: Option<(usize, usize)>,
    ) -> Result<(), SpkDetError> {
        let model = read_gmm(r)?;
        if let Some((dim, k)) = expected {
            if model.dim() != dim || model.num_components() != k {
                return Err(SpkDetError::ModelFormatMismatch(format!(
                    "model '{}' is {}x{}, expected {}x{}",
                    id,
                    model.num_components(),
                    model.dim(),
                    k,
                    dim
                )));
            }
        }
        self.put(id, model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn toy_model(mean: f64) -> Gmm {
        Gmm::new(
            vec![1.0],
            vec![vec![mean, mean]],
            vec![vec![1.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let store = ModelStore::new();
        assert!(store.is_empty());
        store.put("alice", toy_model(1.0));
        store.put("bob", toy_model(2.0));
        assert_eq!(store.len(), 2);
        assert!(store.contains("alice"));
        assert_eq!(store.get("alice").unwrap().means()[0][0], 1.0);
        assert!(store.get("carol").is_none());
        assert!(store.remove("alice"));
        assert!(!store.remove("alice"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let store = ModelStore::new();
        store.put("alice", toy_model(1.0));
        store.put("bob", toy_model(2.0));
        store.put("alice", toy_model(9.0));
        assert_eq!(store.ids(), vec!["alice", "bob"]);
        assert_eq!(store.get("alice").unwrap().means()[0][0], 9.0);
    }

    #[test]
    fn test_snapshot_in_insertion_order() {
        let store = ModelStore::new();
        for (i, id) in ["x", "y", "z"].iter().enumerate() {
            store.put(id, toy_model(i as f64));
        }
        let snap = store.snapshot();
        let ids: Vec<&str> = snap.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_old_handles_survive_replacement() {
        let store = ModelStore::new();
        store.put("alice", toy_model(1.0));
        let before = store.get("alice").unwrap();
        store.put("alice", toy_model(9.0));
        assert_eq!(before.means()[0][0], 1.0);
        assert_eq!(store.get("alice").unwrap().means()[0][0], 9.0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let store = ModelStore::new();
        store.put("alice", toy_model(1.5));

        let mut bytes = Vec::new();
        store.serialize("alice", &mut bytes).unwrap();

        let back = ModelStore::new();
        back.deserialize("alice", &mut Cursor::new(&bytes), Some((2, 1)))
            .unwrap();
        let (a, b) = (store.get("alice").unwrap(), back.get("alice").unwrap());
        assert_eq!(a.means(), b.means());
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_serialize_unknown_speaker() {
        let store = ModelStore::new();
        let mut bytes = Vec::new();
        assert!(matches!(
            store.serialize("ghost", &mut bytes),
            Err(SpkDetError::UnknownSpeaker(_))
        ));
    }

    #[test]
    fn test_shape_check_on_load() {
        let src = ModelStore::new();
        src.put("alice", toy_model(1.5));
        let mut bytes = Vec::new();
        src.serialize("alice", &mut bytes).unwrap();

        let store = ModelStore::new();
        let err = store
            .deserialize("alice", &mut Cursor::new(&bytes), Some((13, 64)))
            .unwrap_err();
        assert!(matches!(err, SpkDetError::ModelFormatMismatch(_)));
        // nothing was inserted
        assert!(store.is_empty());
        // without an expectation the same bytes load fine
        store
            .deserialize("alice", &mut Cursor::new(&bytes), None)
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        let store = ModelStore::new();
        let err = store
            .deserialize("x", &mut Cursor::new(b"VOID....".to_vec()), None)
            .unwrap_err();
        assert!(matches!(err, SpkDetError::ModelFormatMismatch(_)));
        assert!(store.is_empty());
    }
}
