//! Saving and loading stores.
//!
//! Two layouts carry the same three sections (vectors, strings, cfg):
//!
//! - a single MessagePack blob, see [`Sense2Vec::to_bytes`]
//! - a directory of three files, see [`Sense2Vec::to_disk`]:
//!   - `vectors.bin`: row ids and raw f32 data
//!   - `strings.json`: the interning table
//!   - `cfg`: the store config as JSON, always written
//!
//! Loading decodes every section before touching the store, so a failed
//! load leaves the previous state in place.

use sense2vec_key::KeyCodec;

use crate::{DelimitedKeys, Error, Result, Sense2Vec, StoreConfig};

const VECTORS_FILE: &str = "vectors.bin";
const STRINGS_FILE: &str = "strings.json";
const CONFIG_FILE: &str = "cfg";

/// Sections to leave out when saving or loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exclude {
    /// Skip the interning table. On load the store keeps its current table,
    /// which lets vectors be swapped under a fixed vocabulary.
    pub strings: bool,
}

impl Exclude {
    /// Save and load everything.
    pub const NONE: Self = Self { strings: false };
    /// Leave out the interning table.
    pub const STRINGS: Self = Self { strings: true };
}

/// The vector section: shape plus raw row-major data.
#[derive(serde::Serialize, serde::Deserialize)]
struct VectorsSection {
    shape: (usize, usize),
    keys: Vec<crate::KeyId>,
    data: Vec<f32>,
}

impl VectorsSection {
    fn new(vectors: &sense2vec_vectors::Vectors) -> Self {
        Self {
            shape: (vectors.len(), vectors.dim()),
            keys: vectors.row_ids().to_vec(),
            data: vectors.matrix().iter().copied().collect(),
        }
    }

    fn into_vectors(self) -> Result<sense2vec_vectors::Vectors> {
        let (rows, dim) = self.shape;
        if rows != self.keys.len() {
            return Err(Error::corrupt(format!(
                "vectors shape has {rows} rows but {} keys",
                self.keys.len()
            )));
        }
        sense2vec_vectors::Vectors::from_parts(dim, self.keys, self.data)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Blob {
    vectors: VectorsSection,
    cfg: StoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strings: Option<sense2vec_strings::StringStore>,
}

/// Every section of a persisted store, decoded but not yet applied.
struct Decoded {
    vectors: sense2vec_vectors::Vectors,
    strings: Option<sense2vec_strings::StringStore>,
    cfg: StoreConfig,
}

impl Decoded {
    fn from_bytes(bytes: &[u8], exclude: Exclude) -> Result<Self> {
        let blob: Blob = rmp_serde::from_slice(bytes)
            .map_err(|e| Error::corrupt(format!("invalid store blob: {e}")))?;
        Ok(Self {
            vectors: blob.vectors.into_vectors()?,
            strings: blob.strings.filter(|_| !exclude.strings),
            cfg: blob.cfg,
        })
    }

    fn from_disk(path: &std::path::Path, exclude: Exclude) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingInputFile(path.to_path_buf()));
        }

        let vectors = sense2vec_vectors::format::read_file(&path.join(VECTORS_FILE))?;

        let strings_path = path.join(STRINGS_FILE);
        let strings = if !exclude.strings && strings_path.exists() {
            let bytes = std::fs::read(&strings_path).map_err(|e| Error::io(&strings_path, e))?;
            Some(sense2vec_strings::StringStore::from_json(&bytes)?)
        } else {
            None
        };

        let cfg_path = path.join(CONFIG_FILE);
        let cfg_bytes = match std::fs::read(&cfg_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingInputFile(cfg_path));
            }
            Err(e) => return Err(Error::io(&cfg_path, e)),
        };
        let cfg = serde_json::from_slice(&cfg_bytes)
            .map_err(|e| Error::corrupt(format!("invalid config {}: {e}", cfg_path.display())))?;

        Ok(Self {
            vectors,
            strings,
            cfg,
        })
    }
}

impl Sense2Vec<DelimitedKeys> {
    /// Load a store serialized with [`Sense2Vec::to_bytes`].
    ///
    /// Keys are split on the delimiter recorded in the blob's config.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Decoded::from_bytes(bytes, Exclude::NONE).map(Self::from_decoded)
    }

    /// Load a store saved with [`Sense2Vec::to_disk`].
    pub fn from_disk(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::from_decoded(Decoded::from_disk(path, Exclude::NONE)?);
        tracing::debug!(
            path = %path.display(),
            rows = store.len(),
            dim = store.dim(),
            "loaded store"
        );
        Ok(store)
    }

    fn from_decoded(decoded: Decoded) -> Self {
        let mut store = Self::new(decoded.vectors.dim(), decoded.cfg.clone());
        store.replace(decoded);
        store
    }
}

impl<C: KeyCodec> Sense2Vec<C> {
    /// Serialize the store into a single MessagePack blob.
    pub fn to_bytes(&self, exclude: Exclude) -> Result<Vec<u8>> {
        let blob = Blob {
            vectors: VectorsSection::new(&self.vectors),
            cfg: self.cfg.clone(),
            strings: (!exclude.strings).then(|| self.strings.clone()),
        };
        rmp_serde::to_vec_named(&blob).map_err(|e| Error::encode("store", e))
    }

    /// Replace the store's contents with a blob from [`Sense2Vec::to_bytes`].
    ///
    /// The interning table is kept when `exclude.strings` is set or the blob
    /// has no strings section. The store's codec is kept as well.
    pub fn load_bytes(&mut self, bytes: &[u8], exclude: Exclude) -> Result<&mut Self> {
        let decoded = Decoded::from_bytes(bytes, exclude)?;
        self.replace(decoded);
        Ok(self)
    }

    /// Save the store as a directory, creating it if needed.
    pub fn to_disk(&self, path: impl AsRef<std::path::Path>, exclude: Exclude) -> Result<()> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;

        sense2vec_vectors::format::write_file(&self.vectors, &path.join(VECTORS_FILE))?;

        if !exclude.strings {
            let strings_path = path.join(STRINGS_FILE);
            std::fs::write(&strings_path, self.strings.to_json()?)
                .map_err(|e| Error::io(&strings_path, e))?;
        }

        let cfg_path = path.join(CONFIG_FILE);
        let cfg = serde_json::to_vec_pretty(&self.cfg).map_err(|e| Error::encode("config", e))?;
        std::fs::write(&cfg_path, cfg).map_err(|e| Error::io(&cfg_path, e))?;

        tracing::debug!(
            path = %path.display(),
            rows = self.len(),
            dim = self.dim(),
            strings = !exclude.strings,
            "saved store"
        );
        Ok(())
    }

    /// Replace the store's contents with a directory from
    /// [`Sense2Vec::to_disk`].
    ///
    /// A missing `strings.json` keeps the current interning table.
    pub fn load_disk(
        &mut self,
        path: impl AsRef<std::path::Path>,
        exclude: Exclude,
    ) -> Result<&mut Self> {
        let path = path.as_ref();
        let decoded = Decoded::from_disk(path, exclude)?;
        self.replace(decoded);
        tracing::debug!(
            path = %path.display(),
            rows = self.len(),
            dim = self.dim(),
            "loaded store"
        );
        Ok(self)
    }

    fn replace(&mut self, decoded: Decoded) {
        if decoded.cfg.delimiter != self.cfg.delimiter {
            tracing::warn!(
                loaded = %decoded.cfg.delimiter,
                current = %self.cfg.delimiter,
                "loaded config uses a different key delimiter than this store"
            );
        }

        self.vectors = decoded.vectors;
        if let Some(strings) = decoded.strings {
            self.strings = strings;
        }
        self.cfg = decoded.cfg;

        let unresolved = self
            .vectors
            .row_ids()
            .iter()
            .filter(|&&id| self.strings.lookup_string(id).is_none())
            .count();
        if unresolved > 0 {
            tracing::warn!(unresolved, "vectors reference ids missing from the strings table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Sense2Vec {
        let mut s2v = Sense2Vec::new(3, StoreConfig::with_senses(["NOUN", "VERB"]));
        s2v.add("duck|NOUN", &[1.0, 0.5, 0.0]).unwrap();
        s2v.add("duck|VERB", &[0.0, 0.5, 1.0]).unwrap();
        s2v.add("goose|NOUN", &[0.9, 0.4, 0.1]).unwrap();
        s2v
    }

    fn assert_same(a: &Sense2Vec, b: &Sense2Vec) {
        assert_eq!(a.config(), b.config());
        assert_eq!(a.len(), b.len());
        assert_eq!(a.dim(), b.dim());
        for (key, vector) in a.items() {
            assert_eq!(b.get(key).unwrap(), vector, "vector for {key}");
            assert_eq!(a.id(key), b.id(key), "id for {key}");
        }
    }

    #[test]
    fn test_bytes_roundtrip() {
        let s2v = store();
        let bytes = s2v.to_bytes(Exclude::NONE).unwrap();
        let restored = Sense2Vec::from_bytes(&bytes).unwrap();

        assert_same(&s2v, &restored);
        assert_eq!(
            restored.get_other_senses("duck|NOUN").unwrap(),
            vec!["duck|VERB"]
        );
    }

    #[test]
    fn test_bytes_roundtrip_empty_senses() {
        let s2v = Sense2Vec::new(2, StoreConfig::default());
        let restored = Sense2Vec::from_bytes(&s2v.to_bytes(Exclude::NONE).unwrap()).unwrap();
        assert!(restored.senses().is_empty());
        assert_eq!(restored.dim(), 2);
    }

    #[test]
    fn test_bytes_without_strings_keeps_vocabulary() {
        let s2v = store();
        let bytes = s2v.to_bytes(Exclude::STRINGS).unwrap();

        // Same vocabulary, different vectors.
        let mut other = Sense2Vec::new(3, StoreConfig::default());
        for key in s2v.keys() {
            other.add(key, &[0.0, 0.0, 0.0]).unwrap();
        }
        other.load_bytes(&bytes, Exclude::NONE).unwrap();
        assert_same(&s2v, &other);

        // Excluding on load ignores a strings section that is present.
        let mut fresh = Sense2Vec::new(3, StoreConfig::default());
        fresh
            .load_bytes(&s2v.to_bytes(Exclude::NONE).unwrap(), Exclude::STRINGS)
            .unwrap();
        assert!(fresh.strings().is_empty());
        assert_eq!(fresh.keys().count(), 0);
        assert_eq!(fresh.len(), 3);
    }

    #[test]
    fn test_corrupt_bytes_leave_store_untouched() {
        let mut s2v = store();
        let err = s2v.load_bytes(b"not a store", Exclude::NONE).unwrap_err();
        assert!(matches!(err, Error::CorruptPersistedState(_)));
        assert_same(&store(), &s2v);
    }

    #[test]
    fn test_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");

        let s2v = store();
        s2v.to_disk(&path, Exclude::NONE).unwrap();
        for file in [VECTORS_FILE, STRINGS_FILE, CONFIG_FILE] {
            assert!(path.join(file).exists(), "{file} missing");
        }

        let restored = Sense2Vec::from_disk(&path).unwrap();
        assert_same(&s2v, &restored);
    }

    #[test]
    fn test_disk_always_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let s2v = Sense2Vec::new(2, StoreConfig::default());
        s2v.to_disk(dir.path(), Exclude::STRINGS).unwrap();

        assert!(!dir.path().join(STRINGS_FILE).exists());
        let cfg: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(cfg["senses"], serde_json::json!([]));
    }

    #[test]
    fn test_disk_without_strings_keeps_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let s2v = store();
        s2v.to_disk(dir.path(), Exclude::STRINGS).unwrap();

        let mut other = Sense2Vec::new(3, StoreConfig::default());
        for key in s2v.keys() {
            other.add(key, &[1.0, 1.0, 1.0]).unwrap();
        }
        other.load_disk(dir.path(), Exclude::NONE).unwrap();
        assert_same(&s2v, &other);
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();

        let err = Sense2Vec::from_disk(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::MissingInputFile(_)));

        let err = Sense2Vec::from_disk(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingInputFile(p) if p.ends_with(VECTORS_FILE)));

        store().to_disk(dir.path(), Exclude::NONE).unwrap();
        std::fs::remove_file(dir.path().join(CONFIG_FILE)).unwrap();
        let mut s2v = store();
        let err = s2v.load_disk(dir.path(), Exclude::NONE).unwrap_err();
        assert!(matches!(err, Error::MissingInputFile(p) if p.ends_with(CONFIG_FILE)));
        assert_same(&store(), &s2v);
    }

    #[test]
    fn test_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        store().to_disk(dir.path(), Exclude::NONE).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), b"{\"senses\": 3}").unwrap();

        let err = Sense2Vec::from_disk(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptPersistedState(_)));
    }

    #[test]
    fn test_loaded_delimiter_drives_codec() {
        let cfg = StoreConfig {
            senses: vec!["NOUN".into(), "VERB".into()],
            delimiter: '#',
        };
        let mut s2v = Sense2Vec::new(1, cfg);
        s2v.add("duck#NOUN", &[1.0]).unwrap();
        s2v.add("duck#VERB", &[2.0]).unwrap();

        let restored = Sense2Vec::from_bytes(&s2v.to_bytes(Exclude::NONE).unwrap()).unwrap();
        assert_eq!(restored.codec().delimiter(), '#');
        assert_eq!(
            restored.get_other_senses("duck#NOUN").unwrap(),
            vec!["duck#VERB"]
        );
    }
}
