use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use framelab_common::TextureKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::procedural::PROCEDURAL_PREFIX;
use crate::{AssetError, Procedural, TextureData, load_texture, procedural_texture};

/// Content-addressed texture ID computed from the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureOrigin {
    File,
    Procedural,
    /// The file was missing or unreadable and a procedural image stands in.
    Fallback,
}

#[derive(Debug, Clone)]
struct Entry {
    id: AssetId,
    origin: TextureOrigin,
}

/// Texture registry rooted at an asset directory.
///
/// Keys are resolved once and cached. Pixels are stored by content hash, so
/// keys that decode to identical images share storage.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    fallback_size: u32,
    keys: BTreeMap<TextureKey, Entry>,
    textures: BTreeMap<AssetId, TextureData>,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fallback_size: 256,
            keys: BTreeMap::new(),
            textures: BTreeMap::new(),
        }
    }

    pub fn with_fallback_size(mut self, size: u32) -> Self {
        self.fallback_size = size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load `key` without any fallback.
    pub fn load(&self, key: &TextureKey) -> Result<TextureData, AssetError> {
        if key.as_str().starts_with(PROCEDURAL_PREFIX) {
            let kind = Procedural::parse(key.as_str())?;
            return Ok(procedural_texture(kind, self.fallback_size));
        }
        load_texture(self.root.join(key.as_str()))
    }

    /// Resolve `key` to a texture, generating a stand-in when the file is
    /// missing or cannot be decoded. Never fails.
    pub fn resolve(&mut self, key: &TextureKey) -> AssetId {
        if let Some(entry) = self.keys.get(key) {
            return entry.id;
        }

        let (data, origin) = match self.load(key) {
            Ok(data) if key.as_str().starts_with(PROCEDURAL_PREFIX) => {
                (data, TextureOrigin::Procedural)
            }
            Ok(data) => (data, TextureOrigin::File),
            Err(e) => {
                warn!(key = %key, error = %e, "texture unavailable, using procedural fallback");
                let kind = Procedural::fallback_for(key);
                (procedural_texture(kind, self.fallback_size), TextureOrigin::Fallback)
            }
        };

        let id = AssetId(data.content_hash());
        if self.textures.contains_key(&id) {
            debug!(key = %key, id = id.0, "texture shares pixels with an earlier key");
        } else {
            debug!(key = %key, id = id.0, width = data.width, height = data.height, ?origin, "texture registered");
            self.textures.insert(id, data);
        }
        self.keys.insert(key.clone(), Entry { id, origin });
        id
    }

    /// Resolve every key, returning how many fell back.
    pub fn resolve_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a TextureKey>) -> usize {
        keys.into_iter()
            .filter(|k| {
                self.resolve(k);
                self.origin(k) == Some(TextureOrigin::Fallback)
            })
            .count()
    }

    pub fn get(&self, id: AssetId) -> Option<&TextureData> {
        self.textures.get(&id)
    }

    /// Texture for an already resolved key.
    pub fn texture(&self, key: &TextureKey) -> Option<&TextureData> {
        self.keys.get(key).and_then(|e| self.textures.get(&e.id))
    }

    pub fn origin(&self, key: &TextureKey) -> Option<TextureOrigin> {
        self.keys.get(key).map(|e| e.origin)
    }

    /// Number of distinct textures held.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            root: self.root.display().to_string(),
            textures: self
                .keys
                .iter()
                .filter_map(|(key, e)| {
                    let data = self.textures.get(&e.id)?;
                    Some(ManifestEntry {
                        key: key.clone(),
                        id: e.id,
                        width: data.width,
                        height: data.height,
                        origin: e.origin,
                    })
                })
                .collect(),
        }
    }

    /// Save the resolved key table to a JSON file.
    pub fn save_manifest(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.manifest())?;
        Ok(())
    }
}

/// Serializable summary of what each key resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub root: String,
    pub textures: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: TextureKey,
    pub id: AssetId,
    pub width: u32,
    pub height: u32,
    pub origin: TextureOrigin,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, rgba: [u8; 4]) {
        image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn resolves_files_from_root() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [10, 20, 30, 255]);

        let mut store = AssetStore::new(dir.path());
        let key = TextureKey::new("a.png");
        let id = store.resolve(&key);
        assert_eq!(store.origin(&key), Some(TextureOrigin::File));
        assert_eq!(store.get(id).unwrap().pixel(0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AssetStore::new(dir.path()).with_fallback_size(8);
        let key = TextureKey::new("gallery/3.png");
        store.resolve(&key);
        assert_eq!(store.origin(&key), Some(TextureOrigin::Fallback));
        assert_eq!(store.texture(&key).unwrap().width, 8);
    }

    #[test]
    fn procedural_keys_skip_the_filesystem() {
        let mut store = AssetStore::new("/nonexistent").with_fallback_size(8);
        let key = TextureKey::new("proc:checker");
        store.resolve(&key);
        assert_eq!(store.origin(&key), Some(TextureOrigin::Procedural));
    }

    #[test]
    fn identical_pixels_share_storage() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [1, 1, 1, 255]);
        write_png(dir.path(), "b.png", [1, 1, 1, 255]);
        write_png(dir.path(), "c.png", [2, 2, 2, 255]);

        let mut store = AssetStore::new(dir.path());
        let a = store.resolve(&TextureKey::new("a.png"));
        let b = store.resolve(&TextureKey::new("b.png"));
        let c = store.resolve(&TextureKey::new("c.png"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
        assert_eq!(store.key_count(), 3);
    }

    #[test]
    fn resolve_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [5, 5, 5, 255]);
        let mut store = AssetStore::new(dir.path());
        let key = TextureKey::new("a.png");
        let first = store.resolve(&key);
        std::fs::remove_file(dir.path().join("a.png")).unwrap();
        assert_eq!(store.resolve(&key), first);
        assert_eq!(store.origin(&key), Some(TextureOrigin::File));
    }

    #[test]
    fn resolve_all_counts_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [5, 5, 5, 255]);
        let mut store = AssetStore::new(dir.path()).with_fallback_size(4);
        let keys = [
            TextureKey::new("a.png"),
            TextureKey::new("missing.png"),
            TextureKey::new("proc:noise"),
        ];
        assert_eq!(store.resolve_all(&keys), 1);
    }

    #[test]
    fn save_and_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AssetStore::new(dir.path()).with_fallback_size(4);
        store.resolve(&TextureKey::new("proc:checker"));
        store.resolve(&TextureKey::new("missing.png"));

        let tmp = tempfile::NamedTempFile::new().unwrap();
        store.save_manifest(tmp.path()).unwrap();
        let loaded = Manifest::load(tmp.path()).unwrap();
        assert_eq!(loaded, store.manifest());
        assert_eq!(loaded.textures.len(), 2);
    }
}
