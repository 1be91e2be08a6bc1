//! Texture assets for the demos.
//!
//! Textures are named by [`TextureKey`] and resolved against an asset root
//! directory. A key that cannot be loaded falls back to a procedural image so
//! every demo runs without any files on disk. Loaded pixels are content
//! addressed: two keys with identical pixels share one [`AssetId`].
//!
//! [`TextureKey`]: framelab_common::TextureKey

mod procedural;
mod store;
mod texture;

pub use procedural::{Procedural, procedural_texture};
pub use store::{AssetId, AssetStore, Manifest, ManifestEntry, TextureOrigin};
pub use texture::{TextureData, load_texture};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unknown procedural texture: {0}")]
    UnknownProcedural(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn crate_info() -> &'static str {
    "framelab-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
