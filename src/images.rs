//! Image handles and the reference → image lookup.
//!
//! The renderer only ever sees a resolved [`LabelImage`] or nothing. Loading
//! and decoding are done up front by the caller; [`ImageCache::load_dir`] is
//! the helper the CLI uses for a folder of `<reference>.<ext>` files.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{LabelError, Result};

/// Extensions the image decoder is built for.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// What an image depicts; backends pick their scaling filter from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Product photo, smooth scaling.
    Photo,
    /// Barcode symbol, nearest-neighbour scaling keeps bar edges sharp.
    Symbol,
}

/// A decoded, ready-to-draw image. Cloning shares the pixels.
#[derive(Clone)]
pub struct LabelImage {
    key: String,
    kind: ImageKind,
    pixels: Arc<DynamicImage>,
}

impl LabelImage {
    /// Wrap decoded pixels. `key` must identify the pixels uniquely; the PDF
    /// backend embeds each key once.
    pub fn new(key: impl Into<String>, kind: ImageKind, pixels: DynamicImage) -> Self {
        Self {
            key: key.into(),
            kind,
            pixels: Arc::new(pixels),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl fmt::Debug for LabelImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelImage")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Caller-owned map from product reference to decoded image.
#[derive(Debug, Default, Clone)]
pub struct ImageCache {
    images: HashMap<String, LabelImage>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded photo for `reference`, replacing any previous one.
    pub fn insert(&mut self, reference: impl Into<String>, pixels: DynamicImage) {
        let reference = reference.into();
        let image = LabelImage::new(format!("photo:{reference}"), ImageKind::Photo, pixels);
        self.images.insert(reference, image);
    }

    /// Decode `bytes` and register them for `reference`.
    pub fn insert_bytes(&mut self, reference: &str, bytes: &[u8]) -> Result<()> {
        let pixels = image::load_from_memory(bytes).map_err(|e| LabelError::ImageDecode {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
        self.insert(reference, pixels);
        Ok(())
    }

    /// Look up the image for a product. A miss is the normal "no image" case.
    pub fn resolve(&self, reference: &str) -> Option<&LabelImage> {
        self.images.get(reference)
    }

    pub fn remove(&mut self, reference: &str) -> Option<LabelImage> {
        self.images.remove(reference)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load every image file in `dir`, keyed by file stem.
    ///
    /// Non-image files are ignored. Files that fail to decode are logged and
    /// skipped so their labels fall back to the placeholder.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut cache = Self::new();
        let mut entries: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_image_file(name) {
                log::debug!("Ignoring non-image file {}", path.display());
                continue;
            }
            let Some(reference) = reference_from_filename(name) else {
                continue;
            };
            let bytes = match fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    log::warn!("Skipping image {}: {e}", path.display());
                    continue;
                }
            };
            if let Err(e) = cache.insert_bytes(&reference, &bytes) {
                log::warn!("Skipping image {}: {e}", path.display());
            }
        }

        log::info!("Loaded {} product image(s) from {}", cache.len(), dir.display());
        Ok(cache)
    }
}

/// True when the file extension is one the decoder handles.
pub fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// The product reference a file name stands for: the name without its
/// extension. Returns `None` for an empty stem.
pub fn reference_from_filename(name: &str) -> Option<String> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "price-tags-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reference_is_file_stem() {
        assert_eq!(reference_from_filename("ABC-12.png").as_deref(), Some("ABC-12"));
        assert_eq!(reference_from_filename("v1.2.jpeg").as_deref(), Some("v1.2"));
        assert_eq!(reference_from_filename("noext").as_deref(), Some("noext"));
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image_file("a.PNG"));
        assert!(is_image_file("a.jpg"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("README"));
    }

    #[test]
    fn miss_resolves_to_none() {
        let mut cache = ImageCache::new();
        cache.insert("A", DynamicImage::ImageRgb8(RgbImage::new(1, 1)));
        assert!(cache.resolve("A").is_some());
        assert!(cache.resolve("B").is_none());
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let mut cache = ImageCache::new();
        let err = cache.insert_bytes("X", b"not an image").unwrap_err();
        assert!(matches!(err, LabelError::ImageDecode { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_dir_skips_junk() {
        let dir = scratch_dir("load-dir");
        RgbImage::from_pixel(4, 4, Rgb([200, 10, 10]))
            .save(dir.join("REF-1.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();
        fs::write(dir.join("broken.png"), "garbage").unwrap();

        let cache = ImageCache::load_dir(&dir).unwrap();
        assert_eq!(cache.len(), 1);
        let img = cache.resolve("REF-1").unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));
        assert_eq!(img.key(), "photo:REF-1");
        assert!(cache.resolve("broken").is_none());

        let _ = fs::remove_dir_all(&dir);
    }
}
