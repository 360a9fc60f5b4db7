//! Decoded-image arena keyed by source id.
//!
//! Each key is written at most once: [`ImageCache::request`] hands the load
//! to exactly one caller, and [`ImageCache::complete`] ignores results for
//! keys that already settled. Entries are reference counted through
//! [`ImageCache::acquire`] / [`ImageCache::release`] and only zero-ref
//! entries are dropped by [`ImageCache::evict_unused`].

use crate::error::RenderError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded image in premultiplied RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl LoadedImage {
    /// Decode encoded bytes (PNG, JPEG, GIF).
    pub fn decode(src: &str, bytes: &[u8]) -> Result<Self, RenderError> {
        let rgba = image::load_from_memory(bytes)
            .map_err(|e| RenderError::image(src, e))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = rgba.into_raw();
        premultiply_in_place(&mut data);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        })
    }

    /// Solid-color image, handy for hosts that synthesize content.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        premultiply_in_place(&mut data);
        Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        }
    }
}

fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}

/// Resolves a source id to decoded pixels.
pub trait ImageLoader {
    fn load(&self, src: &str) -> Result<LoadedImage, RenderError>;
}

/// Loads sources as paths relative to an asset root.
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, src: &str) -> Result<LoadedImage, RenderError> {
        let path = self.root.join(src.trim_start_matches("file://"));
        let bytes = std::fs::read(&path).map_err(|e| RenderError::image(src, e))?;
        LoadedImage::decode(src, &bytes)
    }
}

// ─── Cache ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Slot {
    Loading,
    Ready(Arc<LoadedImage>),
    Failed(String),
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    refs: usize,
}

/// Load state of one source, as seen by the painter.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    Missing,
    Loading,
    Ready(Arc<LoadedImage>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, Entry>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the load for `src`. Returns `true` exactly once per key: the
    /// caller that gets `true` must eventually call [`Self::complete`].
    pub fn request(&mut self, src: &str) -> bool {
        if self.entries.contains_key(src) {
            return false;
        }
        self.entries.insert(
            src.to_string(),
            Entry {
                slot: Slot::Loading,
                refs: 0,
            },
        );
        true
    }

    /// Settle a pending load. Returns `false` (and changes nothing) if the
    /// key was never requested or has already settled.
    pub fn complete(&mut self, src: &str, result: Result<LoadedImage, RenderError>) -> bool {
        let Some(entry) = self.entries.get_mut(src) else {
            return false;
        };
        if !matches!(entry.slot, Slot::Loading) {
            return false;
        }
        entry.slot = match result {
            Ok(img) => Slot::Ready(Arc::new(img)),
            Err(e) => {
                log::warn!("image `{src}` failed to load, drawing placeholder: {e}");
                Slot::Failed(e.to_string())
            }
        };
        true
    }

    /// Request and synchronously load every source with `loader`.
    /// Returns how many loads failed; those render as placeholders.
    pub fn preload<'a, L: ImageLoader + ?Sized>(
        &mut self,
        sources: impl IntoIterator<Item = &'a str>,
        loader: &L,
    ) -> usize {
        let mut failed = 0;
        for src in sources {
            if self.request(src) {
                let result = loader.load(src);
                failed += usize::from(result.is_err());
                self.complete(src, result);
            }
        }
        failed
    }

    pub fn state(&self, src: &str) -> ImageState {
        match self.entries.get(src).map(|e| &e.slot) {
            None => ImageState::Missing,
            Some(Slot::Loading) => ImageState::Loading,
            Some(Slot::Ready(img)) => ImageState::Ready(Arc::clone(img)),
            Some(Slot::Failed(reason)) => ImageState::Failed(reason.clone()),
        }
    }

    /// Decoded pixels for `src`, if loaded.
    pub fn get(&self, src: &str) -> Option<Arc<LoadedImage>> {
        match self.entries.get(src).map(|e| &e.slot) {
            Some(Slot::Ready(img)) => Some(Arc::clone(img)),
            _ => None,
        }
    }

    /// Take a reference on `src`, creating a pending entry if needed.
    /// Returns `true` when the caller should start the load.
    pub fn acquire(&mut self, src: &str) -> bool {
        let needs_load = self.request(src);
        if let Some(entry) = self.entries.get_mut(src) {
            entry.refs += 1;
        }
        needs_load
    }

    pub fn release(&mut self, src: &str) {
        if let Some(entry) = self.entries.get_mut(src) {
            entry.refs = entry.refs.saturating_sub(1);
        }
    }

    pub fn ref_count(&self, src: &str) -> usize {
        self.entries.get(src).map_or(0, |e| e.refs)
    }

    /// Drop settled entries nobody holds. Pending loads are kept so their
    /// completion still has somewhere to land. Returns how many were dropped.
    pub fn evict_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| e.refs > 0 || matches!(e.slot, Slot::Loading));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::debug!("evicted {dropped} unused images");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingLoader {
        calls: Cell<usize>,
    }

    impl ImageLoader for CountingLoader {
        fn load(&self, src: &str) -> Result<LoadedImage, RenderError> {
            self.calls.set(self.calls.get() + 1);
            if src.starts_with("bad") {
                Err(RenderError::image(src, "not found"))
            } else {
                Ok(LoadedImage::solid(2, 2, [255, 0, 0, 255]))
            }
        }
    }

    #[test]
    fn each_key_loads_once() {
        let loader = CountingLoader { calls: Cell::new(0) };
        let mut cache = ImageCache::new();
        let failed = cache.preload(["a.png", "a.png", "bad.png", "b.png", "bad.png"], &loader);
        assert_eq!(failed, 1);
        assert_eq!(loader.calls.get(), 3);
        assert!(cache.get("a.png").is_some());
        assert!(matches!(cache.state("bad.png"), ImageState::Failed(_)));
        assert_eq!(cache.state("zzz.png"), ImageState::Missing);
    }

    #[test]
    fn completion_is_single_writer() {
        let mut cache = ImageCache::new();
        assert!(cache.request("x"));
        assert!(!cache.request("x"));
        assert_eq!(cache.state("x"), ImageState::Loading);
        assert!(cache.complete("x", Ok(LoadedImage::solid(1, 1, [0, 0, 0, 255]))));
        assert!(!cache.complete("x", Err(RenderError::image("x", "late"))));
        assert!(cache.get("x").is_some());
        assert!(!cache.complete("never-requested", Err(RenderError::image("n", "n"))));
    }

    #[test]
    fn eviction_respects_refcounts() {
        let mut cache = ImageCache::new();
        assert!(cache.acquire("held"));
        assert!(!cache.acquire("held"));
        cache.complete("held", Ok(LoadedImage::solid(1, 1, [1, 2, 3, 255])));
        cache.request("loose");
        cache.complete("loose", Ok(LoadedImage::solid(1, 1, [1, 2, 3, 255])));
        cache.request("pending");

        assert_eq!(cache.evict_unused(), 1);
        assert!(cache.get("held").is_some());
        assert_eq!(cache.state("pending"), ImageState::Loading);

        cache.release("held");
        assert_eq!(cache.ref_count("held"), 1);
        cache.release("held");
        cache.evict_unused();
        assert_eq!(cache.state("held"), ImageState::Missing);
    }

    #[test]
    fn solid_images_are_premultiplied() {
        let img = LoadedImage::solid(1, 1, [255, 255, 255, 128]);
        assert_eq!(img.rgba8_premul.as_slice(), &[128, 128, 128, 128]);
    }
}
