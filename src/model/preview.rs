//! Local image previews
//!
//! A `Preview` is a client-only projection of a selected file. Its `url`
//! is registered with the `PreviewRegistry` immediately; the thumbnail
//! behind it is decoded on a worker thread only when first requested and
//! stays allocated until the url is revoked.

use image::{imageops::FilterType, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Thumbnail size in pixels (two pixel rows per terminal cell)
pub const THUMBNAIL_WIDTH: u32 = 24;
pub const THUMBNAIL_HEIGHT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub name: String,
    pub url: String,
}

/// Decode progress of one preview's thumbnail
#[derive(Debug)]
pub enum Thumbnail {
    NotRequested,
    Loading,
    Ready(RgbImage),
    Unavailable,
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    thumbnail: Thumbnail,
}

/// Owner of every live preview url
#[derive(Debug)]
pub struct PreviewRegistry {
    next_id: u64,
    live: HashMap<String, Entry>,
    revoked_total: usize,
    sender: Sender<(String, Option<RgbImage>)>,
    receiver: Receiver<(String, Option<RgbImage>)>,
}

impl Default for PreviewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            next_id: 0,
            live: HashMap::new(),
            revoked_total: 0,
            sender,
            receiver,
        }
    }

    /// Register a preview url for a file without reading it
    pub fn create(&mut self, path: &Path) -> Preview {
        self.next_id += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let url = format!("preview:{}/{}", self.next_id, name);

        self.live.insert(
            url.clone(),
            Entry {
                path: path.to_path_buf(),
                thumbnail: Thumbnail::NotRequested,
            },
        );
        Preview { name, url }
    }

    /// Start decoding the thumbnail for `url` unless already started
    pub fn request_thumbnail(&mut self, url: &str) {
        let Some(entry) = self.live.get_mut(url) else {
            return;
        };
        if !matches!(entry.thumbnail, Thumbnail::NotRequested) {
            return;
        }
        entry.thumbnail = Thumbnail::Loading;

        let path = entry.path.clone();
        let url = url.to_string();
        let tx = self.sender.clone();
        thread::spawn(move || {
            let _ = tx.send((url, decode_thumbnail(&path)));
        });
    }

    /// Store every thumbnail decoded since the last call
    ///
    /// Thumbnails for urls revoked in the meantime are dropped.
    /// Returns how many were stored.
    pub fn poll_thumbnails(&mut self) -> usize {
        let mut stored = 0;
        while let Ok((url, decoded)) = self.receiver.try_recv() {
            let Some(entry) = self.live.get_mut(&url) else {
                continue;
            };
            entry.thumbnail = match decoded {
                Some(img) => Thumbnail::Ready(img),
                None => Thumbnail::Unavailable,
            };
            stored += 1;
        }
        stored
    }

    /// Release a preview url; returns false if it was not live
    pub fn revoke(&mut self, url: &str) -> bool {
        if !self.is_live(url) {
            tracing::warn!(url, "revoking unknown preview url");
            return false;
        }
        self.live.remove(url);
        self.revoked_total += 1;
        true
    }

    pub fn thumbnail_state(&self, url: &str) -> Option<&Thumbnail> {
        self.live.get(url).map(|e| &e.thumbnail)
    }

    pub fn thumbnail(&self, url: &str) -> Option<&RgbImage> {
        match self.thumbnail_state(url) {
            Some(Thumbnail::Ready(img)) => Some(img),
            _ => None,
        }
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn revoked_total(&self) -> usize {
        self.revoked_total
    }
}

fn decode_thumbnail(path: &Path) -> Option<RgbImage> {
    match image::open(path) {
        Ok(img) => Some(
            img.resize(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Triangle)
                .to_rgb8(),
        ),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no thumbnail for preview");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::time::{Duration, Instant};

    /// Poll until the thumbnail for `url` leaves the loading state
    fn wait_for_thumbnail(registry: &mut PreviewRegistry, url: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            registry.poll_thumbnails();
            if !matches!(registry.thumbnail_state(url), Some(Thumbnail::Loading)) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_create_does_not_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img: RgbImage = ImageBuffer::from_pixel(200, 100, Rgb([200, 10, 10]));
        img.save(&path).unwrap();

        let mut registry = PreviewRegistry::new();
        let preview = registry.create(&path);

        assert_eq!(preview.name, "face.png");
        assert!(preview.url.starts_with("preview:"));
        assert!(matches!(
            registry.thumbnail_state(&preview.url),
            Some(Thumbnail::NotRequested)
        ));
        assert_eq!(registry.poll_thumbnails(), 0);
    }

    #[test]
    fn test_requested_thumbnail_is_decoded_within_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img: RgbImage = ImageBuffer::from_pixel(200, 100, Rgb([200, 10, 10]));
        img.save(&path).unwrap();

        let mut registry = PreviewRegistry::new();
        let preview = registry.create(&path);
        registry.request_thumbnail(&preview.url);
        registry.request_thumbnail(&preview.url);
        wait_for_thumbnail(&mut registry, &preview.url);

        let thumb = registry.thumbnail(&preview.url).unwrap();
        assert!(thumb.width() <= THUMBNAIL_WIDTH);
        assert!(thumb.height() <= THUMBNAIL_HEIGHT);
    }

    #[test]
    fn test_undecodable_file_gets_url_without_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let mut registry = PreviewRegistry::new();
        let preview = registry.create(&path);
        registry.request_thumbnail(&preview.url);
        wait_for_thumbnail(&mut registry, &preview.url);

        assert!(registry.is_live(&preview.url));
        assert!(matches!(
            registry.thumbnail_state(&preview.url),
            Some(Thumbnail::Unavailable)
        ));
        assert!(registry.thumbnail(&preview.url).is_none());
    }

    #[test]
    fn test_thumbnail_for_revoked_url_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img: RgbImage = ImageBuffer::from_pixel(4, 4, Rgb([1, 2, 3]));
        img.save(&path).unwrap();

        let mut registry = PreviewRegistry::new();
        let preview = registry.create(&path);
        registry.request_thumbnail(&preview.url);
        assert!(registry.revoke(&preview.url));

        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            assert_eq!(registry.poll_thumbnails(), 0);
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!registry.is_live(&preview.url));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_urls_are_unique_and_revoke_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.png");
        std::fs::write(&path, b"").unwrap();

        let mut registry = PreviewRegistry::new();
        let a = registry.create(&path);
        let b = registry.create(&path);
        assert_ne!(a.url, b.url);
        assert_eq!(registry.live_count(), 2);

        assert!(registry.revoke(&a.url));
        assert!(!registry.revoke(&a.url));
        assert_eq!(registry.revoked_total(), 1);
        assert!(registry.is_live(&b.url));
    }
}
