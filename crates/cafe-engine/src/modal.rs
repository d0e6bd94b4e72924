//! Full-screen image modal and the scroll lock it holds while open.
//!
//! The lock is a counter, not a flag: every open modal holds a
//! [`ScrollLockGuard`] and background scrolling resumes only when the last
//! guard drops. Closing, replacing or dropping the modal releases its
//! guard, so the lock state is correct for any interleaving.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Shared lock on background scrolling.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a hold on the lock. Released when the guard drops.
    pub fn acquire(&self) -> ScrollLockGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollLockGuard {
            holders: Arc::clone(&self.holders),
        }
    }

    /// Whether any guard is alive.
    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

/// RAII hold on a [`ScrollLock`].
#[derive(Debug)]
pub struct ScrollLockGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Image shown by the modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalImage {
    pub title: String,
    /// Base64 PNG data.
    pub data: String,
}

#[derive(Debug)]
struct OpenImage {
    image: ModalImage,
    _guard: ScrollLockGuard,
}

/// Modal overlay for the analysis chart.
#[derive(Debug)]
pub struct ImageModal {
    lock: ScrollLock,
    open: Option<OpenImage>,
}

impl ImageModal {
    pub fn new(lock: ScrollLock) -> Self {
        Self { lock, open: None }
    }

    /// Show `image`, replacing whatever is shown.
    pub fn open(&mut self, image: ModalImage) {
        let guard = self.lock.acquire();
        tracing::debug!(title = %image.title, "opening image modal");
        self.open = Some(OpenImage {
            image,
            _guard: guard,
        });
    }

    /// Close the modal. Returns whether it was open.
    pub fn close(&mut self) -> bool {
        self.open.take().is_some()
    }

    /// A click on the backdrop closes the modal.
    pub fn click_outside(&mut self) -> bool {
        self.close()
    }

    /// A click on the image itself does nothing.
    pub fn click_inside(&mut self) {}

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn image(&self) -> Option<&ModalImage> {
        self.open.as_ref().map(|o| &o.image)
    }
}

/// Errors decoding chart data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart is not valid base64: {0}")]
    Base64(String),
    #[error("chart is empty")]
    Empty,
}

/// Decode base64 chart data, tolerating an optional `data:` URL prefix.
pub fn decode_chart(data: &str) -> Result<Vec<u8>, ChartError> {
    let payload = data
        .split_once("base64,")
        .map_or(data, |(_, rest)| rest)
        .trim();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ChartError::Base64(e.to_string()))?;
    if bytes.is_empty() {
        return Err(ChartError::Empty);
    }
    Ok(bytes)
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Width and height from a PNG IHDR chunk.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}
