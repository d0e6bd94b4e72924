//! Hero scene state: loading flag and the scroll hint that fades out.

/// Scroll distance over which the hint fades to nothing.
pub const SCROLL_FADE_DISTANCE: f64 = 200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeroScene {
    loaded: bool,
    scroll: f64,
}

impl HeroScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene finished loading; the loading indicator goes away.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Record the page scroll offset. Negative offsets count as zero.
    pub fn set_scroll(&mut self, offset: f64) {
        self.scroll = offset.max(0.0);
    }

    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    /// Opacity of the scroll hint, `max(1 - scroll / 200, 0)`.
    pub fn hint_opacity(&self) -> f64 {
        (1.0 - self.scroll / SCROLL_FADE_DISTANCE).max(0.0)
    }
}
