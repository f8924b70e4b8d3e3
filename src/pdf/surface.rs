//! Double-buffered raster surfaces
//!
//! A page renders into whichever buffer is hidden, then swaps so the finished
//! raster becomes visible in one step.

use tiny_skia::{Color, Pixmap};

use super::device::buffer_size;
use super::types::Size;

/// Which buffer of a pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Buffer {
    #[default]
    Front,
    Back,
}

impl Buffer {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// One raster buffer plus the CSS size it is displayed at
pub struct Surface {
    pixmap: Option<Pixmap>,
    css_size: Size,
    dpr: f32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            pixmap: None,
            css_size: Size::default(),
            dpr: 1.0,
        }
    }
}

impl Surface {
    /// Resize to `css_size` at `dpr` and clear to transparent.
    ///
    /// The existing allocation is reused when the buffer size is unchanged.
    pub fn prepare(&mut self, css_size: Size, dpr: f32) -> Option<&mut Pixmap> {
        let (width, height) = buffer_size(css_size, dpr);
        let reuse = self
            .pixmap
            .as_ref()
            .is_some_and(|p| p.width() == width && p.height() == height);
        if !reuse {
            self.pixmap = Pixmap::new(width, height);
        }
        self.css_size = css_size;
        self.dpr = dpr;
        let pixmap = self.pixmap.as_mut()?;
        pixmap.fill(Color::TRANSPARENT);
        Some(pixmap)
    }

    #[must_use]
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Displayed size in CSS pixels
    #[must_use]
    pub fn css_size(&self) -> Size {
        self.css_size
    }

    /// Buffer size in device pixels
    #[must_use]
    pub fn buffer_size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map_or((0, 0), |p| (p.width(), p.height()))
    }

    #[must_use]
    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixmap.is_none() || self.css_size.is_empty()
    }

    /// Release the buffer
    pub fn clear(&mut self) {
        self.pixmap = None;
        self.css_size = Size::default();
    }
}

/// Two owned surfaces, exactly one of which is visible
#[derive(Default)]
pub struct SurfacePair {
    front: Surface,
    back: Surface,
    visible: Buffer,
}

impl SurfacePair {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible_buffer(&self) -> Buffer {
        self.visible
    }

    #[must_use]
    pub fn visible(&self) -> &Surface {
        self.get(self.visible)
    }

    #[must_use]
    pub fn hidden(&self) -> &Surface {
        self.get(self.visible.other())
    }

    /// The surface the next raster pass writes into
    pub fn hidden_mut(&mut self) -> &mut Surface {
        match self.visible {
            Buffer::Front => &mut self.back,
            Buffer::Back => &mut self.front,
        }
    }

    #[must_use]
    pub fn get(&self, buffer: Buffer) -> &Surface {
        match buffer {
            Buffer::Front => &self.front,
            Buffer::Back => &self.back,
        }
    }

    /// Make the hidden surface visible, returning the new visible buffer
    pub fn swap(&mut self) -> Buffer {
        self.visible = self.visible.other();
        self.visible
    }

    /// Release both buffers
    pub fn teardown(&mut self) {
        self.front.clear();
        self.back.clear();
    }
}
