//! Overlay compositor
//!
//! Draws selection, group and flash highlights on a transparent surface that
//! mirrors the visible raster surface. Rects come in CSS pixels; the surface
//! is in device pixels, so every draw goes through an explicit CSS-to-buffer
//! scale transform.
//!
//! Overlay drawing is cosmetic: a missing or zero-sized surface makes
//! [`OverlayCompositor::redraw`] return early instead of failing.

use log::debug;
use tiny_skia::{
    Color, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, StrokeDash, Transform,
};

use super::state::OverlayInputs;
use super::surface::{Buffer, Surface};
use super::types::{Rect, Size};

/// An RGBA color with straight alpha
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

/// Stroke parameters, width in CSS pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f32,
    pub dashed: bool,
}

/// Colors and widths for every overlay element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub selection_halo: StrokeStyle,
    pub selection_edge: StrokeStyle,
    pub group_member: StrokeStyle,
    pub group_outline: StrokeStyle,
    pub flash_fill: Rgba,
    pub flash_edge: StrokeStyle,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            selection_halo: StrokeStyle {
                color: Rgba(37, 99, 235, 90),
                width: 6.0,
                dashed: false,
            },
            selection_edge: StrokeStyle {
                color: Rgba(37, 99, 235, 255),
                width: 2.0,
                dashed: false,
            },
            group_member: StrokeStyle {
                color: Rgba(16, 185, 129, 115),
                width: 1.0,
                dashed: false,
            },
            group_outline: StrokeStyle {
                color: Rgba(245, 158, 11, 230),
                width: 2.0,
                dashed: true,
            },
            flash_fill: Rgba(250, 204, 21, 90),
            flash_edge: StrokeStyle {
                color: Rgba(234, 179, 8, 255),
                width: 2.0,
                dashed: false,
            },
        }
    }
}

/// Transparent overlay bound to the visible raster surface
#[derive(Default)]
pub struct OverlayCompositor {
    surface: Option<Pixmap>,
    css_size: Size,
    bound_to: Option<Buffer>,
    style: OverlayStyle,
}

impl OverlayCompositor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_style(style: OverlayStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Match the CSS size and buffer size of the visible raster surface
    pub fn bind(&mut self, surface: &Surface, buffer: Buffer) {
        let (width, height) = surface.buffer_size();
        let reuse = self
            .surface
            .as_ref()
            .is_some_and(|p| p.width() == width && p.height() == height);
        if !reuse {
            self.surface = Pixmap::new(width, height);
        }
        self.css_size = surface.css_size();
        self.bound_to = Some(buffer);
    }

    /// Buffer the overlay currently mirrors
    #[must_use]
    pub fn bound_to(&self) -> Option<Buffer> {
        self.bound_to
    }

    #[must_use]
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }

    /// CSS-to-buffer transform, `None` while unbound or empty
    #[must_use]
    pub fn transform(&self) -> Option<Transform> {
        let pixmap = self.surface.as_ref()?;
        if self.css_size.is_empty() {
            return None;
        }
        Some(Transform::from_scale(
            pixmap.width() as f32 / self.css_size.width,
            pixmap.height() as f32 / self.css_size.height,
        ))
    }

    /// Redraw from scratch. Returns whether anything was drawn.
    pub fn redraw(&mut self, inputs: &OverlayInputs) -> bool {
        let Some(transform) = self.transform() else {
            return false;
        };
        let style = self.style;
        let Some(pixmap) = self.surface.as_mut() else {
            return false;
        };
        pixmap.fill(Color::TRANSPARENT);
        if !inputs.show_marks {
            return false;
        }

        if inputs.group_outline.is_some() {
            for rect in &inputs.group_rects {
                stroke_rect(pixmap, *rect, &style.group_member, transform);
            }
        }
        if let Some(rect) = inputs.group_outline {
            stroke_rect(pixmap, rect, &style.group_outline, transform);
        }
        if let Some(rect) = inputs.selected {
            stroke_rect(pixmap, rect, &style.selection_halo, transform);
            stroke_rect(pixmap, rect, &style.selection_edge, transform);
        }
        if let Some(rect) = inputs.flash {
            fill_rect(pixmap, rect, style.flash_fill, transform);
            stroke_rect(pixmap, rect, &style.flash_edge, transform);
        }
        true
    }

    /// Draw the overlay on top of `target`, scaling if sizes differ
    pub fn composite_onto(&self, target: &mut Pixmap) {
        let Some(overlay) = self.surface.as_ref() else {
            return;
        };
        let sx = target.width() as f32 / overlay.width() as f32;
        let sy = target.height() as f32 / overlay.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        target.draw_pixmap(
            0,
            0,
            overlay.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
    }
}

fn paint_for(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0, color.1, color.2, color.3);
    paint.anti_alias = true;
    paint
}

fn stroke_rect(pixmap: &mut Pixmap, rect: Rect, style: &StrokeStyle, transform: Transform) {
    let Some(r) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) else {
        debug!("Skipping degenerate overlay rect {rect:?}");
        return;
    };
    let path = PathBuilder::from_rect(r);
    let mut stroke = Stroke {
        width: style.width,
        ..Stroke::default()
    };
    if style.dashed {
        stroke.dash = StrokeDash::new(vec![6.0, 4.0], 0.0);
    }
    pixmap.stroke_path(&path, &paint_for(style.color), &stroke, transform, None);
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: Rgba, transform: Transform) {
    let Some(r) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) else {
        return;
    };
    pixmap.fill_rect(r, &paint_for(color), transform, None);
}
