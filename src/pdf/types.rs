//! Core types for page geometry and overlay rectangles

use serde::{Deserialize, Serialize};

/// Page rotation in clockwise quarter turns.
///
/// Pages only ever carry one of the four canonical rotations, so anything
/// else a provider reports is folded back to [`Rotation::None`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map a rotation in degrees to a canonical rotation.
    ///
    /// Negative and over-turned values are normalized first (`-90` is `270`).
    /// Values that are not a multiple of 90 fall back to identity.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::Cw90,
            180 => Self::Cw180,
            270 => Self::Cw270,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    /// The rotation that undoes this one
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Cw90 => Self::Cw270,
            Self::Cw180 => Self::Cw180,
            Self::Cw270 => Self::Cw90,
        }
    }

    /// Whether width and height trade places under this rotation
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

impl From<i32> for Rotation {
    fn from(degrees: i32) -> Self {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Width/height pair in pixels or points
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    #[must_use]
    pub fn area(self) -> f32 {
        self.width * self.height
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle, origin top-left, y growing downwards
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::new(
            self.x * factor,
            self.y * factor,
            self.w * factor,
            self.h * factor,
        )
    }

    #[must_use]
    pub fn right(self) -> f32 {
        self.x + self.w
    }

    #[must_use]
    pub fn bottom(self) -> f32 {
        self.y + self.h
    }

    #[must_use]
    pub fn size(self) -> Size {
        Size::new(self.w, self.h)
    }

    #[must_use]
    pub fn center(self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    #[must_use]
    pub fn contains(self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.w - other.w).abs() <= tolerance
            && (self.h - other.h).abs() <= tolerance
    }
}

/// Rectangle relative to a page's unrotated size at scale 1.
///
/// Each component is expected in `[0, 1]`. Values outside the page are
/// carried through unchanged; see [`NormRect::clamped`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub nx: f32,
    pub ny: f32,
    pub nw: f32,
    pub nh: f32,
}

impl NormRect {
    #[must_use]
    pub const fn new(nx: f32, ny: f32, nw: f32, nh: f32) -> Self {
        Self { nx, ny, nw, nh }
    }

    /// Rect in scale-1 page points, before rotation
    #[must_use]
    pub fn to_page(self, page: Size) -> Rect {
        Rect::new(
            self.nx * page.width,
            self.ny * page.height,
            self.nw * page.width,
            self.nh * page.height,
        )
    }

    #[must_use]
    pub fn from_page(rect: Rect, page: Size) -> Self {
        if page.is_empty() {
            return Self::default();
        }
        Self::new(
            rect.x / page.width,
            rect.y / page.height,
            rect.w / page.width,
            rect.h / page.height,
        )
    }

    /// Clip the rect to the unit square
    #[must_use]
    pub fn clamped(self) -> Self {
        let x0 = self.nx.clamp(0.0, 1.0);
        let y0 = self.ny.clamp(0.0, 1.0);
        let x1 = (self.nx + self.nw).clamp(0.0, 1.0);
        let y1 = (self.ny + self.nh).clamp(0.0, 1.0);
        Self::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    #[must_use]
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self::new(self.nx + dx, self.ny + dy, self.nw, self.nh)
    }

    #[must_use]
    pub fn contains(self, nx: f32, ny: f32) -> bool {
        nx >= self.nx && nx <= self.nx + self.nw && ny >= self.ny && ny <= self.ny + self.nh
    }

    /// Whether the rect extends past the page edges
    #[must_use]
    pub fn exceeds_page(self) -> bool {
        self.nx < 0.0 || self.ny < 0.0 || self.nx + self.nw > 1.0 || self.ny + self.nh > 1.0
    }
}

/// Immutable per-page geometry fetched once per document load
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page index (0-indexed)
    pub page_index: usize,
    /// Unrotated width at scale 1, in points
    pub width_pt: f32,
    /// Unrotated height at scale 1, in points
    pub height_pt: f32,
    /// The page's own rotation
    #[serde(default, rename = "rotation_deg")]
    pub rotation: Rotation,
}

impl PageGeometry {
    #[must_use]
    pub const fn new(page_index: usize, width_pt: f32, height_pt: f32, rotation: Rotation) -> Self {
        Self {
            page_index,
            width_pt,
            height_pt,
            rotation,
        }
    }

    /// Unrotated size at scale 1
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width_pt, self.height_pt)
    }

    /// Displayed size at the given zoom, rotation applied
    #[must_use]
    pub fn display_size(&self, zoom: f32) -> Size {
        super::geometry::rotated_size(self.size(), self.rotation).scale(zoom)
    }
}

/// Viewport reported by a page handle for a scale and rotation.
///
/// Width and height are in CSS pixels with rotation already applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub rotation: Rotation,
}

impl Viewport {
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_from_degrees_normalizes() {
        assert_eq!(Rotation::from_degrees(0), Rotation::None);
        assert_eq!(Rotation::from_degrees(90), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Cw270);
        assert_eq!(Rotation::from_degrees(450), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(45), Rotation::None);
    }

    #[test]
    fn rotation_inverse_composes_to_identity() {
        for rotation in [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ] {
            let sum = rotation.degrees() + rotation.inverse().degrees();
            assert_eq!(sum % 360, 0);
        }
    }

    #[test]
    fn norm_rect_clamped_clips_to_page() {
        let rect = NormRect::new(0.9, -0.1, 0.3, 0.4).clamped();
        assert!((rect.nx - 0.9).abs() < 1e-6);
        assert!((rect.ny - 0.0).abs() < 1e-6);
        assert!((rect.nw - 0.1).abs() < 1e-6);
        assert!((rect.nh - 0.3).abs() < 1e-6);
        assert!(!rect.exceeds_page());
    }

    #[test]
    fn page_geometry_deserializes_rotation_degrees() {
        let geometry: PageGeometry = serde_json::from_str(
            r#"{"page_index": 2, "width_pt": 600, "height_pt": 800, "rotation_deg": 90}"#,
        )
        .unwrap();
        assert_eq!(geometry.rotation, Rotation::Cw90);
        assert_eq!(geometry.display_size(1.0), Size::new(800.0, 600.0));
    }
}
