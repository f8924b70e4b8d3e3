//! Pure geometry: rotation mapping, zoom fitting and scroll math
//!
//! Every function here is stateless and total over finite input. Coordinates
//! are page-local with the origin at the top-left corner and y growing down.

use super::types::{NormRect, PageGeometry, Rect, Rotation, Size};
use super::zoom::ZoomRange;

/// Map a scale-1 rect on an unrotated page of `page` size into the rotated
/// page's coordinate space.
#[must_use]
pub fn rotate_rect(rect: Rect, page: Size, rotation: Rotation) -> Rect {
    let Rect { x, y, w, h } = rect;
    match rotation {
        Rotation::None => rect,
        Rotation::Cw90 => Rect::new(y, page.width - (x + w), h, w),
        Rotation::Cw180 => Rect::new(page.width - (x + w), page.height - (y + h), w, h),
        Rotation::Cw270 => Rect::new(page.height - (y + h), x, h, w),
    }
}

/// Page size after rotation
#[must_use]
pub fn rotated_size(page: Size, rotation: Rotation) -> Size {
    if rotation.swaps_axes() {
        Size::new(page.height, page.width)
    } else {
        page
    }
}

/// Rect of a normalized mark on the displayed page at `zoom`
#[must_use]
pub fn mark_rect_at_zoom(rect: NormRect, page: &PageGeometry, zoom: f32) -> Rect {
    let size = page.size();
    rotate_rect(rect.to_page(size), size, page.rotation).scale(zoom)
}

/// Rotated scale-1 rect of a normalized mark, used for zoom fitting
#[must_use]
pub fn mark_rect_at_scale1(rect: NormRect, page: &PageGeometry) -> Rect {
    mark_rect_at_zoom(rect, page, 1.0)
}

/// Convert a rect drawn on the displayed page at `zoom` back to a normalized,
/// rotation-independent rect.
#[must_use]
pub fn display_rect_to_norm(rect: Rect, page: &PageGeometry, zoom: f32) -> NormRect {
    if !(zoom > 0.0) {
        return NormRect::default();
    }
    let size = page.size();
    let displayed = rotated_size(size, page.rotation);
    let unrotated = rotate_rect(rect.scale(1.0 / zoom), displayed, page.rotation.inverse());
    NormRect::from_page(unrotated, size)
}

/// Turn a pointer drag into a normalized rect clipped to the page.
///
/// Returns `None` when the part of the drag that lands on the page is
/// shorter than `min_drag_px` on either axis, or when `zoom` is not positive.
#[must_use]
pub fn drag_to_norm(
    start: (f32, f32),
    end: (f32, f32),
    page: &PageGeometry,
    zoom: f32,
    min_drag_px: f32,
) -> Option<NormRect> {
    if !(zoom > 0.0) || !zoom.is_finite() {
        return None;
    }
    let x0 = start.0.min(end.0);
    let y0 = start.1.min(end.1);
    let w = (start.0 - end.0).abs();
    let h = (start.1 - end.1).abs();
    if w < min_drag_px || h < min_drag_px {
        return None;
    }
    let rect = display_rect_to_norm(Rect::new(x0, y0, w, h), page, zoom).clamped();
    let shown = mark_rect_at_zoom(rect, page, zoom);
    if shown.w < min_drag_px || shown.h < min_drag_px {
        return None;
    }
    Some(rect)
}

/// Parameters for fitting a rect into a container
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    /// Extra room around the rect, as a fraction of its size on each side
    pub padding_ratio: f32,
    /// Smallest on-screen size of the rect's shorter side, in device pixels
    pub min_rendered_px: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding_ratio: 0.15,
            min_rendered_px: 40.0,
        }
    }
}

/// Pick the largest zoom at which `rect` (scale-1 size) plus padding fits in
/// `container`, raised if needed so the rect's shorter side renders at least
/// `min_rendered_px` device pixels, then clamped to `range`.
#[must_use]
pub fn compute_zoom_for_rect(
    container: Size,
    rect: Size,
    options: FitOptions,
    range: ZoomRange,
    device_pixel_ratio: f32,
) -> f32 {
    let pad = 1.0 + 2.0 * options.padding_ratio.max(0.0);
    let fit_axis = |available: f32, extent: f32| {
        if extent > 0.0 && available > 0.0 {
            Some(available / (extent * pad))
        } else {
            None
        }
    };

    let fitted = match (
        fit_axis(container.width, rect.width),
        fit_axis(container.height, rect.height),
    ) {
        (Some(zx), Some(zy)) => zx.min(zy),
        (Some(z), None) | (None, Some(z)) => z,
        (None, None) => 1.0,
    };

    let shorter = rect.width.min(rect.height);
    let dpr = if device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let legible = if shorter > 0.0 {
        options.min_rendered_px / (shorter * dpr)
    } else {
        0.0
    };

    range.clamp(fitted.max(legible))
}

/// Visible scroll area and the content it scrolls over
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollViewport {
    pub width: f32,
    pub height: f32,
    /// Width of the page at the current zoom
    pub content_width: f32,
    /// Height of the whole stacked document at the current zoom
    pub content_height: f32,
}

/// Scroll position to apply. `left` is `None` when horizontal scroll should
/// stay where it is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollTarget {
    pub top: f32,
    pub left: Option<f32>,
}

/// Center `rect` (page-local, at the current zoom) in the viewport.
#[must_use]
pub fn scroll_to_rect(page_top: f32, rect: Rect, viewport: ScrollViewport) -> ScrollTarget {
    let (cx, cy) = rect.center();

    let max_top = (viewport.content_height - viewport.height).max(0.0);
    let top = (page_top + cy - viewport.height / 2.0).clamp(0.0, max_top);

    let left = if viewport.content_width > viewport.width {
        let max_left = viewport.content_width - viewport.width;
        Some((cx - viewport.width / 2.0).clamp(0.0, max_left))
    } else {
        None
    };

    ScrollTarget { top, left }
}

/// Offset of the top of `page` in a vertically stacked document
#[must_use]
pub fn page_top_offset(page_heights: &[f32], page: usize, gap: f32) -> f32 {
    page_heights.iter().take(page).map(|&h| h + gap).sum()
}

/// Top offsets of every page in a vertically stacked document
#[must_use]
pub fn page_top_offsets(page_heights: &[f32], gap: f32) -> Vec<f32> {
    let mut offsets = Vec::with_capacity(page_heights.len());
    let mut acc = 0.0;
    for &h in page_heights {
        offsets.push(acc);
        acc += h + gap;
    }
    offsets
}

/// Total height of a stacked document, gaps between pages only
#[must_use]
pub fn document_height(page_heights: &[f32], gap: f32) -> f32 {
    let pages: f32 = page_heights.iter().sum();
    pages + gap * page_heights.len().saturating_sub(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Cw90,
        Rotation::Cw180,
        Rotation::Cw270,
    ];

    #[test]
    fn rotate_90_matches_worked_example() {
        let page = PageGeometry::new(0, 600.0, 800.0, Rotation::Cw90);
        let mark = NormRect::new(0.1, 0.2, 0.3, 0.1);

        let scale1 = mark.to_page(page.size());
        assert!(scale1.approx_eq(Rect::new(60.0, 160.0, 180.0, 80.0), 1e-3));

        let rotated = mark_rect_at_scale1(mark, &page);
        assert!(rotated.approx_eq(Rect::new(160.0, 360.0, 80.0, 180.0), 1e-3));
    }

    #[test]
    fn rotate_round_trips_for_all_rotations() {
        let page = Size::new(612.0, 792.0);
        let rect = Rect::new(31.5, 402.25, 120.0, 44.0);
        for rotation in ALL {
            let rotated = rotate_rect(rect, page, rotation);
            let back = rotate_rect(rotated, rotated_size(page, rotation), rotation.inverse());
            assert!(back.approx_eq(rect, 1e-3), "{rotation:?}: {back:?}");
        }
    }

    #[test]
    fn rotate_180_and_270() {
        let page = Size::new(600.0, 800.0);
        let rect = Rect::new(60.0, 160.0, 180.0, 80.0);
        assert_eq!(
            rotate_rect(rect, page, Rotation::Cw180),
            Rect::new(360.0, 560.0, 180.0, 80.0)
        );
        assert_eq!(
            rotate_rect(rect, page, Rotation::Cw270),
            Rect::new(560.0, 60.0, 80.0, 180.0)
        );
    }

    #[test]
    fn unknown_rotation_is_identity() {
        let page = Size::new(600.0, 800.0);
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(rotate_rect(rect, page, Rotation::from_degrees(45)), rect);
    }

    #[test]
    fn rotated_size_swaps_for_quarter_turns() {
        let page = Size::new(600.0, 800.0);
        assert_eq!(rotated_size(page, Rotation::None), page);
        assert_eq!(rotated_size(page, Rotation::Cw180), page);
        assert_eq!(rotated_size(page, Rotation::Cw90), Size::new(800.0, 600.0));
        assert_eq!(rotated_size(page, Rotation::Cw270), Size::new(800.0, 600.0));
    }

    #[test]
    fn display_rect_round_trips_through_norm() {
        for rotation in ALL {
            let page = PageGeometry::new(0, 600.0, 800.0, rotation);
            let mark = NormRect::new(0.1, 0.2, 0.3, 0.1);
            let shown = mark_rect_at_zoom(mark, &page, 1.75);
            let back = display_rect_to_norm(shown, &page, 1.75);
            assert!((back.nx - mark.nx).abs() < 1e-4, "{rotation:?}");
            assert!((back.ny - mark.ny).abs() < 1e-4, "{rotation:?}");
            assert!((back.nw - mark.nw).abs() < 1e-4, "{rotation:?}");
            assert!((back.nh - mark.nh).abs() < 1e-4, "{rotation:?}");
        }
    }

    #[test]
    fn short_drag_is_discarded() {
        let page = PageGeometry::new(0, 600.0, 800.0, Rotation::None);
        assert!(drag_to_norm((10.0, 10.0), (12.0, 80.0), &page, 1.0, 5.0).is_none());
        let rect = drag_to_norm((120.0, 400.0), (60.0, 160.0), &page, 1.0, 5.0).unwrap();
        assert!((rect.nx - 0.1).abs() < 1e-6);
        assert!((rect.ny - 0.2).abs() < 1e-6);
        assert!((rect.nw - 0.1).abs() < 1e-6);
        assert!((rect.nh - 0.3).abs() < 1e-6);
    }

    #[test]
    fn drag_mostly_off_page_is_discarded() {
        let page = PageGeometry::new(0, 100.0, 100.0, Rotation::None);
        // Entirely right of the page
        assert!(drag_to_norm((150.0, 10.0), (200.0, 40.0), &page, 1.0, 5.0).is_none());
        // Only 3px of the drag lands on the page
        assert!(drag_to_norm((97.0, 10.0), (140.0, 40.0), &page, 1.0, 5.0).is_none());
        // Same on a rotated page, where the displayed width is the page height
        let rotated = PageGeometry::new(0, 100.0, 200.0, Rotation::Cw90);
        assert!(drag_to_norm((198.0, 10.0), (260.0, 40.0), &rotated, 1.0, 5.0).is_none());
        let kept = drag_to_norm((180.0, 10.0), (260.0, 40.0), &rotated, 1.0, 5.0).unwrap();
        assert!(kept.nx + kept.nw <= 1.0 + 1e-6);
        assert!(kept.ny + kept.nh <= 1.0 + 1e-6);
    }

    #[test]
    fn drag_at_non_positive_zoom_is_discarded() {
        let page = PageGeometry::new(0, 100.0, 100.0, Rotation::None);
        assert!(drag_to_norm((10.0, 10.0), (50.0, 50.0), &page, 0.0, 5.0).is_none());
        assert!(drag_to_norm((10.0, 10.0), (50.0, 50.0), &page, -1.0, 5.0).is_none());
        assert!(drag_to_norm((10.0, 10.0), (50.0, 50.0), &page, f32::NAN, 5.0).is_none());
    }

    #[test]
    fn zoom_for_rect_fits_both_axes() {
        let options = FitOptions {
            padding_ratio: 0.0,
            min_rendered_px: 0.0,
        };
        let zoom = compute_zoom_for_rect(
            Size::new(1000.0, 500.0),
            Size::new(200.0, 200.0),
            options,
            ZoomRange::POINTER,
            1.0,
        );
        assert!((zoom - 2.5).abs() < 1e-6);
    }

    #[test]
    fn zoom_for_rect_applies_padding() {
        let options = FitOptions {
            padding_ratio: 0.25,
            min_rendered_px: 0.0,
        };
        let zoom = compute_zoom_for_rect(
            Size::new(600.0, 600.0),
            Size::new(200.0, 100.0),
            options,
            ZoomRange::POINTER,
            1.0,
        );
        // 600 / (200 * 1.5)
        assert!((zoom - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_for_rect_is_clamped() {
        let options = FitOptions::default();
        let huge = compute_zoom_for_rect(
            Size::new(1000.0, 1000.0),
            Size::new(1.0, 1.0),
            options,
            ZoomRange::POINTER,
            1.0,
        );
        assert_eq!(huge, ZoomRange::POINTER.max);

        let tiny = compute_zoom_for_rect(
            Size::new(100.0, 100.0),
            Size::new(5000.0, 5000.0),
            FitOptions {
                padding_ratio: 0.0,
                min_rendered_px: 0.0,
            },
            ZoomRange::POINTER,
            1.0,
        );
        assert_eq!(tiny, ZoomRange::POINTER.min);
    }

    #[test]
    fn zoom_for_rect_keeps_thin_marks_legible() {
        // A wide, very thin rect would fit at ~1.0 but its height would be
        // 4px on screen; the legibility floor pushes zoom up.
        let options = FitOptions {
            padding_ratio: 0.0,
            min_rendered_px: 40.0,
        };
        let zoom = compute_zoom_for_rect(
            Size::new(800.0, 600.0),
            Size::new(800.0, 10.0),
            options,
            ZoomRange::POINTER,
            2.0,
        );
        assert!((zoom - 2.0).abs() < 1e-6);
    }

    #[test]
    fn scroll_centers_rect_vertically() {
        let viewport = ScrollViewport {
            width: 800.0,
            height: 600.0,
            content_width: 700.0,
            content_height: 5000.0,
        };
        let target = scroll_to_rect(1000.0, Rect::new(100.0, 400.0, 100.0, 200.0), viewport);
        assert!((target.top - 1200.0).abs() < 1e-6);
        assert_eq!(target.left, None);
    }

    #[test]
    fn scroll_clamps_to_bounds() {
        let viewport = ScrollViewport {
            width: 400.0,
            height: 600.0,
            content_width: 1200.0,
            content_height: 1000.0,
        };
        let near_top = scroll_to_rect(0.0, Rect::new(0.0, 0.0, 10.0, 10.0), viewport);
        assert_eq!(near_top.top, 0.0);
        assert_eq!(near_top.left, Some(0.0));

        let near_end = scroll_to_rect(0.0, Rect::new(1190.0, 990.0, 10.0, 10.0), viewport);
        assert_eq!(near_end.top, 400.0);
        assert_eq!(near_end.left, Some(800.0));
    }

    #[test]
    fn page_offsets_accumulate_with_gap() {
        let heights = [100.0, 200.0, 300.0];
        assert_eq!(page_top_offset(&heights, 0, 10.0), 0.0);
        assert_eq!(page_top_offset(&heights, 2, 10.0), 320.0);
        assert_eq!(page_top_offsets(&heights, 10.0), vec![0.0, 110.0, 320.0]);
        assert_eq!(document_height(&heights, 10.0), 620.0);
    }
}
