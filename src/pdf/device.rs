//! Device profile and raster buffer sizing

use super::types::Size;

/// What the host knows about the display it renders to
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceProfile {
    /// Physical pixels per CSS pixel
    pub device_pixel_ratio: f32,
    /// Touch-capable device (tighter memory and zoom limits)
    pub touch: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::new(1.0, false)
    }
}

impl DeviceProfile {
    #[must_use]
    pub const fn new(device_pixel_ratio: f32, touch: bool) -> Self {
        Self {
            device_pixel_ratio,
            touch,
        }
    }
}

/// Limits applied when sizing a raster buffer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DprLimits {
    /// Upper bound on DPR for pointer devices
    pub max_ratio: f32,
    /// Upper bound on DPR for touch devices
    pub touch_max_ratio: f32,
    /// Hard ceiling on buffer pixels (width * height)
    pub pixel_ceiling: f32,
}

impl Default for DprLimits {
    fn default() -> Self {
        Self {
            max_ratio: 2.0,
            touch_max_ratio: 1.5,
            pixel_ceiling: 7_000_000.0,
        }
    }
}

impl DprLimits {
    /// The device's DPR capped for its device class, before the pixel ceiling
    #[must_use]
    pub fn device_ratio(&self, device: &DeviceProfile) -> f32 {
        let reported = if device.device_pixel_ratio.is_finite() && device.device_pixel_ratio > 0.0 {
            device.device_pixel_ratio
        } else {
            1.0
        };
        let dpr = reported.min(self.max_ratio);
        if device.touch {
            dpr.min(self.touch_max_ratio)
        } else {
            dpr
        }
    }
}

/// Device pixel ratio to rasterize `viewport` (CSS pixels) with.
///
/// Starts from the device's DPR capped per device class, then shrinks it so
/// that `width * height * dpr^2` stays under the pixel ceiling. Both axes use
/// the same ratio, so aspect ratio is preserved.
#[must_use]
pub fn effective_dpr(device: &DeviceProfile, viewport: Size, limits: &DprLimits) -> f32 {
    let mut dpr = limits.device_ratio(device);

    let css_area = viewport.area();
    if css_area > 0.0 && limits.pixel_ceiling > 0.0 {
        let buffer_area = css_area * dpr * dpr;
        if buffer_area > limits.pixel_ceiling {
            dpr *= (limits.pixel_ceiling / buffer_area).sqrt();
        }
    }
    dpr
}

/// Buffer dimensions in device pixels for a CSS size at `dpr`
#[must_use]
pub fn buffer_size(css: Size, dpr: f32) -> (u32, u32) {
    let w = (css.width * dpr).floor().max(1.0);
    let h = (css.height * dpr).floor().max(1.0);
    (w as u32, h as u32)
}
