//! Zoom range and stepping state
//!
//! Touch devices get a tighter upper bound than pointer-driven ones because
//! large raster buffers cost more there.

use log::warn;

use super::device::DeviceProfile;

/// Inclusive zoom bounds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
}

impl ZoomRange {
    /// Range for mouse/trackpad driven devices
    pub const POINTER: Self = Self { min: 0.25, max: 5.0 };
    /// Range for touch-capable devices
    pub const TOUCH: Self = Self { min: 0.25, max: 3.2 };

    #[must_use]
    pub const fn for_device(device: &DeviceProfile) -> Self {
        if device.touch { Self::TOUCH } else { Self::POINTER }
    }

    /// Clamp to range, handling NaN/Inf
    #[must_use]
    pub fn clamp(self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(self.min, self.max)
        } else {
            warn!("Ignoring non-finite zoom {zoom}, using 1.0");
            1.0_f32.clamp(self.min, self.max)
        }
    }
}

/// Clamp a zoom factor to the range allowed on `device`
#[must_use]
pub fn clamp_zoom(zoom: f32, device: &DeviceProfile) -> f32 {
    ZoomRange::for_device(device).clamp(zoom)
}

/// Zoom state driven by wheel/pinch/keyboard steps
#[derive(Debug)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    factor: f32,
    range: ZoomRange,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            factor: 1.0,
            range: ZoomRange::POINTER,
        }
    }
}

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out rate divisor per step - 10%
    pub const ZOOM_OUT_RATE: f32 = 1.1;

    #[must_use]
    pub fn for_device(device: &DeviceProfile) -> Self {
        Self {
            factor: 1.0,
            range: ZoomRange::for_device(device),
        }
    }

    /// Returns the current zoom factor
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    #[must_use]
    pub fn range(&self) -> ZoomRange {
        self.range
    }

    /// Set an absolute factor, returning the clamped value
    pub fn set(&mut self, factor: f32) -> f32 {
        self.factor = self.range.clamp(factor);
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) -> f32 {
        self.set(self.factor * Self::ZOOM_IN_RATE)
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) -> f32 {
        self.set(self.factor / Self::ZOOM_OUT_RATE)
    }

    /// Apply a continuous pinch/wheel scale delta
    pub fn scale_by(&mut self, delta: f32) -> f32 {
        if !delta.is_finite() || delta <= 0.0 {
            return self.factor;
        }
        self.set(self.factor * delta)
    }
}
