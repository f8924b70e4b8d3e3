//! Viewer state management
//!
//! Hosts feed UI events in as [`Command`]s and act on the returned
//! [`Effect`]s. Unchanged inputs produce no effects, which keeps redraws
//! bounded while the user scrolls or zooms continuously.

use std::time::{Duration, Instant};

use super::device::DeviceProfile;
use super::geometry::ScrollTarget;
use super::surface::Buffer;
use super::types::{Rect, Size};
use super::zoom::clamp_zoom;

/// How long a navigation flash stays on screen
pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(1200);

/// Inputs that drive the overlay compositor, in page-local CSS pixels at the
/// current zoom
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayInputs {
    /// Persistently outlined mark or group-preview rect
    pub selected: Option<Rect>,
    /// Rect currently flashing after navigation
    pub flash: Option<Rect>,
    /// Member marks of the outlined group
    pub group_rects: Vec<Rect>,
    /// The outlined group's own rect
    pub group_outline: Option<Rect>,
    /// Whether overlays are drawn at all
    pub show_marks: bool,
}

/// Current view state for one document
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Visible viewport size in CSS pixels
    pub viewport: Size,
    pub scroll: ScrollTarget,
    pub zoom: f32,
    pub device: DeviceProfile,
    /// Current page (0-indexed)
    pub current_page: usize,
    pub page_count: usize,
    pub overlay: OverlayInputs,
    pub visible_buffer: Buffer,
    flash_duration: Duration,
    flash_expires: Option<Instant>,
}

impl ViewerState {
    #[must_use]
    pub fn new(device: DeviceProfile) -> Self {
        Self {
            viewport: Size::default(),
            scroll: ScrollTarget::default(),
            zoom: 1.0,
            device,
            current_page: 0,
            page_count: 0,
            overlay: OverlayInputs {
                show_marks: true,
                ..OverlayInputs::default()
            },
            visible_buffer: Buffer::Front,
            flash_duration: DEFAULT_FLASH_DURATION,
            flash_expires: None,
        }
    }

    #[must_use]
    pub fn with_flash_duration(mut self, duration: Duration) -> Self {
        self.flash_duration = duration;
        self
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Resize(size) => {
                if self.viewport != size {
                    self.viewport = size;
                    vec![Effect::RecomputeGeometry]
                } else {
                    vec![]
                }
            }

            Command::Scroll(target) => {
                if self.scroll != target {
                    self.scroll = target;
                    vec![Effect::RecomputeGeometry]
                } else {
                    vec![]
                }
            }

            Command::SetZoom(zoom) => {
                let clamped = clamp_zoom(zoom, &self.device);
                if (self.zoom - clamped).abs() > f32::EPSILON {
                    self.zoom = clamped;
                    vec![
                        Effect::RecomputeGeometry,
                        Effect::RenderCurrentPage,
                        Effect::RedrawOverlay,
                    ]
                } else {
                    vec![]
                }
            }

            Command::GoToPage(page) => {
                let clamped = page.min(self.page_count.saturating_sub(1));
                if self.current_page != clamped {
                    self.current_page = clamped;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::SetPageCount(count) => {
                self.page_count = count;
                if self.current_page >= count && count > 0 {
                    self.current_page = count - 1;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Select(rect) => self.set_overlay(|o| &mut o.selected, rect),

            Command::Flash { rect, now } => {
                self.overlay.flash = Some(rect);
                self.flash_expires = Some(now + self.flash_duration);
                vec![
                    Effect::RedrawOverlay,
                    Effect::ScheduleFlashClear(self.flash_duration),
                ]
            }

            Command::Tick(now) => match self.flash_expires {
                Some(deadline) if now >= deadline => {
                    self.flash_expires = None;
                    self.overlay.flash = None;
                    vec![Effect::RedrawOverlay]
                }
                _ => vec![],
            },

            Command::SetGroupRects(rects) => {
                if self.overlay.group_rects != rects {
                    self.overlay.group_rects = rects;
                    vec![Effect::RedrawOverlay]
                } else {
                    vec![]
                }
            }

            Command::SetGroupOutline(rect) => self.set_overlay(|o| &mut o.group_outline, rect),

            Command::ShowMarks(show) => {
                if self.overlay.show_marks != show {
                    self.overlay.show_marks = show;
                    vec![Effect::RedrawOverlay]
                } else {
                    vec![]
                }
            }

            Command::BufferSwapped(buffer) => {
                if self.visible_buffer != buffer {
                    self.visible_buffer = buffer;
                    vec![Effect::RedrawOverlay]
                } else {
                    vec![]
                }
            }
        }
    }

    /// Whether a flash is still waiting to be cleared
    #[must_use]
    pub fn flash_pending(&self) -> bool {
        self.flash_expires.is_some()
    }

    fn set_overlay(
        &mut self,
        field: impl FnOnce(&mut OverlayInputs) -> &mut Option<Rect>,
        rect: Option<Rect>,
    ) -> Vec<Effect> {
        let slot = field(&mut self.overlay);
        if *slot != rect {
            *slot = rect;
            vec![Effect::RedrawOverlay]
        } else {
            vec![]
        }
    }
}

/// Commands that modify viewer state
#[derive(Clone, Debug)]
pub enum Command {
    /// The viewport was resized
    Resize(Size),
    /// The viewport was scrolled
    Scroll(ScrollTarget),
    /// Set the zoom factor (clamped to the device range)
    SetZoom(f32),
    /// Go to a specific page
    GoToPage(usize),
    /// Update the page count
    SetPageCount(usize),
    /// Set or clear the persistent selection outline
    Select(Option<Rect>),
    /// Flash a rect after navigation
    Flash { rect: Rect, now: Instant },
    /// Advance timers
    Tick(Instant),
    /// Outline these member marks of a group
    SetGroupRects(Vec<Rect>),
    /// Set or clear the group outline
    SetGroupOutline(Option<Rect>),
    /// Show or hide every overlay
    ShowMarks(bool),
    /// The renderer made another buffer visible
    BufferSwapped(Buffer),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Recompute layout-dependent geometry (page offsets, visible rects)
    RecomputeGeometry,
    /// Render the current page at the current zoom
    RenderCurrentPage,
    /// Redraw the overlay surface
    RedrawOverlay,
    /// Send `Command::Tick` after this long to clear the flash
    ScheduleFlashClear(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> ViewerState {
        let mut state = ViewerState::new(DeviceProfile::default());
        state.page_count = 10;
        state
    }

    #[test]
    fn set_zoom_clamps_and_rerenders() {
        let mut state = test_state();
        let effects = state.apply(Command::SetZoom(50.0));
        assert_eq!(state.zoom, 5.0);
        assert_eq!(
            effects,
            vec![
                Effect::RecomputeGeometry,
                Effect::RenderCurrentPage,
                Effect::RedrawOverlay
            ]
        );
        assert!(state.apply(Command::SetZoom(7.0)).is_empty());
    }

    #[test]
    fn touch_devices_clamp_tighter() {
        let mut state = ViewerState::new(DeviceProfile::new(2.0, true));
        let _ = state.apply(Command::SetZoom(5.0));
        assert_eq!(state.zoom, 3.2);
    }

    #[test]
    fn resize_and_scroll_recompute_geometry() {
        let mut state = test_state();
        assert_eq!(
            state.apply(Command::Resize(Size::new(800.0, 600.0))),
            vec![Effect::RecomputeGeometry]
        );
        assert!(state.apply(Command::Resize(Size::new(800.0, 600.0))).is_empty());

        let target = ScrollTarget {
            top: 120.0,
            left: None,
        };
        assert_eq!(
            state.apply(Command::Scroll(target)),
            vec![Effect::RecomputeGeometry]
        );
        assert!(state.apply(Command::Scroll(target)).is_empty());
    }

    #[test]
    fn go_to_page_clamps_to_max() {
        let mut state = test_state();
        let effects = state.apply(Command::GoToPage(999));
        assert_eq!(state.current_page, 9);
        assert_eq!(effects, vec![Effect::RenderCurrentPage]);
    }

    #[test]
    fn overlay_inputs_redraw_only_on_change() {
        let mut state = test_state();
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(
            state.apply(Command::Select(Some(rect))),
            vec![Effect::RedrawOverlay]
        );
        assert!(state.apply(Command::Select(Some(rect))).is_empty());
        assert_eq!(
            state.apply(Command::SetGroupRects(vec![rect])),
            vec![Effect::RedrawOverlay]
        );
        assert!(state.apply(Command::SetGroupRects(vec![rect])).is_empty());
        assert_eq!(
            state.apply(Command::SetGroupOutline(Some(rect))),
            vec![Effect::RedrawOverlay]
        );
        assert_eq!(
            state.apply(Command::ShowMarks(false)),
            vec![Effect::RedrawOverlay]
        );
        assert_eq!(
            state.apply(Command::BufferSwapped(Buffer::Back)),
            vec![Effect::RedrawOverlay]
        );
        assert!(state.apply(Command::BufferSwapped(Buffer::Back)).is_empty());
    }

    #[test]
    fn flash_clears_after_duration() {
        let mut state = test_state();
        let start = Instant::now();
        let rect = Rect::new(10.0, 10.0, 50.0, 20.0);

        let effects = state.apply(Command::Flash { rect, now: start });
        assert_eq!(
            effects,
            vec![
                Effect::RedrawOverlay,
                Effect::ScheduleFlashClear(DEFAULT_FLASH_DURATION)
            ]
        );
        assert_eq!(state.overlay.flash, Some(rect));

        assert!(
            state
                .apply(Command::Tick(start + Duration::from_millis(600)))
                .is_empty()
        );
        assert_eq!(state.overlay.flash, Some(rect));

        assert_eq!(
            state.apply(Command::Tick(start + DEFAULT_FLASH_DURATION)),
            vec![Effect::RedrawOverlay]
        );
        assert_eq!(state.overlay.flash, None);
        assert!(!state.flash_pending());
    }
}
