//! Page renderer: cache lookup, cancellable raster passes and buffer swaps
//!
//! Each renderer owns one double-buffered surface pair and at most one
//! in-flight request. A request moves through
//! `Idle -> Rendering -> {Ready | Cancelled | Errored} -> Idle`; issuing a new
//! request while one is in flight cancels the old one first, so a stale
//! raster can never be swapped in after a newer request was made.
//!
//! The host drives progress by calling [`PageRenderer::pump`] from its event
//! loop and receives one [`RenderEvent`] per finished request.

use std::sync::Arc;
use std::task::Poll;

use log::{debug, error, warn};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use super::cache::{self, CacheKey, CachedPage, SharedCache};
use super::device::{DeviceProfile, DprLimits, effective_dpr};
use super::provider::{PageHandle, PageLoad, PdfProvider, RasterRequest, RasterTask};
use super::request::{ProviderError, RasterError, RenderError, RenderEvent, RenderOutcome, RequestId};
use super::surface::{Buffer, Surface, SurfacePair};
use super::types::Size;

/// Tunables for the page renderer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    /// Zoom changes smaller than this do not trigger a new raster pass
    pub rerender_threshold: f32,
    pub dpr_limits: DprLimits,
    /// Bitmaps larger than this are not cached
    pub max_cached_bitmap_bytes: usize,
    /// Whether to cache bitmaps on touch devices
    pub cache_on_touch: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rerender_threshold: 0.015,
            dpr_limits: DprLimits::default(),
            max_cached_bitmap_bytes: 16 * 1024 * 1024,
            cache_on_touch: false,
        }
    }
}

/// Whether a renderer has a request in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Idle,
    Rendering,
}

/// What `render` did with a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Within the re-render threshold of what is shown or in flight
    Skipped,
    /// Served from the cache; the `Ready` event is already queued
    CacheHit(RequestId),
    /// A page load and raster pass were started
    Started(RequestId),
    /// Zoom was not a positive finite number
    Rejected,
}

enum Phase {
    Loading(Box<dyn PageLoad>),
    Rasterizing {
        task: Box<dyn RasterTask>,
        css_size: Size,
    },
}

struct InFlight {
    id: RequestId,
    page: usize,
    zoom: f32,
    phase: Phase,
}

enum Step {
    Loaded(Result<Arc<dyn PageHandle>, ProviderError>),
    Rastered(Result<(), RasterError>, Size),
    NoSurface,
}

/// Renders one page slot of the host UI
pub struct PageRenderer {
    provider: Arc<dyn PdfProvider>,
    cache: SharedCache,
    device: DeviceProfile,
    config: RenderConfig,
    surfaces: SurfacePair,
    in_flight: Option<InFlight>,
    last_rendered: Option<(usize, f32)>,
    loading: bool,
    next_request_id: u64,
    events: Vec<RenderEvent>,
}

impl PageRenderer {
    #[must_use]
    pub fn new(
        provider: Arc<dyn PdfProvider>,
        cache: SharedCache,
        device: DeviceProfile,
        config: RenderConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            device,
            config,
            surfaces: SurfacePair::new(),
            in_flight: None,
            last_rendered: None,
            loading: false,
            next_request_id: 1,
            events: Vec::new(),
        }
    }

    /// Request `page` at `zoom`.
    pub fn render(&mut self, page: usize, zoom: f32) -> Dispatch {
        if !zoom.is_finite() || zoom <= 0.0 {
            warn!("Ignoring render of page {page} at invalid zoom {zoom}");
            return Dispatch::Rejected;
        }
        if self.is_redundant(page, zoom) {
            return Dispatch::Skipped;
        }

        self.cancel_in_flight();
        let id = self.next_id();

        let cached = cache::lock(&self.cache).get(&CacheKey::new(page, zoom));
        if let Some(cached) = cached {
            debug!("Cache hit for page {page} @ {zoom:.2}");
            let outcome = self.present_cached(&cached);
            if outcome.is_ready() {
                self.last_rendered = Some((page, zoom));
            }
            self.finish(id, page, zoom, outcome);
            return Dispatch::CacheHit(id);
        }

        let load = self.provider.load_page(page);
        self.in_flight = Some(InFlight {
            id,
            page,
            zoom,
            phase: Phase::Loading(load),
        });
        self.loading = true;
        Dispatch::Started(id)
    }

    /// Advance the in-flight request and drain finished events
    pub fn pump(&mut self) -> Vec<RenderEvent> {
        self.advance();
        std::mem::take(&mut self.events)
    }

    /// Cancel whatever is in flight. The `Cancelled` event is queued.
    pub fn cancel(&mut self) {
        self.cancel_in_flight();
    }

    /// Cancel in-flight work and release both surfaces
    pub fn teardown(&mut self) {
        self.cancel_in_flight();
        self.surfaces.teardown();
        self.last_rendered = None;
    }

    #[must_use]
    pub fn status(&self) -> RenderStatus {
        if self.in_flight.is_some() {
            RenderStatus::Rendering
        } else {
            RenderStatus::Idle
        }
    }

    /// Loading indicator state
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Zoom of the visible raster, `0.0` before the first successful render
    #[must_use]
    pub fn last_rendered_zoom(&self) -> f32 {
        self.last_rendered.map_or(0.0, |(_, zoom)| zoom)
    }

    #[must_use]
    pub fn last_rendered_page(&self) -> Option<usize> {
        self.last_rendered.map(|(page, _)| page)
    }

    #[must_use]
    pub fn visible_surface(&self) -> &Surface {
        self.surfaces.visible()
    }

    #[must_use]
    pub fn visible_buffer(&self) -> Buffer {
        self.surfaces.visible_buffer()
    }

    #[must_use]
    pub fn surfaces(&self) -> &SurfacePair {
        &self.surfaces
    }

    #[must_use]
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    fn is_redundant(&self, page: usize, zoom: f32) -> bool {
        let threshold = self.config.rerender_threshold;
        if let Some(flight) = &self.in_flight {
            return flight.page == page && (zoom - flight.zoom).abs() < threshold;
        }
        match self.last_rendered {
            Some((last_page, last_zoom)) => {
                last_page == page && last_zoom != 0.0 && (zoom - last_zoom).abs() < threshold
            }
            None => false,
        }
    }

    fn cancel_in_flight(&mut self) {
        let Some(mut flight) = self.in_flight.take() else {
            return;
        };
        if let Phase::Rasterizing { task, .. } = &mut flight.phase {
            task.cancel();
        }
        debug!(
            "Cancelled render {} of page {} @ {:.2}",
            flight.id, flight.page, flight.zoom
        );
        self.finish(flight.id, flight.page, flight.zoom, RenderOutcome::Cancelled);
    }

    fn advance(&mut self) {
        loop {
            let Some(mut flight) = self.in_flight.take() else {
                return;
            };

            let step = match &mut flight.phase {
                Phase::Loading(load) => match load.poll() {
                    Poll::Pending => None,
                    Poll::Ready(result) => Some(Step::Loaded(result)),
                },
                Phase::Rasterizing { task, css_size } => {
                    match self.surfaces.hidden_mut().pixmap_mut() {
                        Some(target) => match task.poll(target) {
                            Poll::Pending => None,
                            Poll::Ready(result) => Some(Step::Rastered(result, *css_size)),
                        },
                        None => Some(Step::NoSurface),
                    }
                }
            };

            match step {
                None => {
                    self.in_flight = Some(flight);
                    return;
                }
                Some(Step::Loaded(Ok(handle))) => match self.start_raster(&flight, handle.as_ref()) {
                    Ok(phase) => {
                        flight.phase = phase;
                        self.in_flight = Some(flight);
                    }
                    Err(e) => {
                        self.finish(flight.id, flight.page, flight.zoom, RenderOutcome::Errored(e));
                        return;
                    }
                },
                Some(Step::Loaded(Err(e))) => {
                    self.finish(
                        flight.id,
                        flight.page,
                        flight.zoom,
                        RenderOutcome::Errored(e.into()),
                    );
                    return;
                }
                Some(Step::Rastered(result, css_size)) => {
                    let outcome = RenderOutcome::from_raster(result, css_size.height);
                    if outcome.is_ready() {
                        self.snapshot(flight.page, flight.zoom, css_size);
                        let visible = self.surfaces.swap();
                        debug!(
                            "Page {} @ {:.2} now visible in {visible:?} buffer",
                            flight.page, flight.zoom
                        );
                        self.last_rendered = Some((flight.page, flight.zoom));
                    }
                    self.finish(flight.id, flight.page, flight.zoom, outcome);
                    return;
                }
                Some(Step::NoSurface) => {
                    let (width, height) = self.surfaces.hidden().buffer_size();
                    self.finish(
                        flight.id,
                        flight.page,
                        flight.zoom,
                        RenderOutcome::Errored(RenderError::Surface { width, height }),
                    );
                    return;
                }
            }
        }
    }

    fn start_raster(&mut self, flight: &InFlight, handle: &dyn PageHandle) -> Result<Phase, RenderError> {
        let viewport = handle.viewport(flight.zoom, handle.rotation());
        let css_size = viewport.size();
        let dpr = effective_dpr(&self.device, css_size, &self.config.dpr_limits);

        let surface = self.surfaces.hidden_mut();
        if surface.prepare(css_size, dpr).is_none() {
            let (width, height) = super::device::buffer_size(css_size, dpr);
            return Err(RenderError::Surface { width, height });
        }

        debug!(
            "Rasterizing page {} @ {:.2} ({}x{} css, dpr {dpr:.2})",
            flight.page, flight.zoom, css_size.width, css_size.height
        );
        let task = handle.render(RasterRequest {
            page: flight.page,
            viewport,
            transform: Transform::from_scale(dpr, dpr),
        });
        Ok(Phase::Rasterizing { task, css_size })
    }

    /// Blit a cached bitmap into the hidden surface and swap
    fn present_cached(&mut self, cached: &CachedPage) -> RenderOutcome {
        let css_size = cached.css_size;
        let dpr = effective_dpr(&self.device, css_size, &self.config.dpr_limits);
        let Some(target) = self.surfaces.hidden_mut().prepare(css_size, dpr) else {
            let (width, height) = super::device::buffer_size(css_size, dpr);
            return RenderOutcome::Errored(RenderError::Surface { width, height });
        };

        let sx = target.width() as f32 / cached.bitmap.width() as f32;
        let sy = target.height() as f32 / cached.bitmap.height() as f32;
        let same_size = target.width() == cached.bitmap.width()
            && target.height() == cached.bitmap.height();
        let paint = PixmapPaint {
            quality: if same_size {
                FilterQuality::Nearest
            } else {
                FilterQuality::Bilinear
            },
            ..PixmapPaint::default()
        };
        target.draw_pixmap(
            0,
            0,
            cached.bitmap.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
        self.surfaces.swap();
        RenderOutcome::Ready {
            height_px: css_size.height,
        }
    }

    /// Copy the freshly rendered hidden surface into the cache
    fn snapshot(&mut self, page: usize, zoom: f32, css_size: Size) {
        if self.device.touch && !self.config.cache_on_touch {
            return;
        }
        let Some(pixmap) = self.surfaces.hidden().pixmap() else {
            return;
        };
        let bytes = pixmap.data().len();
        if bytes > self.config.max_cached_bitmap_bytes {
            debug!("Not caching page {page} @ {zoom:.2}: {bytes} bytes");
            return;
        }
        let bitmap: Pixmap = pixmap.clone();
        cache::lock(&self.cache).insert(
            CacheKey::new(page, zoom),
            CachedPage { bitmap, css_size },
        );
    }

    fn finish(&mut self, id: RequestId, page: usize, zoom: f32, outcome: RenderOutcome) {
        if self.in_flight.is_none() {
            self.loading = false;
        }
        if let RenderOutcome::Errored(e) = &outcome {
            error!("Failed to render page {page} @ {zoom:.2}: {e}");
        }
        self.events.push(RenderEvent {
            id,
            page,
            zoom,
            outcome,
        });
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for PageRenderer {
    fn drop(&mut self) {
        if let Some(mut flight) = self.in_flight.take() {
            if let Phase::Rasterizing { task, .. } = &mut flight.phase {
                task.cancel();
            }
        }
    }
}
