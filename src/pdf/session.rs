//! Document-scoped render session
//!
//! A session owns the bitmap cache for one open document and the page
//! geometry fetched at bootstrap. Renderers handed out by the session share
//! its cache; nothing is shared across sessions.

use std::sync::Arc;

use log::{debug, info};

use super::cache::{self, RenderCache, SharedCache};
use super::device::DeviceProfile;
use super::geometry::{
    FitOptions, ScrollTarget, ScrollViewport, compute_zoom_for_rect, document_height,
    mark_rect_at_scale1, page_top_offset, scroll_to_rect,
};
use super::provider::PdfProvider;
use super::renderer::{PageRenderer, RenderConfig};
use super::request::ProviderError;
use super::types::{PageGeometry, Rect, Size};
use super::zoom::ZoomRange;
use super::DEFAULT_CACHE_SIZE;
use crate::marks::{Group, Mark, MarkSet};

/// Session tunables
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub cache_capacity: usize,
    pub render: RenderConfig,
    pub fit: FitOptions,
    /// Vertical gap between stacked pages, in CSS pixels
    pub page_gap: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_SIZE,
            render: RenderConfig::default(),
            fit: FitOptions::default(),
            page_gap: 16.0,
        }
    }
}

/// Where to go to show a mark
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavigationPlan {
    pub page: usize,
    pub zoom: f32,
    pub scroll: ScrollTarget,
    /// Page-local rect to flash, at `zoom`
    pub flash_rect: Rect,
}

pub struct RenderSession {
    provider: Arc<dyn PdfProvider>,
    cache: SharedCache,
    device: DeviceProfile,
    config: SessionConfig,
    pages: Vec<PageGeometry>,
}

impl RenderSession {
    /// Open a session, reading every page's geometry once
    pub fn open(
        provider: Arc<dyn PdfProvider>,
        device: DeviceProfile,
        config: SessionConfig,
    ) -> Result<Self, ProviderError> {
        let page_count = provider.page_count();
        let pages = (0..page_count)
            .map(|page| provider.page_geometry(page))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Opened render session: {page_count} pages, cache of {}",
            config.cache_capacity
        );
        Ok(Self {
            provider,
            cache: RenderCache::shared(config.cache_capacity),
            device,
            config,
            pages,
        })
    }

    /// A renderer bound to this session's cache
    #[must_use]
    pub fn page_renderer(&self) -> PageRenderer {
        PageRenderer::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.cache),
            self.device,
            self.config.render,
        )
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn pages(&self) -> &[PageGeometry] {
        &self.pages
    }

    #[must_use]
    pub fn page(&self, index: usize) -> Option<&PageGeometry> {
        self.pages.get(index)
    }

    #[must_use]
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Drop every cached bitmap
    pub fn clear_cache(&self) {
        cache::lock(&self.cache).clear();
    }

    #[must_use]
    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange::for_device(&self.device)
    }

    /// Mark rect on its displayed page at `zoom`
    #[must_use]
    pub fn mark_rect(&self, mark: &Mark, zoom: f32) -> Option<Rect> {
        self.page(mark.page_index)
            .map(|page| mark.rect_at_zoom(page, zoom))
    }

    #[must_use]
    pub fn group_rect(&self, group: &Group, zoom: f32) -> Option<Rect> {
        self.page(group.page_index)
            .map(|page| group.rect_at_zoom(page, zoom))
    }

    /// Rects of a group's members that sit on the group's page
    #[must_use]
    pub fn group_member_rects(&self, marks: &MarkSet, group: &Group, zoom: f32) -> Vec<Rect> {
        let Some(page) = self.page(group.page_index) else {
            return Vec::new();
        };
        group
            .mark_ids
            .iter()
            .filter_map(|id| marks.get(id))
            .filter(|m| m.page_index == group.page_index)
            .map(|m| m.rect_at_zoom(page, zoom))
            .collect()
    }

    /// Displayed page heights at `zoom`
    #[must_use]
    pub fn page_heights(&self, zoom: f32) -> Vec<f32> {
        self.pages
            .iter()
            .map(|p| p.display_size(zoom).height)
            .collect()
    }

    #[must_use]
    pub fn page_top(&self, page: usize, zoom: f32) -> f32 {
        page_top_offset(&self.page_heights(zoom), page, self.config.page_gap)
    }

    #[must_use]
    pub fn document_height(&self, zoom: f32) -> f32 {
        document_height(&self.page_heights(zoom), self.config.page_gap)
    }

    /// Zoom that fits the mark into `viewport`.
    ///
    /// The legibility floor counts device pixels at the DPR the renderer
    /// will actually use, capped for the device class.
    #[must_use]
    pub fn fit_zoom(&self, mark: &Mark, viewport: Size) -> Option<f32> {
        let page = self.page(mark.page_index)?;
        let rect = mark_rect_at_scale1(mark.rect, page);
        Some(compute_zoom_for_rect(
            viewport,
            rect.size(),
            self.config.fit,
            self.zoom_range(),
            self.config.render.dpr_limits.device_ratio(&self.device),
        ))
    }

    /// Plan the zoom and scroll that center `mark` in `viewport`.
    ///
    /// The mark's zoom hint wins over auto-fit when present. Returns `None`
    /// for marks on pages this document does not have.
    #[must_use]
    pub fn navigate_to(&self, mark: &Mark, viewport: Size) -> Option<NavigationPlan> {
        let page = self.page(mark.page_index)?;
        let zoom = match mark.zoom_hint {
            Some(hint) => self.zoom_range().clamp(hint),
            None => self.fit_zoom(mark, viewport)?,
        };

        let rect = mark.rect_at_zoom(page, zoom);
        let page_top = self.page_top(mark.page_index, zoom);
        let scroll = scroll_to_rect(
            page_top,
            rect,
            ScrollViewport {
                width: viewport.width,
                height: viewport.height,
                content_width: page.display_size(zoom).width,
                content_height: self.document_height(zoom),
            },
        );
        debug!(
            "Navigate to mark {} on page {} @ {zoom:.2}, scroll top {:.1}",
            mark.id, mark.page_index, scroll.top
        );
        Some(NavigationPlan {
            page: mark.page_index,
            zoom,
            scroll,
            flash_rect: rect,
        })
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.clear_cache();
    }
}
