//! Capabilities consumed from an external PDF library
//!
//! The engine never parses PDF bytes. A provider hands out page handles and
//! raster tasks; both page loading and rasterization may take several event
//! loop turns, so they are modelled as pollable operations. Nothing here
//! blocks and nothing spawns threads.

use std::sync::Arc;
use std::task::Poll;

use tiny_skia::{Pixmap, Transform};

use super::geometry::rotated_size;
use super::request::{ProviderError, RasterError};
use super::types::{PageGeometry, Rotation, Size, Viewport};

/// An open PDF document
pub trait PdfProvider {
    fn page_count(&self) -> usize;

    /// Geometry of a page, used once at document bootstrap
    fn page_geometry(&self, page: usize) -> Result<PageGeometry, ProviderError>;

    /// Start loading a page handle
    fn load_page(&self, page: usize) -> Box<dyn PageLoad>;
}

/// A pending page handle
pub trait PageLoad {
    fn poll(&mut self) -> Poll<Result<Arc<dyn PageHandle>, ProviderError>>;
}

/// Page load that is already resolved
pub struct ReadyPage(Option<Result<Arc<dyn PageHandle>, ProviderError>>);

impl ReadyPage {
    pub fn new(result: Result<Arc<dyn PageHandle>, ProviderError>) -> Self {
        Self(Some(result))
    }
}

impl PageLoad for ReadyPage {
    fn poll(&mut self) -> Poll<Result<Arc<dyn PageHandle>, ProviderError>> {
        match self.0.take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Ready(Err(ProviderError::backend("page load polled after completion"))),
        }
    }
}

/// What a raster task should produce
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterRequest {
    pub page: usize,
    pub viewport: Viewport,
    /// CSS-to-buffer transform (the effective DPR)
    pub transform: Transform,
}

/// A loaded page
pub trait PageHandle {
    /// Unrotated size at scale 1
    fn size(&self) -> Size;

    /// The page's own rotation
    fn rotation(&self) -> Rotation;

    /// Viewport for a scale and rotation
    fn viewport(&self, scale: f32, rotation: Rotation) -> Viewport {
        let size = rotated_size(self.size(), rotation).scale(scale);
        Viewport {
            width: size.width,
            height: size.height,
            scale,
            rotation,
        }
    }

    /// Start a cancellable raster pass
    fn render(&self, request: RasterRequest) -> Box<dyn RasterTask>;
}

/// An in-flight raster pass.
///
/// `poll` receives the surface to draw into on every call. After `cancel`,
/// the next poll should resolve to [`RasterError::Cancelled`].
pub trait RasterTask {
    fn poll(&mut self, target: &mut Pixmap) -> Poll<Result<(), RasterError>>;

    fn cancel(&mut self);
}
