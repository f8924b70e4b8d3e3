//! PDF page rendering and annotation geometry

mod cache;
mod device;
mod geometry;
#[cfg(feature = "mupdf")]
mod mupdf_provider;
mod overlay;
mod provider;
mod renderer;
mod request;
mod session;
mod state;
mod surface;
mod types;
mod zoom;

/// Default number of cached page bitmaps per session
pub const DEFAULT_CACHE_SIZE: usize = 10;

pub use cache::{CacheKey, CachedPage, RenderCache, SharedCache};
pub use device::{DeviceProfile, DprLimits, buffer_size, effective_dpr};
pub use geometry::*;
#[cfg(feature = "mupdf")]
pub use mupdf_provider::MupdfProvider;
pub use overlay::{OverlayCompositor, OverlayStyle, Rgba, StrokeStyle};
pub use provider::{PageHandle, PageLoad, PdfProvider, RasterRequest, RasterTask, ReadyPage};
pub use renderer::{Dispatch, PageRenderer, RenderConfig, RenderStatus};
pub use request::{
    ProviderError, RasterError, RenderError, RenderEvent, RenderOutcome, RequestId,
};
pub use session::{NavigationPlan, RenderSession, SessionConfig};
pub use state::{Command, DEFAULT_FLASH_DURATION, Effect, OverlayInputs, ViewerState};
pub use surface::{Buffer, Surface, SurfacePair};
pub use types::*;
pub use zoom::*;
