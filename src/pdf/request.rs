//! Render request identifiers, outcomes and errors

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from the PDF provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("page {page} out of range ({page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("PDF backend: {detail}")]
    Backend { detail: String },
}

impl ProviderError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend { detail: msg.into() }
    }
}

/// Terminal failure of a raster task
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// The task stopped because it was cancelled. Not a failure.
    #[error("raster task cancelled")]
    Cancelled,

    #[error("raster backend: {detail}")]
    Backend { detail: String },
}

impl RasterError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend { detail: msg.into() }
    }
}

/// Unexpected render failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{detail}")]
    Raster { detail: String },

    #[error("cannot allocate {width}x{height} surface")]
    Surface { width: u32, height: u32 },
}

/// How a render request ended
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// The page is visible; height in CSS pixels
    Ready { height_px: f32 },
    /// Superseded by a newer request
    Cancelled,
    /// Failed; the previous content stays visible
    Errored(RenderError),
}

impl RenderOutcome {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Map a raster task result, keeping cancellation out of the error path
    #[must_use]
    pub fn from_raster(result: Result<(), RasterError>, height_px: f32) -> Self {
        match result {
            Ok(()) => Self::Ready { height_px },
            Err(RasterError::Cancelled) => Self::Cancelled,
            Err(RasterError::Backend { detail }) => Self::Errored(RenderError::Raster { detail }),
        }
    }
}

/// Notification delivered to the host when a request ends
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub id: RequestId,
    pub page: usize,
    pub zoom: f32,
    pub outcome: RenderOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_not_an_error() {
        let outcome = RenderOutcome::from_raster(Err(RasterError::Cancelled), 10.0);
        assert_eq!(outcome, RenderOutcome::Cancelled);
    }

    #[test]
    fn backend_failure_is_errored() {
        let outcome = RenderOutcome::from_raster(Err(RasterError::backend("boom")), 10.0);
        assert_eq!(
            outcome,
            RenderOutcome::Errored(RenderError::Raster {
                detail: "boom".into()
            })
        );
    }

    #[test]
    fn provider_errors_read_well() {
        let err = RenderError::from(ProviderError::PageOutOfRange {
            page: 7,
            page_count: 3,
        });
        assert_eq!(err.to_string(), "page 7 out of range (3 pages)");
    }
}
