//! PDF provider backed by MuPDF
//!
//! MuPDF applies a page's `/Rotate` entry in its own bounds and page
//! transform, so pages are reported with their rotation already baked into
//! the size and [`Rotation::None`].

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;

use log::debug;
use mupdf::{Colorspace, Document, Matrix};
use tiny_skia::Pixmap;

use super::provider::{PageHandle, PageLoad, PdfProvider, RasterRequest, RasterTask, ReadyPage};
use super::request::{ProviderError, RasterError};
use super::types::{PageGeometry, Rotation, Size};

pub struct MupdfProvider {
    doc: Rc<Document>,
    page_count: usize,
}

impl MupdfProvider {
    pub fn open(path: &Path) -> Result<Self, ProviderError> {
        let doc = Document::open(path.to_string_lossy().as_ref())
            .map_err(|e| ProviderError::backend(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| ProviderError::backend(e.to_string()))?
            .max(0) as usize;
        debug!("Opened {} with {page_count} pages", path.display());
        Ok(Self {
            doc: Rc::new(doc),
            page_count,
        })
    }

    fn page_size(&self, page: usize) -> Result<Size, ProviderError> {
        if page >= self.page_count {
            return Err(ProviderError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        let loaded = self
            .doc
            .load_page(page as i32)
            .map_err(|e| ProviderError::backend(e.to_string()))?;
        let bounds = loaded
            .bounds()
            .map_err(|e| ProviderError::backend(e.to_string()))?;
        Ok(Size::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }
}

impl PdfProvider for MupdfProvider {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_geometry(&self, page: usize) -> Result<PageGeometry, ProviderError> {
        let size = self.page_size(page)?;
        Ok(PageGeometry::new(page, size.width, size.height, Rotation::None))
    }

    fn load_page(&self, page: usize) -> Box<dyn PageLoad> {
        let result = self.page_size(page).map(|size| {
            Arc::new(MupdfPage {
                doc: Rc::clone(&self.doc),
                index: page,
                size,
            }) as Arc<dyn PageHandle>
        });
        Box::new(ReadyPage::new(result))
    }
}

struct MupdfPage {
    doc: Rc<Document>,
    index: usize,
    size: Size,
}

impl PageHandle for MupdfPage {
    fn size(&self) -> Size {
        self.size
    }

    fn rotation(&self) -> Rotation {
        Rotation::None
    }

    fn render(&self, request: RasterRequest) -> Box<dyn RasterTask> {
        Box::new(MupdfRaster {
            doc: Rc::clone(&self.doc),
            index: self.index,
            scale: request.viewport.scale * request.transform.sx,
            cancelled: false,
        })
    }
}

/// Rasterizes in a single poll; cancellation is honoured before it starts
struct MupdfRaster {
    doc: Rc<Document>,
    index: usize,
    scale: f32,
    cancelled: bool,
}

impl MupdfRaster {
    fn rasterize(&self, target: &mut Pixmap) -> Result<(), RasterError> {
        let page = self
            .doc
            .load_page(self.index as i32)
            .map_err(|e| RasterError::backend(e.to_string()))?;
        let pixmap = page
            .to_pixmap(
                &Matrix::new_scale(self.scale, self.scale),
                &Colorspace::device_rgb(),
                false,
                false,
            )
            .map_err(|e| RasterError::backend(e.to_string()))?;

        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(RasterError::backend(format!(
                "Unsupported pixmap format: {n} channels"
            )));
        }
        let src_width = pixmap.width() as usize;
        let src_height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        if samples.len() < stride.saturating_mul(src_height) || src_width * n > stride {
            return Err(RasterError::backend("Pixmap buffer size mismatch"));
        }

        // Rounding can leave the two buffers a pixel apart
        let width = src_width.min(target.width() as usize);
        let height = src_height.min(target.height() as usize);
        let dst_stride = target.width() as usize * 4;
        let dst = target.data_mut();
        for y in 0..height {
            let src_row = &samples[y * stride..y * stride + width * n];
            let dst_row = &mut dst[y * dst_stride..y * dst_stride + width * 4];
            for (src, out) in src_row.chunks_exact(n).zip(dst_row.chunks_exact_mut(4)) {
                out[..3].copy_from_slice(&src[..3]);
                out[3] = 255;
            }
        }
        Ok(())
    }
}

impl RasterTask for MupdfRaster {
    fn poll(&mut self, target: &mut Pixmap) -> Poll<Result<(), RasterError>> {
        if self.cancelled {
            return Poll::Ready(Err(RasterError::Cancelled));
        }
        Poll::Ready(self.rasterize(target))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}
