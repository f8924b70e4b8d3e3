//! Scripted PDF provider for driving the renderer without a PDF library

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;

use pagemark::pdf::{
    PageGeometry, PageHandle, PageLoad, PdfProvider, ProviderError, RasterError, RasterRequest,
    RasterTask, ReadyPage, Rotation, Size,
};
use tiny_skia::{Color, Pixmap};

#[derive(Default)]
pub struct Stats {
    pub loads: Cell<usize>,
    pub raster_passes: Cell<usize>,
    pub cancels: Cell<usize>,
}

impl Stats {
    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

pub struct ScriptedProvider {
    pub pages: Vec<PageGeometry>,
    /// Pending polls before a raster pass completes
    pub polls: usize,
    /// Pages whose raster pass fails
    pub failing: HashSet<usize>,
    pub stats: Rc<Stats>,
}

impl ScriptedProvider {
    /// `count` portrait pages of 100x200 points
    pub fn new(count: usize) -> Self {
        Self {
            pages: (0..count)
                .map(|i| PageGeometry::new(i, 100.0, 200.0, Rotation::None))
                .collect(),
            polls: 0,
            failing: HashSet::new(),
            stats: Rc::new(Stats::default()),
        }
    }

    pub fn with_polls(mut self, polls: usize) -> Self {
        self.polls = polls;
        self
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.failing.insert(page);
        self
    }

    pub fn with_rotation(mut self, page: usize, rotation: Rotation) -> Self {
        self.pages[page].rotation = rotation;
        self
    }
}

/// Fill color that identifies a page in rendered output
pub fn page_color(page: usize) -> (u8, u8, u8) {
    ((page * 40 % 256) as u8, 100, 200)
}

impl PdfProvider for ScriptedProvider {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, page: usize) -> Result<PageGeometry, ProviderError> {
        self.pages
            .get(page)
            .copied()
            .ok_or(ProviderError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })
    }

    fn load_page(&self, page: usize) -> Box<dyn PageLoad> {
        Stats::bump(&self.stats.loads);
        let result = self.page_geometry(page).map(|geometry| {
            Arc::new(ScriptedPage {
                geometry,
                polls: self.polls,
                fail: self.failing.contains(&page),
                stats: Rc::clone(&self.stats),
            }) as Arc<dyn PageHandle>
        });
        Box::new(ReadyPage::new(result))
    }
}

struct ScriptedPage {
    geometry: PageGeometry,
    polls: usize,
    fail: bool,
    stats: Rc<Stats>,
}

impl PageHandle for ScriptedPage {
    fn size(&self) -> Size {
        self.geometry.size()
    }

    fn rotation(&self) -> Rotation {
        self.geometry.rotation
    }

    fn render(&self, _request: RasterRequest) -> Box<dyn RasterTask> {
        Stats::bump(&self.stats.raster_passes);
        Box::new(ScriptedTask {
            page: self.geometry.page_index,
            remaining: self.polls,
            fail: self.fail,
            cancelled: false,
            stats: Rc::clone(&self.stats),
        })
    }
}

struct ScriptedTask {
    page: usize,
    remaining: usize,
    fail: bool,
    cancelled: bool,
    stats: Rc<Stats>,
}

impl RasterTask for ScriptedTask {
    fn poll(&mut self, target: &mut Pixmap) -> Poll<Result<(), RasterError>> {
        if self.cancelled {
            return Poll::Ready(Err(RasterError::Cancelled));
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return Poll::Pending;
        }
        if self.fail {
            return Poll::Ready(Err(RasterError::backend("corrupt content stream")));
        }
        let (r, g, b) = page_color(self.page);
        target.fill(Color::from_rgba8(r, g, b, 255));
        Poll::Ready(Ok(()))
    }

    fn cancel(&mut self) {
        Stats::bump(&self.stats.cancels);
        self.cancelled = true;
    }
}

/// Color of the top-left pixel of a pixmap
pub fn corner_color(pixmap: &Pixmap) -> (u8, u8, u8) {
    let px = pixmap.pixel(0, 0).unwrap();
    (px.red(), px.green(), px.blue())
}
