use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::marks::{Group, Mark, MarkSet, label};
use crate::pdf::{
    DeviceProfile, PageGeometry, Rect, SessionConfig, Size, ZoomRange, compute_zoom_for_rect,
    mark_rect_at_scale1,
};
use crate::settings;

#[derive(Debug, Parser)]
#[command(name = "pagemark")]
#[command(about = "Inspect and render labeled PDF marks", version)]
pub struct Cli {
    /// Where to write the log
    #[arg(long, global = true, default_value = "pagemark.log")]
    pub log_file: PathBuf,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Settings file to use instead of the user config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the labels of the first COUNT marks.
    Labels {
        #[arg(value_name = "COUNT")]
        count: usize,
    },
    /// Print each mark's label, displayed rect and auto-fit zoom as JSON.
    Inspect {
        /// Marks JSON: `{"marks": [...], "groups": [...]}`
        #[arg(value_name = "MARKS")]
        marks: PathBuf,
        /// Page geometry JSON: `[{"page_index", "width_pt", "height_pt", "rotation_deg"}]`
        #[arg(value_name = "PAGES")]
        pages: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        #[arg(long, default_value_t = 1280.0)]
        viewport_width: f32,
        #[arg(long, default_value_t = 800.0)]
        viewport_height: f32,
        #[arg(long, default_value_t = 1.0)]
        dpr: f32,
        /// Use the touch-device zoom range
        #[arg(long)]
        touch: bool,
    },
    /// Create a mark from a pointer drag on a displayed page and write the
    /// marks file back. Prints the new mark's id.
    Add {
        /// Marks JSON; created when missing
        #[arg(value_name = "MARKS")]
        marks: PathBuf,
        #[arg(value_name = "PAGES")]
        pages: PathBuf,
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Zoom the page was displayed at
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        /// Drag start in page-local CSS pixels, `X,Y`
        #[arg(long, value_parser = parse_point)]
        from: (f32, f32),
        /// Drag end in page-local CSS pixels, `X,Y`
        #[arg(long, value_parser = parse_point)]
        to: (f32, f32),
        #[arg(long)]
        name: Option<String>,
    },
    /// Render a page to PNG, optionally highlighting a mark or group.
    /// Needs the `mupdf` feature.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Page index (0-based)
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Zoom; defaults to the highlighted mark's navigation zoom, else 1
        #[arg(long)]
        zoom: Option<f32>,
        #[arg(long, default_value_t = 1.0)]
        dpr: f32,
        #[arg(long, value_name = "MARKS")]
        marks: Option<PathBuf>,
        /// Mark id to outline and flash
        #[arg(long = "mark", value_name = "ID")]
        mark_id: Option<String>,
        /// Group id to show in overview mode
        #[arg(long = "group", value_name = "ID")]
        group_id: Option<String>,
        #[arg(long, short, default_value = "page.png")]
        output: PathBuf,
    },
}

/// Marks and groups as exchanged with the persistence backend
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MarkFile {
    #[serde(default)]
    pub marks: Vec<Mark>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
struct InspectRow<'a> {
    id: &'a str,
    label: &'a str,
    page_index: usize,
    rect: Option<Rect>,
    fit_zoom: Option<f32>,
    exceeds_page: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Labels { count } => {
            for index in 0..count {
                println!("{}", label(index));
            }
            Ok(())
        }
        Commands::Inspect {
            marks,
            pages,
            zoom,
            viewport_width,
            viewport_height,
            dpr,
            touch,
        } => {
            let device = DeviceProfile::new(dpr, touch);
            let viewport = Size::new(viewport_width, viewport_height);
            let config = settings::session_config();
            let out = run_inspect(&marks, &pages, zoom, viewport, &device, &config)?;
            println!("{out}");
            Ok(())
        }
        Commands::Add {
            marks,
            pages,
            page,
            zoom,
            from,
            to,
            name,
        } => {
            let added = run_add(AddArgs {
                marks: &marks,
                pages: &pages,
                page,
                zoom,
                from,
                to,
                name: name.as_deref(),
                min_drag_px: settings::get_min_drag_px(),
            })?;
            match added {
                Some(id) => println!("{id}"),
                None => eprintln!("drag too small on page {page}, no mark created"),
            }
            Ok(())
        }
        Commands::Render {
            file,
            page,
            zoom,
            dpr,
            marks,
            mark_id,
            group_id,
            output,
        } => render_page(RenderArgs {
            file: &file,
            page,
            zoom,
            dpr,
            marks: marks.as_deref(),
            mark_id: mark_id.as_deref(),
            group_id: group_id.as_deref(),
            output: &output,
        }),
    }
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<f32>().map_err(|e| format!("{v:?}: {e}"));
    Ok((parse(x)?, parse(y)?))
}

/// Arguments of the `add` command
pub struct AddArgs<'a> {
    pub marks: &'a Path,
    pub pages: &'a Path,
    pub page: usize,
    pub zoom: f32,
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub name: Option<&'a str>,
    pub min_drag_px: f32,
}

/// Arguments of the `render` command
pub struct RenderArgs<'a> {
    pub file: &'a Path,
    pub page: usize,
    pub zoom: Option<f32>,
    pub dpr: f32,
    pub marks: Option<&'a Path>,
    pub mark_id: Option<&'a str>,
    pub group_id: Option<&'a str>,
    pub output: &'a Path,
}

#[cfg(feature = "mupdf")]
fn render_page(args: RenderArgs<'_>) -> Result<()> {
    render::run_render(args)
}

#[cfg(not(feature = "mupdf"))]
fn render_page(args: RenderArgs<'_>) -> Result<()> {
    bail!(
        "cannot render {:?}: pagemark was built without the `mupdf` feature",
        args.file
    )
}

pub fn load_mark_file(path: &Path) -> Result<MarkSet> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading marks from {path:?}"))?;
    let file: MarkFile =
        serde_json::from_str(&content).with_context(|| format!("parsing marks in {path:?}"))?;
    MarkSet::from_records(file.marks, file.groups)
        .with_context(|| format!("loading marks from {path:?}"))
}

pub fn save_mark_file(path: &Path, set: &MarkSet) -> Result<()> {
    let file = MarkFile {
        marks: set.marks().to_vec(),
        groups: set.groups().to_vec(),
    };
    let json = serde_json::to_string_pretty(&file).context("serializing marks")?;
    fs::write(path, json).with_context(|| format!("writing marks to {path:?}"))
}

pub fn load_page_geometry(path: &Path) -> Result<Vec<PageGeometry>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading pages from {path:?}"))?;
    let mut pages: Vec<PageGeometry> =
        serde_json::from_str(&content).with_context(|| format!("parsing pages in {path:?}"))?;
    pages.sort_by_key(|p| p.page_index);
    for (i, page) in pages.iter().enumerate() {
        if page.page_index != i {
            bail!("page geometry must cover pages 0..N without gaps (missing page {i})");
        }
    }
    Ok(pages)
}

/// Add a mark drawn by a drag. Returns its id, or `None` when the drag was
/// too small once clipped to the page; the file is left alone in that case.
pub fn run_add(args: AddArgs<'_>) -> Result<Option<String>> {
    let mut set = if args.marks.exists() {
        load_mark_file(args.marks)?
    } else {
        MarkSet::new()
    };
    let pages = load_page_geometry(args.pages)?;
    let Some(page) = pages.get(args.page) else {
        bail!(
            "page {} is not in {:?} ({} pages)",
            args.page,
            args.pages,
            pages.len()
        );
    };

    let Some(mark) = set.create_from_drag(page, args.zoom, args.from, args.to, args.min_drag_px)
    else {
        info!("Drag on page {} too small, nothing added", args.page);
        return Ok(None);
    };
    let id = mark.id.clone();
    if let Some(name) = args.name {
        set.rename(&id, name)?;
    }
    save_mark_file(args.marks, &set)?;
    info!("Added mark {id} on page {} to {:?}", args.page, args.marks);
    Ok(Some(id))
}

/// JSON report of every mark's displayed rect and fit zoom
pub fn run_inspect(
    marks: &Path,
    pages: &Path,
    zoom: f32,
    viewport: Size,
    device: &DeviceProfile,
    config: &SessionConfig,
) -> Result<String> {
    let set = load_mark_file(marks)?;
    let pages = load_page_geometry(pages)?;
    let range = ZoomRange::for_device(device);
    let zoom = range.clamp(zoom);
    let dpr = config.render.dpr_limits.device_ratio(device);
    info!("Inspecting {} marks over {} pages", set.len(), pages.len());

    let rows: Vec<InspectRow<'_>> = set
        .marks()
        .iter()
        .map(|mark| {
            let page = pages.get(mark.page_index);
            InspectRow {
                id: &mark.id,
                label: &mark.label,
                page_index: mark.page_index,
                rect: page.map(|p| mark.rect_at_zoom(p, zoom)),
                fit_zoom: page.map(|p| {
                    compute_zoom_for_rect(
                        viewport,
                        mark_rect_at_scale1(mark.rect, p).size(),
                        config.fit,
                        range,
                        dpr,
                    )
                }),
                exceeds_page: mark.rect.exceeds_page(),
            }
        })
        .collect();
    serde_json::to_string_pretty(&rows).context("serializing report")
}

#[cfg(feature = "mupdf")]
mod render {
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result, anyhow, bail};
    use log::info;

    use super::RenderArgs;
    use crate::marks::MarkSet;
    use crate::pdf::{
        Command, DeviceProfile, MupdfProvider, OverlayCompositor, RenderOutcome, RenderSession,
        RenderStatus, Size, ViewerState,
    };
    use crate::settings;

    pub fn run_render(args: RenderArgs<'_>) -> Result<()> {
        let provider = MupdfProvider::open(args.file)
            .with_context(|| format!("opening {:?}", args.file))?;
        let device = DeviceProfile::new(args.dpr, false);
        let session = RenderSession::open(Arc::new(provider), device, settings::session_config())?;
        let page = session
            .page(args.page)
            .copied()
            .ok_or_else(|| anyhow!("page {} out of range", args.page))?;

        let set = match args.marks {
            Some(path) => super::load_mark_file(path)?,
            None => MarkSet::new(),
        };
        let mark = match args.mark_id {
            Some(id) => Some(set.get(id).ok_or_else(|| anyhow!("no mark {id}"))?),
            None => None,
        };

        let display = page.display_size(1.0);
        let zoom = match (args.zoom, mark) {
            (Some(zoom), _) => zoom,
            (None, Some(mark)) => session
                .navigate_to(mark, display)
                .map_or(1.0, |plan| plan.zoom),
            (None, None) => 1.0,
        };

        let mut state = ViewerState::new(device).with_flash_duration(settings::flash_duration());
        let _ = state.apply(Command::SetPageCount(session.page_count()));
        let _ = state.apply(Command::GoToPage(args.page));
        let _ = state.apply(Command::SetZoom(zoom));
        let zoom = state.zoom;

        let mut renderer = session.page_renderer();
        renderer.render(args.page, zoom);
        let mut outcome = None;
        loop {
            if let Some(event) = renderer.pump().into_iter().last() {
                outcome = Some(event.outcome);
            }
            if renderer.status() == RenderStatus::Idle {
                break;
            }
        }
        match outcome {
            Some(RenderOutcome::Ready { height_px }) => {
                info!("Rendered page {} @ {zoom:.2}, {height_px} px tall", args.page)
            }
            Some(RenderOutcome::Errored(e)) => bail!("render failed: {e}"),
            _ => bail!("render did not complete"),
        }

        if let Some(mark) = mark.filter(|m| m.page_index == args.page) {
            let rect = mark.rect_at_zoom(&page, zoom);
            let _ = state.apply(Command::Select(Some(rect)));
            let _ = state.apply(Command::Flash {
                rect,
                now: Instant::now(),
            });
        }
        if let Some(id) = args.group_id {
            let group = set.group(id).ok_or_else(|| anyhow!("no group {id}"))?;
            let _ = state.apply(Command::SetGroupRects(
                session.group_member_rects(&set, group, zoom),
            ));
            let _ = state.apply(Command::SetGroupOutline(session.group_rect(group, zoom)));
        }
        let _ = state.apply(Command::BufferSwapped(renderer.visible_buffer()));

        let surface = renderer.visible_surface();
        let mut image = surface
            .pixmap()
            .cloned()
            .ok_or_else(|| anyhow!("nothing was rendered"))?;
        let mut overlay = OverlayCompositor::new();
        overlay.bind(surface, state.visible_buffer);
        if overlay.redraw(&state.overlay) {
            overlay.composite_onto(&mut image);
        }

        image
            .save_png(args.output)
            .with_context(|| format!("writing {:?}", args.output))?;
        let Size { width, height } = surface.css_size();
        println!(
            "{}: page {} at zoom {zoom:.2} ({width}x{height} css px)",
            args.output.display(),
            args.page
        );
        Ok(())
    }
}
