//! Multi-page PDF report for the per-run calibration fits.
//!
//! Every calibrated run gets its own page: a scatter of the observed pairs
//! with the fitted line, drawn by plotters through [`PdfPageBackend`].

use crate::{
    LinearFit,
    Point,
};
use plotters::prelude::*;
use plotters_backend::text_anchor::{
    HPos,
    VPos,
};
use plotters_backend::{
    BackendColor,
    BackendCoord,
    BackendStyle,
    BackendTextStyle,
    DrawingErrorKind,
};
use printpdf::path::{
    PaintMode,
    WindingOrder,
};
use printpdf::{
    BuiltinFont,
    Color as PdfColor,
    IndirectFontRef,
    Line,
    Mm,
    PdfDocument,
    PdfDocumentReference,
    PdfLayerReference,
    Polygon as PdfPolygon,
    Rgb,
};
use std::convert::Infallible;
use std::fs::File;
use std::io::{
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Default location of the report, relative to the working directory.
pub const DEFAULT_REPORT_PATH: &str = "rtcalibration.pdf";

/// Page size in PDF points; the plot backend uses one pixel per point.
const PAGE_WIDTH: u32 = 800;
const PAGE_HEIGHT: u32 = 600;
const MM_PER_PT: f32 = 25.4 / 72.0;
const CIRCLE_SEGMENTS: usize = 16;

const DOCUMENT_TITLE: &str = "RT calibration";
const EMPTY_REPORT_TEXT: &str = "No runs were calibrated";

#[derive(Debug)]
pub enum DiagnosticsError {
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    Render(String),
    Closed,
}

impl std::fmt::Display for DiagnosticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticsError::Io { source, path } => {
                write!(f, "Error writing report {}: {}", path.display(), source)
            }
            DiagnosticsError::Render(msg) => write!(f, "Error rendering plot: {}", msg),
            DiagnosticsError::Closed => write!(f, "Report was already closed"),
        }
    }
}

impl std::error::Error for DiagnosticsError {}

/// Anything that can receive one diagnostic page per calibrated run.
pub trait DiagnosticSink {
    fn add_page(
        &mut self,
        run_id: &str,
        points: &[Point],
        line: &LinearFit,
    ) -> Result<(), DiagnosticsError>;
}

/// Discards every page, for when plotting is turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn add_page(
        &mut self,
        _run_id: &str,
        _points: &[Point],
        _line: &LinearFit,
    ) -> Result<(), DiagnosticsError> {
        Ok(())
    }
}

struct PdfPages {
    document: PdfDocumentReference,
    font: IndirectFontRef,
}

impl PdfPages {
    fn open(layer_name: &str) -> Result<(Self, PdfLayerReference), DiagnosticsError> {
        let (document, page, layer) =
            PdfDocument::new(DOCUMENT_TITLE, pt(PAGE_WIDTH), pt(PAGE_HEIGHT), layer_name);
        let font = document
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_err)?;
        let layer = document.get_page(page).get_layer(layer);
        Ok((Self { document, font }, layer))
    }

    fn add_page(&self, layer_name: &str) -> PdfLayerReference {
        let (page, layer) = self
            .document
            .add_page(pt(PAGE_WIDTH), pt(PAGE_HEIGHT), layer_name);
        self.document.get_page(page).get_layer(layer)
    }
}

/// PDF report with one page per run.
///
/// The output file is created up front and the document is written when it
/// is closed, exactly once, either through [`DiagnosticReport::close`] or when
/// the value is dropped.
pub struct DiagnosticReport {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    pages: Option<PdfPages>,
    runs: Vec<String>,
}

impl std::fmt::Debug for DiagnosticReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticReport")
            .field("path", &self.path)
            .field("open", &self.writer.is_some())
            .field("runs", &self.runs)
            .finish()
    }
}

impl DiagnosticReport {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, DiagnosticsError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| DiagnosticsError::Io {
            source,
            path: path.clone(),
        })?;
        debug!("Opened calibration report at {}", path.display());

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            pages: None,
            runs: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_pages(&self) -> usize {
        self.runs.len()
    }

    /// Run ids in page order.
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Writes the document and returns the number of pages in it.
    pub fn close(mut self) -> Result<usize, DiagnosticsError> {
        self.finish()?;
        Ok(self.runs.len())
    }

    fn finish(&mut self) -> Result<(), DiagnosticsError> {
        let Some(mut writer) = self.writer.take() else {
            return Err(DiagnosticsError::Closed);
        };
        let pages = match self.pages.take() {
            Some(pages) => pages,
            None => {
                // A PDF needs at least one page.
                let (pages, layer) = PdfPages::open("empty")?;
                layer.use_text(
                    EMPTY_REPORT_TEXT,
                    14.0,
                    pt(40),
                    pt(PAGE_HEIGHT - 60),
                    &pages.font,
                );
                pages
            }
        };

        pages.document.save(&mut writer).map_err(render_err)?;
        writer.flush().map_err(|source| DiagnosticsError::Io {
            source,
            path: self.path.clone(),
        })?;
        info!(
            "Wrote {} calibration plots to {}",
            self.runs.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl Drop for DiagnosticReport {
    fn drop(&mut self) {
        if self.writer.is_some()
            && let Err(e) = self.finish()
        {
            warn!("Failed to close calibration report: {}", e);
        }
    }
}

impl DiagnosticSink for DiagnosticReport {
    fn add_page(
        &mut self,
        run_id: &str,
        points: &[Point],
        line: &LinearFit,
    ) -> Result<(), DiagnosticsError> {
        if self.writer.is_none() {
            return Err(DiagnosticsError::Closed);
        }
        let (layer, font) = match &self.pages {
            Some(pages) => (pages.add_page(run_id), pages.font.clone()),
            None => {
                let (pages, layer) = PdfPages::open(run_id)?;
                let font = pages.font.clone();
                self.pages = Some(pages);
                (layer, font)
            }
        };

        // The page exists from here on, even if drawing it fails.
        self.runs.push(run_id.to_string());
        render_page(
            PdfPageBackend::new(layer, font, (PAGE_WIDTH, PAGE_HEIGHT)),
            run_id,
            points,
            line,
        )
    }
}

fn pt(v: u32) -> Mm {
    Mm(v as f32 * MM_PER_PT)
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad, max + pad)
}

fn render_err<E: std::fmt::Display>(e: E) -> DiagnosticsError {
    DiagnosticsError::Render(e.to_string())
}

/// Draws the observed pairs and the fitted line onto `backend`.
pub fn render_page<DB: DrawingBackend>(
    backend: DB,
    run_id: &str,
    points: &[Point],
    line: &LinearFit,
) -> Result<(), DiagnosticsError> {
    let (x_min, x_max) = padded_range(points.iter().map(|p| p.x));
    let line_ends = [(x_min, line.predict(x_min)), (x_max, line.predict(x_max))];
    let (y_min, y_max) = padded_range(
        points
            .iter()
            .map(|p| p.y)
            .chain(line_ends.iter().map(|p| p.1)),
    );

    let root = backend.into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let caption = format!(
        "{}  R2: {:.4}  R2adj: {:.4}",
        run_id, line.r_squared, line.adj_r_squared
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 16))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Retention time")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.x, p.y), 3, BLUE.filled())),
        )
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(line_ends, &RED))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Plotters backend drawing onto one PDF page.
///
/// Backend coordinates are PDF points measured from the top left corner.
/// Text is set in Helvetica and always horizontal.
pub struct PdfPageBackend {
    layer: PdfLayerReference,
    font: IndirectFontRef,
    size: (u32, u32),
}

impl PdfPageBackend {
    pub fn new(layer: PdfLayerReference, font: IndirectFontRef, size: (u32, u32)) -> Self {
        Self { layer, font, size }
    }

    /// Flips the y axis, PDF pages grow upwards from the bottom left corner.
    fn to_mm(&self, (x, y): BackendCoord) -> (Mm, Mm) {
        let height = self.size.1 as f32;
        (
            Mm(x as f32 * MM_PER_PT),
            Mm((height - y as f32) * MM_PER_PT),
        )
    }

    fn to_pdf(&self, coord: BackendCoord) -> printpdf::Point {
        let (x, y) = self.to_mm(coord);
        printpdf::Point::new(x, y)
    }

    fn path(
        &self,
        coords: impl IntoIterator<Item = BackendCoord>,
    ) -> Vec<(printpdf::Point, bool)> {
        coords.into_iter().map(|c| (self.to_pdf(c), false)).collect()
    }

    fn stroke(
        &self,
        coords: Vec<(printpdf::Point, bool)>,
        closed: bool,
        color: BackendColor,
        width: u32,
    ) {
        if coords.len() < 2 || color.alpha == 0.0 {
            return;
        }
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(width.max(1) as f32);
        self.layer.add_line(Line {
            points: coords,
            is_closed: closed,
        });
    }

    fn fill(&self, coords: Vec<(printpdf::Point, bool)>, color: BackendColor) {
        if coords.len() < 3 || color.alpha == 0.0 {
            return;
        }
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(PdfPolygon {
            rings: vec![coords],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }
}

fn pdf_color(color: BackendColor) -> PdfColor {
    let (r, g, b) = color.rgb;
    PdfColor::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn circle_coords(center: BackendCoord, radius: u32) -> Vec<BackendCoord> {
    let r = radius as f64;
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = i as f64 * std::f64::consts::TAU / CIRCLE_SEGMENTS as f64;
            (
                center.0 + (r * theta.cos()).round() as i32,
                center.1 + (r * theta.sin()).round() as i32,
            )
        })
        .collect()
}

impl DrawingBackend for PdfPageBackend {
    type ErrorType = Infallible;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let (x, y) = point;
        let square = self.path([(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)]);
        self.fill(square, color);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let coords = self.path([from, to]);
        self.stroke(coords, false, style.color(), style.stroke_width());
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let (x0, y0) = upper_left;
        let (x1, y1) = bottom_right;
        let coords = self.path([(x0, y0), (x1, y0), (x1, y1), (x0, y1)]);
        if fill {
            self.fill(coords, style.color());
        } else {
            self.stroke(coords, true, style.color(), style.stroke_width());
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let coords = self.path(path);
        self.stroke(coords, false, style.color(), style.stroke_width());
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let coords = self.path(circle_coords(center, radius));
        if fill {
            self.fill(coords, style.color());
        } else {
            self.stroke(coords, true, style.color(), style.stroke_width());
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let coords = self.path(vert);
        self.fill(coords, style.color());
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let color = style.color();
        if text.is_empty() || color.alpha == 0.0 {
            return Ok(());
        }
        let size = style.size();
        let width = style
            .layout_box(text)
            .map(|((x0, _), (x1, _))| f64::from(x1 - x0))
            .unwrap_or(size * 0.5 * text.chars().count() as f64);

        let anchor = style.anchor();
        let x = match anchor.h_pos {
            HPos::Left => pos.0 as f64,
            HPos::Center => pos.0 as f64 - width / 2.0,
            HPos::Right => pos.0 as f64 - width,
        };
        // PDF places text by its baseline
        let baseline = match anchor.v_pos {
            VPos::Top => pos.1 as f64 + size * 0.8,
            VPos::Center => pos.1 as f64 + size * 0.35,
            VPos::Bottom => pos.1 as f64,
        };

        let (x, y) = self.to_mm((x.round() as i32, baseline.round() as i32));
        self.layer.set_fill_color(pdf_color(color));
        self.layer.use_text(text, size as f32, x, y, &self.font);
        Ok(())
    }
}
