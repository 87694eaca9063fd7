//! Heatmap view: owns the surface, viewport and scheme cache, and re-runs the
//! normalize/composite/blit pipeline whenever its inputs or window change.
//!
//! Data arrives asynchronously. Every fetch is tagged with a [`FetchTicket`]
//! carrying a monotonically increasing generation; only the newest ticket may
//! update the view, so a slow older fetch can never overwrite newer data.

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use iced_core::{Point, Size};

use crate::cache::TtlCache;
use crate::color::{ColorScheme, SchemeError};
use crate::config::{HeatmapConfig, clamp_brightness};
use crate::format::format_time;
use crate::interaction::{
    Action, BrushSelection, Clipboard, CopyFeedback, InteractionController, PointerEvent,
    copy_to_clipboard,
};
use crate::matrix::MetricMatrix;
use crate::metric::MetricTag;
use crate::raster::{self, NormalizedBuffer, RasterError, Surface, SurfaceError};
use crate::viewport::{DataWindow, ViewportState};

static NEXT_CHART_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Scheme(#[from] SchemeError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Uninitialized,
    Rendering,
    Empty,
    Disposed,
}

/// Identifies a mounted chart to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle {
    pub id: u64,
}

/// Host callbacks. Every method defaults to a no-op.
pub trait HeatmapHandler {
    fn on_chart_init(&mut self, _handle: ChartHandle) {}
    fn on_brush(&mut self, _range: BrushSelection) {}
    fn on_zoom(&mut self, _viewport: ViewportState) {}
    fn on_pan(&mut self, _viewport: ViewportState) {}
    fn on_copy(&mut self, _feedback: &CopyFeedback) {}
}

impl HeatmapHandler for () {}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Init(ChartHandle),
    Brush(BrushSelection),
    Zoom(ViewportState),
    Pan(ViewportState),
    Copied(CopyFeedback),
}

/// Queues callbacks so hosts can drain them after each call.
impl HeatmapHandler for Vec<ViewEvent> {
    fn on_chart_init(&mut self, handle: ChartHandle) {
        self.push(ViewEvent::Init(handle));
    }

    fn on_brush(&mut self, range: BrushSelection) {
        self.push(ViewEvent::Brush(range));
    }

    fn on_zoom(&mut self, viewport: ViewportState) {
        self.push(ViewEvent::Zoom(viewport));
    }

    fn on_pan(&mut self, viewport: ViewportState) {
        self.push(ViewEvent::Pan(viewport));
    }

    fn on_copy(&mut self, feedback: &CopyFeedback) {
        self.push(ViewEvent::Copied(feedback.clone()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of a fetch, tagged with the ticket it was started under.
#[derive(Debug, Clone)]
pub struct Fetched<E> {
    pub ticket: FetchTicket,
    pub result: Result<Option<MetricMatrix>, E>,
}

/// Awaits a matrix fetch and tags its result with `ticket`.
pub async fn fetch<F, E>(ticket: FetchTicket, fut: F) -> Fetched<E>
where
    F: Future<Output = Result<Option<MetricMatrix>, E>>,
{
    Fetched {
        ticket,
        result: fut.await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was started after this one; its result was dropped.
    Stale,
    Failed,
    Disposed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverInfo {
    pub row: usize,
    pub col: usize,
    pub value: f64,
    pub label: String,
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl HoverInfo {
    /// Text placed on the clipboard for click-to-copy.
    pub fn copy_text(&self) -> String {
        self.start_key.clone().unwrap_or_else(|| self.label.clone())
    }
}

type SchemeKey = (u64, u64);

pub struct HeatmapView<S, H> {
    handle: ChartHandle,
    state: ViewState,
    surface: S,
    handler: H,
    matrix: Option<Arc<MetricMatrix>>,
    metric: MetricTag,
    brightness: f64,
    viewport: ViewportState,
    min_window: (f64, f64),
    interaction: InteractionController,
    schemes: TtlCache<SchemeKey, Arc<ColorScheme>>,
    scheme: Option<Arc<ColorScheme>>,
    normalized: NormalizedBuffer,
    region: (Range<usize>, Range<usize>),
    generation: u64,
    copy_feedback: Option<CopyFeedback>,
    container: Option<Size>,
}

impl<S: Surface, H: HeatmapHandler> HeatmapView<S, H> {
    pub fn new(config: &HeatmapConfig, surface: S, handler: H) -> Self {
        let min_window = (config.min_visible_cols, config.min_visible_rows);
        Self {
            handle: ChartHandle {
                id: NEXT_CHART_ID.fetch_add(1, Ordering::Relaxed),
            },
            state: ViewState::Uninitialized,
            surface,
            handler,
            matrix: None,
            metric: config.metric,
            brightness: clamp_brightness(config.brightness),
            viewport: ViewportState::new(0, 0, Size::ZERO),
            min_window,
            interaction: InteractionController::new(config.min_brush_px, config.zoom_step),
            schemes: TtlCache::new(config.scheme_cache_capacity, config.scheme_cache_ttl()),
            scheme: None,
            normalized: NormalizedBuffer::default(),
            region: (0..0, 0..0),
            generation: 0,
            copy_feedback: None,
            container: None,
        }
    }

    pub fn handle(&self) -> ChartHandle {
        self.handle
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn metric(&self) -> MetricTag {
        self.metric
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn matrix(&self) -> Option<&MetricMatrix> {
        self.matrix.as_deref()
    }

    pub fn scheme(&self) -> Option<&ColorScheme> {
        self.scheme.as_deref()
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    /// Cells covered by the last blitted frame, as `(rows, cols)`.
    pub fn rendered_region(&self) -> (Range<usize>, Range<usize>) {
        self.region.clone()
    }

    pub fn copy_feedback(&self, now: Instant) -> Option<&CopyFeedback> {
        self.copy_feedback.as_ref().filter(|f| f.is_visible(now))
    }

    /// Container layout changed. The view never observes layout on its own.
    pub fn size(&mut self, width: f32, height: f32) -> Result<(), RenderError> {
        if self.state == ViewState::Disposed {
            return Ok(());
        }
        let size = Size::new(width.max(0.0), height.max(0.0));
        self.container = Some(size);
        self.viewport.resize(size);
        self.render()
    }

    /// Starts a fetch; any ticket handed out earlier becomes stale.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.state == ViewState::Disposed {
            return None;
        }
        self.generation += 1;
        Some(FetchTicket {
            generation: self.generation,
        })
    }

    pub fn apply_fetched<E: std::fmt::Display>(
        &mut self,
        fetched: Fetched<E>,
    ) -> Result<FetchOutcome, RenderError> {
        if self.state == ViewState::Disposed {
            return Ok(FetchOutcome::Disposed);
        }
        if fetched.ticket.generation != self.generation {
            log::debug!(
                "Discarding stale fetch {} (current {})",
                fetched.ticket.generation,
                self.generation
            );
            return Ok(FetchOutcome::Stale);
        }

        match fetched.result {
            Ok(matrix) => {
                self.set_matrix(matrix)?;
                Ok(FetchOutcome::Applied)
            }
            Err(err) => {
                log::warn!("Heatmap fetch failed: {err}");
                Ok(FetchOutcome::Failed)
            }
        }
    }

    /// Replaces the matrix; `None` or an empty matrix shows the placeholder.
    pub fn set_matrix(&mut self, matrix: Option<MetricMatrix>) -> Result<(), RenderError> {
        if self.state == ViewState::Disposed {
            return Ok(());
        }

        match matrix {
            Some(matrix) => {
                if self.viewport.matrix_size() != (matrix.cols(), matrix.rows()) {
                    self.viewport = ViewportState::new(
                        matrix.cols(),
                        matrix.rows(),
                        self.container.unwrap_or(Size::ZERO),
                    )
                    .with_min_window(self.min_window.0, self.min_window.1);
                }
                self.matrix = Some(Arc::new(matrix));
            }
            None => self.matrix = None,
        }
        self.interaction.cancel();
        self.render()
    }

    pub fn set_metric(&mut self, metric: MetricTag) -> Result<(), RenderError> {
        if self.metric == metric {
            return Ok(());
        }
        self.metric = metric;
        self.render()
    }

    pub fn set_brightness(&mut self, brightness: f64) -> Result<(), RenderError> {
        let brightness = clamp_brightness(brightness);
        if self.brightness == brightness {
            return Ok(());
        }
        self.brightness = brightness;
        self.render()
    }

    /// Zooms the viewport onto a brushed range.
    pub fn zoom_to(&mut self, selection: &BrushSelection) -> Result<(), RenderError> {
        if self.state != ViewState::Rendering {
            return Ok(());
        }
        self.viewport.set_window(DataWindow {
            col: selection.start_col as f64,
            row: selection.start_row as f64,
            cols: selection.end_col.saturating_sub(selection.start_col) as f64,
            rows: selection.end_row.saturating_sub(selection.start_row) as f64,
        });
        self.render()?;
        self.handler.on_zoom(self.viewport);
        Ok(())
    }

    pub fn reset_zoom(&mut self) -> Result<(), RenderError> {
        if self.state != ViewState::Rendering || self.viewport.is_full() {
            return Ok(());
        }
        self.viewport.reset();
        self.render()?;
        self.handler.on_zoom(self.viewport);
        Ok(())
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<(), RenderError> {
        if self.state != ViewState::Rendering {
            return Ok(());
        }
        let Some(matrix) = self.matrix.clone() else {
            return Ok(());
        };

        match self.interaction.handle(event, &mut self.viewport, &matrix) {
            Some(Action::Brush(selection)) => self.handler.on_brush(selection),
            Some(Action::Zoom(viewport)) => {
                self.render()?;
                self.handler.on_zoom(viewport);
            }
            Some(Action::Pan(viewport)) => {
                self.render()?;
                self.handler.on_pan(viewport);
            }
            Some(Action::Click { row, col }) => {
                if let Some(info) = self.cell_info(row, col) {
                    let feedback = copy_to_clipboard(clipboard, info.copy_text(), now);
                    self.handler.on_copy(&feedback);
                    self.copy_feedback = Some(feedback);
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Tooltip data for the cell under a surface-local point.
    pub fn hover(&self, point: Point) -> Option<HoverInfo> {
        if self.state != ViewState::Rendering {
            return None;
        }
        let (col, row) = self.viewport.screen_to_data(point);
        if col < 0.0 || row < 0.0 {
            return None;
        }
        self.cell_info(row as usize, col as usize)
    }

    fn cell_info(&self, row: usize, col: usize) -> Option<HoverInfo> {
        let matrix = self.matrix.as_ref()?;
        let value = matrix.get(row, col)?;
        let (start_key, end_key) = matrix
            .key_span(row, row + 1)
            .map_or((None, None), |(s, e)| (Some(s.to_owned()), Some(e.to_owned())));
        let (start_time, end_time) = matrix
            .time_span(col, col + 1)
            .map_or((None, None), |(s, e)| (Some(format_time(s)), Some(format_time(e))));

        Some(HoverInfo {
            row,
            col,
            value,
            label: self.metric.format_value(value),
            start_key,
            end_key,
            start_time,
            end_time,
        })
    }

    /// Releases the surface. Pending fetches resolve as `Disposed` from here on.
    pub fn dispose(&mut self) {
        if self.state == ViewState::Disposed {
            return;
        }
        self.surface.release();
        self.state = ViewState::Disposed;
        self.matrix = None;
        self.scheme = None;
        self.schemes.clear();
        self.normalized = NormalizedBuffer::default();
        self.interaction.cancel();
        self.copy_feedback = None;
        log::debug!("Heatmap {} disposed", self.handle.id);
    }

    fn render(&mut self) -> Result<(), RenderError> {
        if self.state == ViewState::Disposed {
            return Ok(());
        }
        let Some(container) = self.container else {
            return Ok(());
        };
        let Some(matrix) = self.matrix.clone() else {
            self.show_placeholder();
            return Ok(());
        };

        let max_value = matrix.max_value();
        if matrix.is_empty() || max_value <= 0.0 {
            log::debug!("Heatmap {} has no traffic to draw", self.handle.id);
            self.show_placeholder();
            return Ok(());
        }

        let scheme = self.scheme_for(max_value)?;
        let (rows, cols) = self.viewport.visible_cells();

        raster::normalize_into(&matrix, &scheme, rows.clone(), cols.clone(), &mut self.normalized);
        let pixels = raster::composite(
            &self.normalized,
            self.normalized.width(),
            self.normalized.height(),
            &scheme,
        )?;

        if let Err(err) = self.surface.blit(&pixels) {
            log::error!("Heatmap {} blit failed: {err}", self.handle.id);
            return Err(err.into());
        }

        self.region = (rows, cols);
        self.scheme = Some(scheme);

        if self.state == ViewState::Uninitialized {
            log::info!(
                "Heatmap {} mounted at {}x{}",
                self.handle.id,
                container.width,
                container.height
            );
            self.state = ViewState::Rendering;
            self.handler.on_chart_init(self.handle);
        } else {
            self.state = ViewState::Rendering;
        }
        Ok(())
    }

    fn show_placeholder(&mut self) {
        if self.state == ViewState::Uninitialized && self.matrix.is_none() {
            return;
        }
        self.state = ViewState::Empty;
        self.region = (0..0, 0..0);
        self.normalized = NormalizedBuffer::default();
        self.surface.clear();
    }

    fn scheme_for(&mut self, max_value: f64) -> Result<Arc<ColorScheme>, SchemeError> {
        let brightness = self.brightness;
        let key = (max_value.to_bits(), brightness.to_bits());
        let handle = self.handle.id;
        let stats = self.schemes.stats();
        self.schemes
            .get_or_try_insert_with(key, Instant::now(), || {
                log::debug!(
                    "Heatmap {handle} building scheme for max {max_value} (cache hit rate {:.2})",
                    stats.hit_rate()
                );
                ColorScheme::new(max_value, brightness).map(Arc::new)
            })
    }
}
