//! Pointer gestures to heatmap actions.
//!
//! Primary drag brushes a selection, a primary press/release that stays under
//! the brush threshold is a click (copy the cell label), secondary drag pans,
//! wheel and pinch zoom around the cursor.

use std::time::{Duration, Instant};

use iced_core::{Point, Rectangle, Size};

use crate::matrix::MetricMatrix;
use crate::viewport::ViewportState;

pub const DEFAULT_MIN_BRUSH_PX: f32 = 4.0;
pub const DEFAULT_ZOOM_STEP: f64 = 1.1;
const PIXELS_PER_LINE: f32 = 50.0;
pub const COPY_FEEDBACK: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Lines(f32),
    Pixels(f32),
}

impl WheelDelta {
    fn lines(self) -> f32 {
        match self {
            WheelDelta::Lines(y) => y,
            WheelDelta::Pixels(y) => y / PIXELS_PER_LINE,
        }
    }
}

/// Pointer input in surface-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Pressed { button: Button, position: Point },
    Moved { position: Point },
    Released { button: Button, position: Point },
    Wheel { delta: WheelDelta, position: Point },
    Pinch { scale: f32, center: Point },
    Left,
}

/// Sub-rectangle of the matrix picked with a brush. Column and row ends are exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushSelection {
    pub start_col: usize,
    pub end_col: usize,
    pub start_row: usize,
    pub end_row: usize,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub start_key: Option<String>,
    pub end_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Brush(BrushSelection),
    Zoom(ViewportState),
    Pan(ViewportState),
    Click { row: usize, col: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Brushing { origin: Point, current: Point },
    Panning { last: Point },
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    min_brush_px: f32,
    zoom_step: f64,
    gesture: Gesture,
    cursor: Option<Point>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BRUSH_PX, DEFAULT_ZOOM_STEP)
    }
}

impl InteractionController {
    pub fn new(min_brush_px: f32, zoom_step: f64) -> Self {
        Self {
            min_brush_px: min_brush_px.max(0.0),
            zoom_step: if zoom_step > 1.0 {
                zoom_step
            } else {
                DEFAULT_ZOOM_STEP
            },
            gesture: Gesture::Idle,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    pub fn is_brushing(&self) -> bool {
        matches!(self.gesture, Gesture::Brushing { .. })
    }

    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
        self.cursor = None;
    }

    /// In-progress brush rectangle in screen space, for overlay drawing.
    pub fn brush_rect(&self) -> Option<Rectangle> {
        match self.gesture {
            Gesture::Brushing { origin, current } => Some(screen_rect(origin, current)),
            _ => None,
        }
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        viewport: &mut ViewportState,
        matrix: &MetricMatrix,
    ) -> Option<Action> {
        match event {
            PointerEvent::Pressed { button, position } => {
                self.cursor = Some(position);
                self.gesture = match button {
                    Button::Primary => Gesture::Brushing {
                        origin: position,
                        current: position,
                    },
                    Button::Secondary => Gesture::Panning { last: position },
                };
                None
            }
            PointerEvent::Moved { position } => {
                self.cursor = Some(position);
                match &mut self.gesture {
                    Gesture::Brushing { current, .. } => {
                        *current = position;
                        None
                    }
                    Gesture::Panning { last } => {
                        let (dx, dy) = (position.x - last.x, position.y - last.y);
                        *last = position;
                        let before = *viewport;
                        viewport.pan_by(dx, dy);
                        (before != *viewport).then_some(Action::Pan(*viewport))
                    }
                    Gesture::Idle => None,
                }
            }
            PointerEvent::Released { button, position } => {
                self.cursor = Some(position);
                let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
                match (button, gesture) {
                    (Button::Primary, Gesture::Brushing { origin, .. }) => {
                        self.finish_brush(origin, position, viewport, matrix)
                    }
                    _ => None,
                }
            }
            PointerEvent::Wheel { delta, position } => {
                let lines = delta.lines();
                if lines == 0.0 || !lines.is_finite() {
                    return None;
                }
                self.zoom(self.zoom_step.powf(f64::from(lines)), position, viewport)
            }
            PointerEvent::Pinch { scale, center } => {
                if !scale.is_finite() || scale <= 0.0 {
                    return None;
                }
                self.zoom(f64::from(scale), center, viewport)
            }
            PointerEvent::Left => {
                self.cursor = None;
                None
            }
        }
    }

    fn zoom(
        &self,
        factor: f64,
        anchor: Point,
        viewport: &mut ViewportState,
    ) -> Option<Action> {
        let before = *viewport;
        viewport.zoom_at(factor, anchor);
        (before != *viewport).then_some(Action::Zoom(*viewport))
    }

    fn finish_brush(
        &self,
        origin: Point,
        end: Point,
        viewport: &ViewportState,
        matrix: &MetricMatrix,
    ) -> Option<Action> {
        let (cols, rows) = (matrix.cols(), matrix.rows());
        if cols == 0 || rows == 0 {
            return None;
        }

        let rect = screen_rect(origin, end);
        if rect.width < self.min_brush_px && rect.height < self.min_brush_px {
            let (col, row) = viewport.screen_to_data(end);
            if col < 0.0 || row < 0.0 || col >= cols as f64 || row >= rows as f64 {
                return None;
            }
            return Some(Action::Click {
                row: row as usize,
                col: col as usize,
            });
        }

        let (c0, r0) = viewport.screen_to_data(rect.position());
        let (c1, r1) = viewport.screen_to_data(Point::new(
            rect.x + rect.width,
            rect.y + rect.height,
        ));

        let (start_col, end_col) = clamp_span(c0, c1, cols);
        let (start_row, end_row) = clamp_span(r0, r1, rows);

        let (start_time, end_time) = matrix
            .time_span(start_col, end_col)
            .map_or((None, None), |(s, e)| (Some(s), Some(e)));
        let (start_key, end_key) = matrix
            .key_span(start_row, end_row)
            .map_or((None, None), |(s, e)| (Some(s.to_owned()), Some(e.to_owned())));

        Some(Action::Brush(BrushSelection {
            start_col,
            end_col,
            start_row,
            end_row,
            start_time,
            end_time,
            start_key,
            end_key,
        }))
    }
}

fn screen_rect(a: Point, b: Point) -> Rectangle {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    Rectangle::new(
        Point::new(x, y),
        Size::new((a.x - b.x).abs(), (a.y - b.y).abs()),
    )
}

/// `[lo, hi)` cell span covering `lo..hi`, clamped into `[0, len)` and never empty.
fn clamp_span(lo: f64, hi: f64, len: usize) -> (usize, usize) {
    let max = len as f64;
    let start = lo.floor().clamp(0.0, max - 1.0) as usize;
    let end = (hi.ceil().clamp(0.0, max) as usize).max(start + 1);
    (start, end)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

pub trait Clipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Transient "copied" indicator shown after a click-to-copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyFeedback {
    pub text: String,
    pub copied: bool,
    at: Instant,
}

impl CopyFeedback {
    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.at) < COPY_FEEDBACK
    }
}

/// Writes `text` to the clipboard; failures are logged and reported, never raised.
pub fn copy_to_clipboard(clipboard: &mut dyn Clipboard, text: String, now: Instant) -> CopyFeedback {
    match clipboard.write(&text) {
        Ok(()) => CopyFeedback {
            text,
            copied: true,
            at: now,
        },
        Err(err) => {
            log::warn!("Copy failed: {err}");
            CopyFeedback {
                text,
                copied: false,
                at: now,
            }
        }
    }
}
