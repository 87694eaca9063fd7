use std::ops::Range;

use iced_core::{Point, Rectangle, Size};

const MIN_ZOOM_FACTOR: f64 = 0.01;
const MAX_ZOOM_FACTOR: f64 = 100.0;

/// Visible window in data coordinates, measured in cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataWindow {
    pub col: f64,
    pub row: f64,
    pub cols: f64,
    pub rows: f64,
}

impl DataWindow {
    #[inline]
    pub fn col_end(&self) -> f64 {
        self.col + self.cols
    }

    #[inline]
    pub fn row_end(&self) -> f64 {
        self.row + self.rows
    }
}

/// Camera over a `cols x rows` matrix drawn into a `screen` sized surface.
///
/// Every mutator re-clamps, so the window never leaves `[0, cols] x [0, rows]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    matrix_cols: f64,
    matrix_rows: f64,
    window: DataWindow,
    screen: Size,
    min_cols: f64,
    min_rows: f64,
}

impl ViewportState {
    pub fn new(matrix_cols: usize, matrix_rows: usize, screen: Size) -> Self {
        let matrix_cols = matrix_cols as f64;
        let matrix_rows = matrix_rows as f64;
        Self {
            matrix_cols,
            matrix_rows,
            window: DataWindow {
                col: 0.0,
                row: 0.0,
                cols: matrix_cols,
                rows: matrix_rows,
            },
            screen,
            min_cols: 1.0,
            min_rows: 1.0,
        }
    }

    /// Smallest window zoom-in may reach, in cells.
    pub fn with_min_window(mut self, min_cols: f64, min_rows: f64) -> Self {
        self.min_cols = min_cols.max(f64::EPSILON);
        self.min_rows = min_rows.max(f64::EPSILON);
        self.clamp();
        self
    }

    #[inline]
    pub fn window(&self) -> DataWindow {
        self.window
    }

    #[inline]
    pub fn screen(&self) -> Size {
        self.screen
    }

    #[inline]
    pub fn matrix_size(&self) -> (usize, usize) {
        (self.matrix_cols as usize, self.matrix_rows as usize)
    }

    /// Pixels per cell along each axis.
    pub fn scale(&self) -> (f64, f64) {
        let sx = if self.window.cols > 0.0 {
            f64::from(self.screen.width) / self.window.cols
        } else {
            0.0
        };
        let sy = if self.window.rows > 0.0 {
            f64::from(self.screen.height) / self.window.rows
        } else {
            0.0
        };
        (sx, sy)
    }

    /// Data coordinate of the top-left screen corner.
    pub fn offset(&self) -> (f64, f64) {
        (self.window.col, self.window.row)
    }

    pub fn is_full(&self) -> bool {
        self.window.col == 0.0
            && self.window.row == 0.0
            && self.window.cols == self.matrix_cols
            && self.window.rows == self.matrix_rows
    }

    /// Unclamped data coordinate `(col, row)` under a screen point.
    pub fn screen_to_data(&self, point: Point) -> (f64, f64) {
        let (sx, sy) = self.scale();
        let col = if sx > 0.0 {
            self.window.col + f64::from(point.x) / sx
        } else {
            self.window.col
        };
        let row = if sy > 0.0 {
            self.window.row + f64::from(point.y) / sy
        } else {
            self.window.row
        };
        (col, row)
    }

    pub fn data_to_screen(&self, col: f64, row: f64) -> Point {
        let (sx, sy) = self.scale();
        Point::new(
            ((col - self.window.col) * sx) as f32,
            ((row - self.window.row) * sy) as f32,
        )
    }

    /// Screen rectangle covered by one cell.
    pub fn cell_bounds(&self, col: usize, row: usize) -> Rectangle {
        let (sx, sy) = self.scale();
        let top_left = self.data_to_screen(col as f64, row as f64);
        Rectangle::new(top_left, Size::new(sx as f32, sy as f32))
    }

    /// Whole cells intersecting the window, as `(rows, cols)`.
    pub fn visible_cells(&self) -> (Range<usize>, Range<usize>) {
        let (cols, rows) = self.matrix_size();
        let c0 = (self.window.col.floor().max(0.0) as usize).min(cols);
        let c1 = (self.window.col_end().ceil().max(0.0) as usize).clamp(c0, cols);
        let r0 = (self.window.row.floor().max(0.0) as usize).min(rows);
        let r1 = (self.window.row_end().ceil().max(0.0) as usize).clamp(r0, rows);
        (r0..r1, c0..c1)
    }

    pub fn resize(&mut self, screen: Size) {
        self.screen = Size::new(screen.width.max(0.0), screen.height.max(0.0));
    }

    pub fn reset(&mut self) {
        self.window = DataWindow {
            col: 0.0,
            row: 0.0,
            cols: self.matrix_cols,
            rows: self.matrix_rows,
        };
    }

    /// Zooms by `factor` (> 1 zooms in) keeping the cell under `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        if !factor.is_finite() || factor <= 0.0 || !(anchor.x.is_finite() && anchor.y.is_finite()) {
            return;
        }
        let factor = factor.clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR);
        let anchor = Point::new(
            anchor.x.clamp(0.0, self.screen.width),
            anchor.y.clamp(0.0, self.screen.height),
        );
        let (ax, ay) = self.screen_to_data(anchor);

        let frac_x = if self.window.cols > 0.0 {
            (ax - self.window.col) / self.window.cols
        } else {
            0.0
        };
        let frac_y = if self.window.rows > 0.0 {
            (ay - self.window.row) / self.window.rows
        } else {
            0.0
        };

        self.window.cols /= factor;
        self.window.rows /= factor;
        self.clamp_extent();

        self.window.col = ax - frac_x * self.window.cols;
        self.window.row = ay - frac_y * self.window.rows;
        self.clamp();
    }

    /// Pans by a screen-space drag delta; dragging right reveals earlier columns.
    pub fn pan_by(&mut self, dx_px: f32, dy_px: f32) {
        if !(dx_px.is_finite() && dy_px.is_finite()) {
            return;
        }
        let (sx, sy) = self.scale();
        if sx > 0.0 {
            self.window.col -= f64::from(dx_px) / sx;
        }
        if sy > 0.0 {
            self.window.row -= f64::from(dy_px) / sy;
        }
        self.clamp();
    }

    /// Replaces the window, e.g. after a brush selection.
    pub fn set_window(&mut self, window: DataWindow) {
        let finite = [window.col, window.row, window.cols, window.rows]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return;
        }
        self.window = window;
        self.clamp();
    }

    fn clamp_extent(&mut self) {
        let min_cols = self.min_cols.min(self.matrix_cols);
        let min_rows = self.min_rows.min(self.matrix_rows);
        self.window.cols = self.window.cols.clamp(min_cols, self.matrix_cols);
        self.window.rows = self.window.rows.clamp(min_rows, self.matrix_rows);
    }

    fn clamp(&mut self) {
        self.clamp_extent();
        self.window.col = self
            .window
            .col
            .clamp(0.0, self.matrix_cols - self.window.cols);
        self.window.row = self
            .window
            .row
            .clamp(0.0, self.matrix_rows - self.window.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn viewport() -> ViewportState {
        ViewportState::new(100, 50, Size::new(1000.0, 500.0))
    }

    fn within_bounds(v: &ViewportState) -> bool {
        let w = v.window();
        let (cols, rows) = v.matrix_size();
        w.col >= 0.0
            && w.row >= 0.0
            && w.cols > 0.0
            && w.rows > 0.0
            && w.col_end() <= cols as f64 + 1e-9
            && w.row_end() <= rows as f64 + 1e-9
    }

    #[test]
    fn starts_at_full_extent() {
        let v = viewport();
        assert!(v.is_full());
        assert_eq!(v.scale(), (10.0, 10.0));
        assert_eq!(v.visible_cells(), (0..50, 0..100));
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut v = viewport();
        let anchor = Point::new(250.0, 100.0);
        let before = v.screen_to_data(anchor);
        v.zoom_at(2.0, anchor);
        let after = v.screen_to_data(anchor);
        assert!((before.0 - after.0).abs() < 1e-6);
        assert!((before.1 - after.1).abs() < 1e-6);
        assert_eq!(v.window().cols, 50.0);
    }

    #[test]
    fn zoom_out_never_exceeds_matrix() {
        let mut v = viewport();
        v.zoom_at(4.0, Point::new(900.0, 400.0));
        v.zoom_at(0.1, Point::new(900.0, 400.0));
        assert!(v.is_full());
    }

    #[test]
    fn zoom_in_stops_at_min_window() {
        let mut v = viewport().with_min_window(2.0, 2.0);
        for _ in 0..20 {
            v.zoom_at(10.0, Point::new(500.0, 250.0));
        }
        assert_eq!(v.window().cols, 2.0);
        assert_eq!(v.window().rows, 2.0);
        assert!(within_bounds(&v));
    }

    #[test]
    fn pan_is_clamped() {
        let mut v = viewport();
        v.zoom_at(2.0, Point::new(0.0, 0.0));
        v.pan_by(10_000.0, 0.0);
        assert_eq!(v.window().col, 0.0);
        v.pan_by(-10_000.0, -10_000.0);
        assert_eq!(v.window().col_end(), 100.0);
        assert_eq!(v.window().row_end(), 50.0);
    }

    #[test]
    fn set_window_is_clamped() {
        let mut v = viewport();
        v.set_window(DataWindow {
            col: -10.0,
            row: 45.0,
            cols: 20.0,
            rows: 20.0,
        });
        let w = v.window();
        assert_eq!((w.col, w.row, w.cols, w.rows), (0.0, 30.0, 20.0, 20.0));
    }

    #[test]
    fn empty_matrix_stays_degenerate() {
        let mut v = ViewportState::new(0, 0, Size::new(100.0, 100.0));
        v.zoom_at(2.0, Point::new(10.0, 10.0));
        v.pan_by(5.0, 5.0);
        assert_eq!(v.visible_cells(), (0..0, 0..0));
        assert_eq!(v.scale(), (0.0, 0.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Zoom(f64, f32, f32),
        Pan(f32, f32),
        Resize(f32, f32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0.05f64..20.0, -200.0f32..1200.0, -200.0f32..700.0)
                .prop_map(|(f, x, y)| Op::Zoom(f, x, y)),
            (-5000.0f32..5000.0, -5000.0f32..5000.0).prop_map(|(x, y)| Op::Pan(x, y)),
            (1.0f32..2000.0, 1.0f32..2000.0).prop_map(|(w, h)| Op::Resize(w, h)),
        ]
    }

    proptest! {
        #[test]
        fn window_stays_inside_matrix(
            cols in 1usize..500,
            rows in 1usize..500,
            ops in proptest::collection::vec(op(), 0..40),
        ) {
            let mut v = ViewportState::new(cols, rows, Size::new(1000.0, 500.0));
            for op in ops {
                match op {
                    Op::Zoom(f, x, y) => v.zoom_at(f, Point::new(x, y)),
                    Op::Pan(dx, dy) => v.pan_by(dx, dy),
                    Op::Resize(w, h) => v.resize(Size::new(w, h)),
                }
                prop_assert!(within_bounds(&v), "{:?}", v.window());
            }
        }
    }
}
