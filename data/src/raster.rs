use std::ops::Range;

use crate::color::ColorScheme;
use crate::matrix::MetricMatrix;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    #[error("buffer holds {actual} cells, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("could not allocate a {width}x{height} surface: {reason}")]
    Allocation {
        width: usize,
        height: usize,
        reason: String,
    },
    #[error("surface already released")]
    Released,
}

/// One color-table index per cell, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBuffer {
    width: usize,
    height: usize,
    indices: Vec<u8>,
}

impl NormalizedBuffer {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.indices
    }
}

/// Packed `0xAABBGGRR` pixels, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Normalizes the whole matrix.
pub fn normalize(matrix: &MetricMatrix, scheme: &ColorScheme) -> NormalizedBuffer {
    normalize_region(matrix, scheme, 0..matrix.rows(), 0..matrix.cols())
}

/// Normalizes the sub-rectangle `rows x cols`, clipped to the matrix.
pub fn normalize_region(
    matrix: &MetricMatrix,
    scheme: &ColorScheme,
    rows: Range<usize>,
    cols: Range<usize>,
) -> NormalizedBuffer {
    let mut out = NormalizedBuffer::default();
    normalize_into(matrix, scheme, rows, cols, &mut out);
    out
}

/// Same as [`normalize_region`], reusing the allocation held by `out`.
pub fn normalize_into(
    matrix: &MetricMatrix,
    scheme: &ColorScheme,
    rows: Range<usize>,
    cols: Range<usize>,
    out: &mut NormalizedBuffer,
) {
    let rows = clip(rows, matrix.rows());
    let cols = clip(cols, matrix.cols());
    let width = cols.len();
    let height = rows.len();

    out.width = width;
    out.height = height;
    out.indices.clear();
    out.indices.reserve(width * height);

    let stride = matrix.cols();
    let values = matrix.values();
    for row in rows {
        let line = &values[row * stride + cols.start..row * stride + cols.end];
        out.indices.extend(line.iter().map(|&v| scheme.index_of(v)));
    }
}

#[inline]
fn clip(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

pub fn composite(
    buffer: &NormalizedBuffer,
    width: usize,
    height: usize,
    scheme: &ColorScheme,
) -> Result<PixelBuffer, RasterError> {
    let expected = width * height;
    if buffer.len() != expected {
        return Err(RasterError::ShapeMismatch {
            expected,
            actual: buffer.len(),
        });
    }

    let table = scheme.rasterized_colors();
    let pixels = buffer
        .as_slice()
        .iter()
        .map(|&i| table[(i as usize).min(table.len() - 1)])
        .collect();

    Ok(PixelBuffer {
        width,
        height,
        pixels,
    })
}

/// Drawable target the composited pixels are painted onto.
pub trait Surface {
    fn blit(&mut self, pixels: &PixelBuffer) -> Result<(), SurfaceError>;

    /// Drops the current frame, leaving the surface blank but usable.
    fn clear(&mut self);

    fn release(&mut self) {}
}

/// Headless surface that keeps the last blitted frame in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    frame: Option<PixelBuffer>,
    blits: usize,
    released: bool,
}

impl MemorySurface {
    pub fn frame(&self) -> Option<&PixelBuffer> {
        self.frame.as_ref()
    }

    pub fn blit_count(&self) -> usize {
        self.blits
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Surface for MemorySurface {
    fn blit(&mut self, pixels: &PixelBuffer) -> Result<(), SurfaceError> {
        if self.released {
            return Err(SurfaceError::Released);
        }
        self.frame = Some(pixels.clone());
        self.blits += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.frame = None;
    }

    fn release(&mut self) {
        self.frame = None;
        self.released = true;
    }
}
