//! Color scheme for the heatmap.
//!
//! A scheme pairs a symmetric-log scale over `[0, max_value / brightness]` with a
//! fixed dark-to-bright ramp, and precomputes a lookup table of
//! `RASTERIZATION_LEVEL + 1` packed colors sampled exponentially over
//! `[1, max_value]`. The normalizer maps raw values back onto that table with
//! [`log_position`], the exact inverse of the sampling.

use palette::{FromColor, Hsl, Mix, Srgb};

pub const RASTERIZATION_LEVEL: usize = 100;

/// Dark-to-bright perceptual ramp, interpolated in sRGB space.
const RAMP: [[u8; 3]; 18] = [
    [0, 0, 0],
    [8, 8, 32],
    [13, 18, 64],
    [28, 25, 102],
    [50, 26, 130],
    [78, 30, 150],
    [108, 34, 156],
    [138, 42, 150],
    [166, 52, 138],
    [192, 64, 120],
    [214, 82, 98],
    [232, 104, 74],
    [244, 130, 52],
    [250, 158, 34],
    [252, 188, 38],
    [248, 218, 70],
    [244, 240, 130],
    [255, 255, 255],
];

const LABEL_DARK: Srgb<u8> = Srgb::new(0, 0, 0);
const LABEL_LIGHT: Srgb<u8> = Srgb::new(255, 255, 255);

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SchemeError {
    #[error("color scale domain must be positive, got max value {max_value}")]
    InvalidDomain { max_value: f64 },
    #[error("brightness must be positive and finite, got {0}")]
    InvalidBrightness(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorScheme {
    max_value: f64,
    brightness: f64,
    rasterized: [u32; RASTERIZATION_LEVEL + 1],
}

impl ColorScheme {
    pub fn new(max_value: f64, brightness: f64) -> Result<Self, SchemeError> {
        if !(max_value.is_finite() && max_value > 0.0) {
            return Err(SchemeError::InvalidDomain { max_value });
        }
        if !(brightness.is_finite() && brightness > 0.0) {
            return Err(SchemeError::InvalidBrightness(brightness));
        }

        let mut scheme = Self {
            max_value,
            brightness,
            rasterized: [0; RASTERIZATION_LEVEL + 1],
        };

        for i in 0..=RASTERIZATION_LEVEL {
            let t = i as f64 / RASTERIZATION_LEVEL as f64;
            scheme.rasterized[i] = pack(scheme.background(sample_at(t, max_value)));
        }

        Ok(scheme)
    }

    #[inline]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    #[inline]
    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    /// Upper end of the scale domain once brightness damping is applied.
    #[inline]
    pub fn domain_max(&self) -> f64 {
        self.max_value / self.brightness
    }

    #[inline]
    pub fn rasterized_colors(&self) -> &[u32; RASTERIZATION_LEVEL + 1] {
        &self.rasterized
    }

    #[inline]
    pub fn color_at(&self, index: u8) -> u32 {
        self.rasterized[(index as usize).min(RASTERIZATION_LEVEL)]
    }

    /// Bucket index of `value` in the rasterized table.
    #[inline]
    pub fn index_of(&self, value: f64) -> u8 {
        let idx = (RASTERIZATION_LEVEL as f64 * log_position(value, self.max_value)).round();
        idx.clamp(0.0, RASTERIZATION_LEVEL as f64) as u8
    }

    pub fn background(&self, value: f64) -> Srgb<u8> {
        ramp(symlog(value) / symlog(self.domain_max()))
    }

    /// Text color with enough contrast over `background(value)`.
    pub fn label(&self, value: f64) -> Srgb<u8> {
        let bg: Srgb<f32> = self.background(value).into_format();
        let hsl: Hsl = Hsl::from_color(bg);
        if hsl.lightness > 0.5 {
            LABEL_DARK
        } else {
            LABEL_LIGHT
        }
    }
}

pub fn build_color_scheme(max_value: f64, brightness: f64) -> Result<ColorScheme, SchemeError> {
    ColorScheme::new(max_value, brightness)
}

/// Position of `value` in `[0, 1]` under the exponential sampling used for the
/// rasterized table. Monotonic and total, including zero.
pub fn log_position(value: f64, max_value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }
    let t = if max_value > 1.0 {
        value.ln() / max_value.ln()
    } else {
        value / max_value
    };
    t.clamp(0.0, 1.0)
}

#[inline]
fn sample_at(t: f64, max_value: f64) -> f64 {
    if max_value > 1.0 {
        max_value.powf(t)
    } else {
        max_value * t
    }
}

#[inline]
fn symlog(x: f64) -> f64 {
    x.signum() * x.abs().ln_1p()
}

fn ramp(t: f64) -> Srgb<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let segments = (RAMP.len() - 1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(RAMP.len() - 2);
    let frac = (pos - i as f64) as f32;

    let [r0, g0, b0] = RAMP[i];
    let [r1, g1, b1] = RAMP[i + 1];
    let a: Srgb<f32> = Srgb::new(r0, g0, b0).into_format();
    let b: Srgb<f32> = Srgb::new(r1, g1, b1).into_format();

    a.mix(b, frac).into_format()
}

/// `R | G << 8 | B << 16 | 0xFF000000`, i.e. little-endian RGBA with opaque alpha.
#[inline]
pub fn pack(color: Srgb<u8>) -> u32 {
    u32::from(color.red) | u32::from(color.green) << 8 | u32::from(color.blue) << 16 | 0xFF00_0000
}

#[inline]
pub fn unpack(packed: u32) -> [u8; 4] {
    packed.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_domain() {
        assert_eq!(
            ColorScheme::new(0.0, 1.0),
            Err(SchemeError::InvalidDomain { max_value: 0.0 })
        );
        assert!(matches!(
            ColorScheme::new(-5.0, 1.0),
            Err(SchemeError::InvalidDomain { .. })
        ));
        assert!(matches!(
            ColorScheme::new(10.0, 0.0),
            Err(SchemeError::InvalidBrightness(_))
        ));
    }

    #[test]
    fn scheme_is_pure() {
        let a = build_color_scheme(1000.0, 2.0).unwrap();
        let b = build_color_scheme(1000.0, 2.0).unwrap();
        assert_eq!(a.rasterized_colors(), b.rasterized_colors());
    }

    #[test]
    fn packed_colors_are_opaque() {
        let scheme = build_color_scheme(1000.0, 1.0).unwrap();
        for &c in scheme.rasterized_colors() {
            assert_eq!(c >> 24, 0xFF);
        }
    }

    #[test]
    fn pack_layout() {
        assert_eq!(pack(Srgb::new(1, 2, 3)), 0xFF03_0201);
        assert_eq!(unpack(0xFF03_0201), [1, 2, 3, 255]);
    }

    #[test]
    fn label_is_black_or_white() {
        let scheme = build_color_scheme(1000.0, 1.0).unwrap();
        for i in 0..=RASTERIZATION_LEVEL {
            let v = 1000f64.powf(i as f64 / RASTERIZATION_LEVEL as f64);
            let label = scheme.label(v);
            assert!(label == LABEL_DARK || label == LABEL_LIGHT, "entry {i}: {label:?}");
        }
        assert_eq!(scheme.label(0.0), LABEL_LIGHT);
        assert_eq!(scheme.label(1000.0), LABEL_DARK);
    }

    #[test]
    fn ramp_endpoints() {
        let scheme = build_color_scheme(1000.0, 1.0).unwrap();
        assert_eq!(scheme.background(0.0), Srgb::new(0, 0, 0));
        assert_eq!(scheme.background(1000.0), Srgb::new(255, 255, 255));
        // brightness pulls the ceiling down, saturating earlier
        let bright = build_color_scheme(1000.0, 4.0).unwrap();
        assert_eq!(bright.background(250.0), Srgb::new(255, 255, 255));
    }

    #[test]
    fn index_mapping_inverts_sampling() {
        let scheme = build_color_scheme(1000.0, 1.0).unwrap();
        for i in 0..=RASTERIZATION_LEVEL {
            let v = 1000f64.powf(i as f64 / RASTERIZATION_LEVEL as f64);
            assert_eq!(scheme.index_of(v) as usize, i);
        }
    }

    #[test]
    fn index_is_monotonic_on_fixture() {
        let scheme = build_color_scheme(1000.0, 1.0).unwrap();
        let idx: Vec<u8> = [0.0, 10.0, 100.0, 999.0]
            .iter()
            .map(|&v| scheme.index_of(v))
            .collect();
        assert!(idx.windows(2).all(|w| w[0] <= w[1]), "{idx:?}");
        assert_eq!(idx, vec![0, 33, 67, 100]);
    }

    #[test]
    fn sub_unit_max_stays_monotonic() {
        let scheme = build_color_scheme(0.5, 1.0).unwrap();
        assert_eq!(scheme.index_of(0.0), 0);
        assert_eq!(scheme.index_of(0.25), 50);
        assert_eq!(scheme.index_of(0.5), 100);
        assert_eq!(scheme.index_of(2.0), 100);
    }
}
