//! Synthetic key visualizer traffic, used when no cluster is attached.

use std::time::Duration;

use data::{MatrixError, MetricMatrix, MetricTag};

const REGIONS: usize = 64;
const BUCKETS: usize = 120;
const BUCKET_SECS: i64 = 60;
const LATENCY: Duration = Duration::from_millis(150);

/// Xorshift, so every refresh of the same seed looks alike.
struct Noise(u64);

impl Noise {
    fn next(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn scale(metric: MetricTag) -> f64 {
    match metric {
        MetricTag::WrittenBytes => 4.0 * 1024.0 * 1024.0,
        MetricTag::ReadBytes => 64.0 * 1024.0 * 1024.0,
        MetricTag::WrittenKeys => 20_000.0,
        MetricTag::ReadKeys => 250_000.0,
        MetricTag::Integration => 1.0e9,
    }
}

/// Builds a `REGIONS x BUCKETS` matrix ending at the current minute.
pub fn generate(metric: MetricTag, seed: u64, end: i64) -> Result<MetricMatrix, MatrixError> {
    let mut noise = Noise(seed.max(1));
    let peak = scale(metric);

    let hotspots: Vec<(f64, f64, f64)> = (0..4)
        .map(|_| {
            (
                noise.next() * REGIONS as f64,
                noise.next() * BUCKETS as f64,
                noise.next() * 0.8 + 0.2,
            )
        })
        .collect();

    let mut values = Vec::with_capacity(REGIONS * BUCKETS);
    for row in 0..REGIONS {
        for col in 0..BUCKETS {
            let heat: f64 = hotspots
                .iter()
                .map(|&(r, c, w)| {
                    let dr = (row as f64 - r) / 6.0;
                    let dc = (col as f64 - c) / 20.0;
                    w * (-(dr * dr + dc * dc)).exp()
                })
                .sum();
            let background = noise.next() * 0.02;
            values.push((heat + background) * peak);
        }
    }

    let start = end - BUCKETS as i64 * BUCKET_SECS;
    MetricMatrix::from_flat(REGIONS, BUCKETS, values)?
        .with_key_axis(
            (0..=REGIONS)
                .map(|i| format!("t_{:04}_r_{:08x}", i / 8, i * 0x0100_0000 / 8))
                .collect(),
        )?
        .with_time_axis((0..=BUCKETS as i64).map(|i| start + i * BUCKET_SECS).collect())
}

pub async fn load(metric: MetricTag, seed: u64) -> Result<Option<MetricMatrix>, MatrixError> {
    tokio::time::sleep(LATENCY).await;
    let end = chrono::Utc::now().timestamp() / BUCKET_SECS * BUCKET_SECS;
    generate(metric, seed, end).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_and_axes() {
        let m = generate(MetricTag::ReadKeys, 7, 1_700_000_000).unwrap();
        assert_eq!((m.rows(), m.cols()), (REGIONS, BUCKETS));
        assert_eq!(m.time_span(0, BUCKETS), Some((1_700_000_000 - 7200, 1_700_000_000)));
        assert!(m.key_span(0, 1).is_some());
        assert!(m.max_value() > 0.0);
    }

    #[test]
    fn same_seed_same_traffic() {
        let a = generate(MetricTag::WrittenBytes, 3, 0).unwrap();
        let b = generate(MetricTag::WrittenBytes, 3, 0).unwrap();
        assert_eq!(a, b);
    }
}
