use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::{KIB, with_unit};

/// Which traffic metric a matrix carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTag {
    #[default]
    WrittenBytes,
    ReadBytes,
    WrittenKeys,
    ReadKeys,
    /// Written and read bytes combined.
    Integration,
}

impl MetricTag {
    pub const ALL: [MetricTag; 5] = [
        MetricTag::WrittenBytes,
        MetricTag::ReadBytes,
        MetricTag::WrittenKeys,
        MetricTag::ReadKeys,
        MetricTag::Integration,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricTag::WrittenBytes => "written_bytes",
            MetricTag::ReadBytes => "read_bytes",
            MetricTag::WrittenKeys => "written_keys",
            MetricTag::ReadKeys => "read_keys",
            MetricTag::Integration => "integration",
        }
    }

    pub fn is_bytes(self) -> bool {
        matches!(
            self,
            MetricTag::WrittenBytes | MetricTag::ReadBytes | MetricTag::Integration
        )
    }

    /// Hover label for a cell value of this metric.
    pub fn format_value(self, value: f64) -> String {
        if self.is_bytes() {
            let label = with_unit(value);
            if value >= KIB {
                format!("{label}B")
            } else {
                format!("{label} B")
            }
        } else {
            with_unit(value)
        }
    }
}

impl fmt::Display for MetricTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricTag::WrittenBytes => write!(f, "Write (bytes)"),
            MetricTag::ReadBytes => write!(f, "Read (bytes)"),
            MetricTag::WrittenKeys => write!(f, "Write (keys)"),
            MetricTag::ReadKeys => write!(f, "Read (keys)"),
            MetricTag::Integration => write!(f, "Read & Write (bytes)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_tags() {
        for tag in MetricTag::ALL {
            assert_eq!(MetricTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(MetricTag::parse("bogus"), None);
    }

    #[test]
    fn byte_metrics_get_suffix() {
        assert_eq!(MetricTag::ReadBytes.format_value(2048.0), "2.00 KB");
        assert_eq!(MetricTag::ReadBytes.format_value(12.0), "12.00 B");
        assert_eq!(MetricTag::Integration.format_value(1023.0), "1023.00 B");
        assert_eq!(MetricTag::ReadKeys.format_value(2048.0), "2.00 K");
        assert_eq!(MetricTag::WrittenKeys.format_value(12.0), "12.00");
    }

    #[test]
    fn serde_uses_wire_tags() {
        let json = serde_json::to_string(&MetricTag::WrittenKeys).unwrap();
        assert_eq!(json, "\"written_keys\"");
    }
}
