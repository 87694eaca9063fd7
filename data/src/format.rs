use chrono::DateTime;

pub(crate) const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Binary-magnitude label with two decimals, e.g. `"1.50 M"`.
pub fn with_unit(value: f64) -> String {
    if value >= GIB {
        format!("{:.2} G", value / GIB)
    } else if value >= MIB {
        format!("{:.2} M", value / MIB)
    } else if value >= KIB {
        format!("{:.2} K", value / KIB)
    } else {
        format!("{value:.2}")
    }
}

/// UTC `%Y-%m-%d %H:%M:%S` for a unix-seconds timestamp.
pub fn format_time(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_boundaries() {
        assert_eq!(with_unit(500.0), "500.00");
        assert_eq!(with_unit(1023.0), "1023.00");
        assert_eq!(with_unit(1024.0), "1.00 K");
        assert_eq!(with_unit(1024.0 * 1024.0), "1.00 M");
        assert_eq!(with_unit(1024.0 * 1024.0 * 1024.0), "1.00 G");
        assert_eq!(with_unit(1536.0 * 1024.0), "1.50 M");
        assert_eq!(with_unit(0.0), "0.00");
    }

    #[test]
    fn time_labels() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00");
        assert_eq!(format_time(1_700_000_000), "2023-11-14 22:13:20");
    }
}
