//! 时间解析
//!
//! 环境数据的时间列为 UTC，支持：
//! - `YYYY-MM-DDTHH:MM` / `YYYY-MM-DDTHH:MM:SS`
//! - `YYYY-MM-DD HH:MM` / `YYYY-MM-DD HH:MM:SS`

use chrono::{DateTime, NaiveDateTime};

/// 2000-01-01T00:00:00Z
pub const MIN_TIMESTAMP: i64 = 946_684_800;
/// 2100-01-01T00:00:00Z
pub const MAX_TIMESTAMP: i64 = 4_102_444_800;

const FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// 解析为 Unix 秒 (UTC)
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

/// 时间戳是否落在数据集的合理范围内
#[inline]
pub fn is_plausible(ts: i64) -> bool {
    (MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&ts)
}

/// 格式化为 `YYYY-MM-DDTHH:MM:SSZ`，超出 chrono 范围时原样输出数字
pub fn format_timestamp(ts: i64) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        // 2020-08-10T01:00:00Z
        let expected = 1_597_021_200;
        assert_eq!(parse_timestamp("2020-08-10T01:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-08-10T01:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-08-10 01:00:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2020-08-10 01:00 "), Some(expected));
        assert_eq!(parse_timestamp("10/08/2020"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_plausible_range() {
        assert!(is_plausible(MIN_TIMESTAMP));
        assert!(is_plausible(MAX_TIMESTAMP));
        assert!(!is_plausible(0));
    }

    #[test]
    fn test_format_roundtrip() {
        assert_eq!(format_timestamp(1_597_021_200), "2020-08-10T01:00:00Z");
    }
}
