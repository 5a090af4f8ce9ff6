// ==========================================
// 测量数据管理系统 - 日期规范化
// ==========================================
// 规则: 按固定优先级逐个尝试，首个完整匹配即返回
// 注意: DD/MM 先于 MM/DD（日、月均 ≤ 12 时按日在前解释）
// ==========================================

use crate::importer::error::RowError;
use chrono::{NaiveDate, NaiveDateTime};

/// 单个候选格式
#[derive(Debug, Clone, Copy)]
enum DatePattern {
    DateTime(&'static str),
    DateOnly(&'static str), // 解析为当日 00:00:00
}

const DATE_PATTERNS: [DatePattern; 9] = [
    DatePattern::DateTime("%Y-%m-%d %H:%M:%S"),
    DatePattern::DateTime("%Y-%m-%d %H:%M"),
    DatePattern::DateOnly("%Y-%m-%d"),
    DatePattern::DateTime("%d/%m/%Y %H:%M:%S"),
    DatePattern::DateTime("%d/%m/%Y %H:%M"),
    DatePattern::DateOnly("%d/%m/%Y"),
    DatePattern::DateTime("%m/%d/%Y %H:%M:%S"),
    DatePattern::DateTime("%m/%d/%Y %H:%M"),
    DatePattern::DateOnly("%m/%d/%Y"),
];

impl DatePattern {
    fn format(&self) -> &'static str {
        match self {
            DatePattern::DateTime(fmt) | DatePattern::DateOnly(fmt) => fmt,
        }
    }

    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        // chrono 的格式空格可匹配零个空白，需先核对日期 / 时间分段数
        if raw.split_whitespace().count() != self.format().split(' ').count() {
            return None;
        }
        match self {
            DatePattern::DateTime(fmt) => NaiveDateTime::parse_from_str(raw, fmt).ok(),
            DatePattern::DateOnly(fmt) => NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// 解析测量日期
///
/// # 参数
/// - raw: 非空白的日期文本（空白由调用方替换为当前时间）
///
/// # 返回
/// - Ok(NaiveDateTime)
/// - Err(RowError::DateFormat): 所有格式均不匹配
pub fn normalize_date(raw: &str) -> Result<NaiveDateTime, RowError> {
    let trimmed = raw.trim();
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.parse(trimmed))
        .ok_or_else(|| RowError::DateFormat {
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_iso_variants() {
        assert_eq!(normalize_date("2024-03-05 14:30:15").unwrap(), dt(2024, 3, 5, 14, 30, 15));
        assert_eq!(normalize_date("2024-03-05 14:30").unwrap(), dt(2024, 3, 5, 14, 30, 0));
        assert_eq!(normalize_date("2024-03-05").unwrap(), dt(2024, 3, 5, 0, 0, 0));
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        // 03/05 → 3 May，而不是 5 March
        assert_eq!(normalize_date("03/05/2024").unwrap(), dt(2024, 5, 3, 0, 0, 0));
        assert_eq!(normalize_date("03/05/2024 08:15").unwrap(), dt(2024, 5, 3, 8, 15, 0));
    }

    #[test]
    fn test_month_first_fallback() {
        // 日 > 12 时只能按 MM/DD 解释
        assert_eq!(normalize_date("12/31/2023").unwrap(), dt(2023, 12, 31, 0, 0, 0));
        assert_eq!(
            normalize_date("12/31/2023 23:59:59").unwrap(),
            dt(2023, 12, 31, 23, 59, 59)
        );
    }

    #[test]
    fn test_repeated_separator_whitespace_accepted() {
        assert_eq!(normalize_date("2024-03-05   14:30").unwrap(), dt(2024, 3, 5, 14, 30, 0));
    }

    #[test]
    fn test_partial_and_unknown_rejected() {
        for raw in [
            "2024-03-05T10:00:00",
            "2024/03/05",
            "yesterday",
            "2024-03-05 10:00 extra",
            "2024-03-0514:30:00",
            "05/03/202414:30",
        ] {
            let err = normalize_date(raw).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid date format: {}", raw));
        }
    }
}
