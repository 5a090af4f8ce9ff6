// ==========================================
// 测量数据管理系统 - 导入会话 ID 生成
// ==========================================
// 格式: "import_" + YYYYMMDDHHMMSS（14 位数字）
// 约束: 严格递增（同一秒内多次导入顺延 1 秒，且大于已落库的最大 ID）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::{Duration, NaiveDateTime, Timelike};
use std::sync::Mutex;

pub const SESSION_ID_PREFIX: &str = "import_";
const SESSION_TIMESTAMP_FMT: &str = "%Y%m%d%H%M%S";

/// 会话 ID 生成器（进程内记住上次发出的时间戳）
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    last_issued: Mutex<Option<NaiveDateTime>>,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成下一个会话 ID
    ///
    /// # 参数
    /// - now: 当前时间
    /// - latest_persisted: 记录表中已存在的最大会话 ID
    pub fn next_id(&self, now: NaiveDateTime, latest_persisted: Option<&str>) -> ImportResult<String> {
        let mut last_issued = self
            .last_issued
            .lock()
            .map_err(|e| ImportError::Other(anyhow::anyhow!("session id lock poisoned: {}", e)))?;

        let mut candidate = now.with_nanosecond(0).unwrap_or(now);
        let floors = [*last_issued, latest_persisted.and_then(parse_session_timestamp)];
        for floor in floors.into_iter().flatten() {
            if candidate <= floor {
                candidate = floor + Duration::seconds(1);
            }
        }

        *last_issued = Some(candidate);
        Ok(format_session_id(candidate))
    }
}

pub fn format_session_id(timestamp: NaiveDateTime) -> String {
    format!("{}{}", SESSION_ID_PREFIX, timestamp.format(SESSION_TIMESTAMP_FMT))
}

/// 从会话 ID 还原时间戳（格式不符返回 None）
pub fn parse_session_timestamp(session_id: &str) -> Option<NaiveDateTime> {
    let digits = session_id.strip_prefix(SESSION_ID_PREFIX)?;
    if digits.len() != 14 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(digits, SESSION_TIMESTAMP_FMT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_milli_opt(h, m, s, 250)
            .unwrap()
    }

    #[test]
    fn test_format_is_fourteen_digits() {
        let generator = SessionIdGenerator::new();
        let id = generator.next_id(at(9, 5, 7), None).unwrap();
        assert_eq!(id, "import_20240110090507");
        assert_eq!(parse_session_timestamp(&id), Some(at(9, 5, 7).with_nanosecond(0).unwrap()));
    }

    #[test]
    fn test_same_second_is_bumped() {
        let generator = SessionIdGenerator::new();
        let first = generator.next_id(at(9, 5, 7), None).unwrap();
        let second = generator.next_id(at(9, 5, 7), None).unwrap();
        assert_eq!(first, "import_20240110090507");
        assert_eq!(second, "import_20240110090508");
    }

    #[test]
    fn test_persisted_floor_respected() {
        let generator = SessionIdGenerator::new();
        let id = generator
            .next_id(at(9, 5, 7), Some("import_20240110100000"))
            .unwrap();
        assert_eq!(id, "import_20240110100001");

        // 非本格式的历史 ID 被忽略
        let id = generator.next_id(at(11, 0, 0), Some("import_2024_legacy")).unwrap();
        assert_eq!(id, "import_20240110110000");
    }
}
