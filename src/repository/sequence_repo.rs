// ==========================================
// 测量数据管理系统 - 记录编号序列
// ==========================================
// 职责: 按 code 维护单调递增的编号（允许跳号）
// 约束: 在调用方的事务内推进，与记录插入同一原子单元
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::{params, Transaction};

/// 测量记录编号的序列 code
pub const MEASUREMENT_RECORD_SEQUENCE: &str = "measurement.record";

// ==========================================
// ReferenceSequence - 编号格式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub code: String,
    pub prefix: String,
    pub padding: usize,
}

impl ReferenceSequence {
    pub fn new(code: &str, prefix: &str, padding: usize) -> Self {
        Self {
            code: code.to_string(),
            prefix: prefix.to_string(),
            padding,
        }
    }

    /// 格式化编号: prefix + 左补零数字
    pub fn format(&self, number: i64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.padding)
    }

    /// 在事务中取下一个编号并推进序列
    pub fn next_in_tx(&self, tx: &Transaction) -> RepositoryResult<String> {
        tx.execute(
            "INSERT OR IGNORE INTO record_sequence (code, next_number) VALUES (?1, 1)",
            params![self.code],
        )?;
        let number: i64 = tx.query_row(
            "SELECT next_number FROM record_sequence WHERE code = ?1",
            params![self.code],
            |row| row.get(0),
        )?;
        tx.execute(
            "UPDATE record_sequence SET next_number = next_number + 1 WHERE code = ?1",
            params![self.code],
        )?;
        Ok(self.format(number))
    }
}

impl Default for ReferenceSequence {
    fn default() -> Self {
        Self::new(MEASUREMENT_RECORD_SEQUENCE, "MR", 5)
    }
}
