// ==========================================
// 测量数据管理系统 - 测量记录领域模型
// ==========================================
// 职责: 测量记录实体 / 新建参数 / 导入会话结果
// 红线: 导入层只创建记录，不修改、不删除
// ==========================================

use crate::domain::types::{MeasurementType, QualityStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// MeasurementRecord - 测量记录
// ==========================================
// 对齐: measurement_record 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    // ===== 主键与编号 =====
    pub id: i64,
    pub name: String, // 记录编号（序列生成，如 MR00001）

    // ===== 测量内容 =====
    pub device_id: i64,
    pub measurement_date: NaiveDateTime,
    pub value: f64,
    pub unit: String,
    pub operator: Option<String>,
    pub measurement_type: MeasurementType,
    pub quality_status: QualityStatus, // 派生：按设备量程分级

    // ===== 环境条件 =====
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,

    pub notes: Option<String>,

    // ===== 批次追溯 =====
    pub batch_id: Option<String>,
    pub import_session_id: Option<String>,

    // ===== 质检确认 =====
    pub is_validated: bool,
    pub validated_by: Option<String>,
    pub validated_date: Option<NaiveDateTime>,
}

// ==========================================
// NewMeasurementRecord - 记录新建参数
// ==========================================
// 用途: 行解析器 / 人工录入 → 仓储 create
// 说明: name 与 quality_status 由仓储层在创建时生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurementRecord {
    pub device_id: i64,
    pub measurement_date: NaiveDateTime,
    pub value: f64,
    pub unit: String,
    pub operator: String,
    pub notes: String,
    pub measurement_type: MeasurementType,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub batch_id: Option<String>,
    pub import_session_id: Option<String>,
}

// ==========================================
// RowOutcome - 单行导入结果
// ==========================================
// 不变量: 每个数据行恰好对应一个结果
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Created(MeasurementRecord),
    Skipped { row_number: usize },
    Failed { row_number: usize, reason: String },
}

impl RowOutcome {
    /// 失败行的摘要文本 "Row {n}: {message}"
    pub fn error_line(&self) -> Option<String> {
        match self {
            RowOutcome::Failed { row_number, reason } => {
                Some(format!("Row {}: {}", row_number, reason))
            }
            _ => None,
        }
    }
}

// ==========================================
// ImportRunResult - 一次导入会话的结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRunResult {
    pub import_session_id: String,
    pub total_rows: usize, // 数据行数（不含表头）
    pub outcomes: Vec<RowOutcome>,
    pub elapsed_time: Duration,
}

impl ImportRunResult {
    pub fn created_records(&self) -> Vec<&MeasurementRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RowOutcome::Created(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Created(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Failed { .. }))
            .count()
    }

    /// 所有失败行的摘要文本（按行号顺序）
    pub fn error_lines(&self) -> Vec<String> {
        self.outcomes.iter().filter_map(RowOutcome::error_line).collect()
    }

    /// 汇总统计
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            import_session_id: self.import_session_id.clone(),
            total_rows: self.total_rows,
            created: self.created_count(),
            skipped: self.skipped_count(),
            failed: self.failed_count(),
            elapsed_ms: self.elapsed_time.as_millis() as u64,
        }
    }
}

// ==========================================
// ImportSummary - 导入汇总（可序列化）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub import_session_id: String,
    pub total_rows: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}
