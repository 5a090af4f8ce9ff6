// ==========================================
// 测量数据管理系统 - 报表数据聚合
// ==========================================
// 职责: 设备报表（近 30 天统计 / 质量分布 / 操作员分布 / 校准状态）
//       记录报表（按设备分组 + 样本标准差）
// 红线: 纯计算，不含数据访问与渲染
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::device::Device;
use crate::domain::measurement::MeasurementRecord;
use crate::domain::types::QualityStatus;

/// 设备报表统计窗口（天）
pub const REPORT_WINDOW_DAYS: i64 = 30;

/// 设备报表最多附带的近期记录数
pub const REPORT_RECENT_LIMIT: usize = 50;

/// 距下次校准不超过该天数视为即将到期
pub const CALIBRATION_DUE_SOON_DAYS: i64 = 30;

// ==========================================
// 校准状态 (Calibration Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Overdue,
    DueSoon,
    Current,
    Unknown, // 未设置下次校准日期
}

impl CalibrationStatus {
    pub fn evaluate(next_calibration_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        match next_calibration_date {
            None => CalibrationStatus::Unknown,
            Some(next) if next < today => CalibrationStatus::Overdue,
            Some(next) if next <= today + Duration::days(CALIBRATION_DUE_SOON_DAYS) => {
                CalibrationStatus::DueSoon
            }
            Some(_) => CalibrationStatus::Current,
        }
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationStatus::Overdue => write!(f, "overdue"),
            CalibrationStatus::DueSoon => write!(f, "due_soon"),
            CalibrationStatus::Current => write!(f, "current"),
            CalibrationStatus::Unknown => write!(f, "unknown"),
        }
    }
}

// ==========================================
// ValueStatistics - 测量值统计
// ==========================================
/// 无样本时各项为 0；std_dev 为样本标准差（n-1），样本数 < 2 时为 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueStatistics {
    pub count: usize,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub range: f64,
    pub std_dev: f64,
}

impl ValueStatistics {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let count = values.len();
        let average = values.iter().sum::<f64>() / count as f64;
        let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let std_dev = if count < 2 {
            0.0
        } else {
            let variance = values.iter().map(|v| (v - average).powi(2)).sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        };

        Self {
            count,
            average,
            minimum,
            maximum,
            range: maximum - minimum,
            std_dev,
        }
    }

    fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a MeasurementRecord>,
    {
        let values: Vec<f64> = records.into_iter().map(|r| r.value).collect();
        Self::from_values(&values)
    }
}

// ==========================================
// QualityCounts - 质量状态分布
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityCounts {
    pub good: usize,
    pub warning: usize,
    pub critical: usize,
    pub out_of_range: usize,
}

impl QualityCounts {
    fn add(&mut self, status: QualityStatus) {
        match status {
            QualityStatus::Good => self.good += 1,
            QualityStatus::Warning => self.warning += 1,
            QualityStatus::Critical => self.critical += 1,
            QualityStatus::OutOfRange => self.out_of_range += 1,
        }
    }
}

// ==========================================
// DeviceReport - 设备报表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: Device,
    pub report_date: NaiveDateTime,
    pub recent_records: Vec<MeasurementRecord>, // 窗口内最新的至多 50 条
    pub statistics: ValueStatistics,
    pub quality_counts: QualityCounts,
    pub operator_counts: BTreeMap<String, usize>, // 空操作员不计入
    pub calibration_status: CalibrationStatus,
}

impl DeviceReport {
    /// 以 now 为基准构建设备报表
    ///
    /// # 参数
    /// - records: 设备的测量记录（任意顺序）
    pub fn build(device: Device, records: Vec<MeasurementRecord>, now: NaiveDateTime) -> Self {
        let window_start = now - Duration::days(REPORT_WINDOW_DAYS);
        let mut recent: Vec<MeasurementRecord> = records
            .into_iter()
            .filter(|r| r.measurement_date >= window_start)
            .collect();
        recent.sort_by(|a, b| {
            b.measurement_date
                .cmp(&a.measurement_date)
                .then(b.id.cmp(&a.id))
        });

        let statistics = ValueStatistics::from_records(&recent);

        let mut quality_counts = QualityCounts::default();
        let mut operator_counts = BTreeMap::new();
        for record in &recent {
            quality_counts.add(record.quality_status);
            if let Some(operator) = record.operator.as_deref().filter(|o| !o.is_empty()) {
                *operator_counts.entry(operator.to_string()).or_insert(0) += 1;
            }
        }

        let calibration_status =
            CalibrationStatus::evaluate(device.next_calibration_date, now.date());
        recent.truncate(REPORT_RECENT_LIMIT);

        Self {
            device,
            report_date: now,
            recent_records: recent,
            statistics,
            quality_counts,
            operator_counts,
            calibration_status,
        }
    }
}

// ==========================================
// DeviceRecordGroup - 记录报表（按设备分组）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecordGroup {
    pub device_id: i64,
    pub records: Vec<MeasurementRecord>,
    pub statistics: ValueStatistics,
}

/// 按设备分组（组按设备 id 升序，组内保持输入顺序）
pub fn group_by_device(records: Vec<MeasurementRecord>) -> Vec<DeviceRecordGroup> {
    let mut grouped: BTreeMap<i64, Vec<MeasurementRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.device_id).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(device_id, records)| DeviceRecordGroup {
            device_id,
            statistics: ValueStatistics::from_records(&records),
            records,
        })
        .collect()
}
