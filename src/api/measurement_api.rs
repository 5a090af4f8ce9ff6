// ==========================================
// 测量数据管理系统 - 测量记录 API
// ==========================================
// 职责: 人工录入、质检确认 / 撤销、记录查询、分析报表
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::measurement::{MeasurementRecord, NewMeasurementRecord};
use crate::domain::report::{group_by_device, DeviceRecordGroup};
use crate::domain::types::{MeasurementType, QualityStatus};
use crate::repository::{DeviceRepository, MeasurementRecordRepository};
use crate::utils::non_blank;

// ==========================================
// ManualEntry - 人工录入参数
// ==========================================
/// 未填写的日期取当前时间；未填写的单位取设备默认单位
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualEntry {
    pub device_id: i64,
    pub measurement_date: Option<NaiveDateTime>,
    pub value: f64,
    pub unit: Option<String>,
    pub operator: Option<String>,
    pub notes: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub batch_id: Option<String>,
}

// ==========================================
// MeasurementApi - 测量记录 API
// ==========================================
pub struct MeasurementApi {
    device_repo: Arc<DeviceRepository>,
    record_repo: Arc<MeasurementRecordRepository>,
}

impl MeasurementApi {
    pub fn new(
        device_repo: Arc<DeviceRepository>,
        record_repo: Arc<MeasurementRecordRepository>,
    ) -> Self {
        Self {
            device_repo,
            record_repo,
        }
    }

    /// 人工录入一条测量记录
    ///
    /// # 返回
    /// - Ok(MeasurementRecord): 新记录（measurement_type = manual）
    /// - Err(NotFound): 设备不存在
    /// - Err(InvalidInput): 测量值非有限数
    pub fn record_measurement(&self, entry: &ManualEntry) -> ApiResult<MeasurementRecord> {
        if !entry.value.is_finite() {
            return Err(ApiError::InvalidInput(format!(
                "Invalid measurement value: {}",
                entry.value
            )));
        }

        let device = self
            .device_repo
            .find_by_id(entry.device_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Device (id={})", entry.device_id)))?;

        let unit = non_blank(entry.unit.as_deref())
            .or_else(|| device.default_unit())
            .unwrap_or_default()
            .to_string();

        let new_record = NewMeasurementRecord {
            device_id: device.id,
            measurement_date: entry
                .measurement_date
                .unwrap_or_else(|| Utc::now().naive_utc()),
            value: entry.value,
            unit,
            operator: entry.operator.clone().unwrap_or_default(),
            notes: entry.notes.clone().unwrap_or_default(),
            measurement_type: MeasurementType::Manual,
            temperature: entry.temperature,
            humidity: entry.humidity,
            batch_id: entry.batch_id.clone(),
            import_session_id: None,
        };

        if let Some(message) = device.range_warning(entry.value) {
            tracing::warn!(device_id = device.id, value = entry.value, "{}", message);
        }
        let quality = QualityStatus::classify(entry.value, device.min_range, device.max_range);
        let record = self.record_repo.create(&new_record, quality)?;

        info!(
            record = %record.name,
            device_id = device.id,
            quality_status = %record.quality_status,
            "测量记录已录入"
        );
        Ok(record)
    }

    /// 质检确认
    pub fn validate_record(&self, id: i64, validated_by: &str) -> ApiResult<MeasurementRecord> {
        if validated_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("Validator name is required".to_string()));
        }
        let record = self
            .record_repo
            .set_validation(id, Some((validated_by.trim(), Utc::now().naive_utc())))?;
        info!(record = %record.name, validated_by = validated_by, "Measurement validated");
        Ok(record)
    }

    /// 撤销质检确认
    pub fn invalidate_record(&self, id: i64) -> ApiResult<MeasurementRecord> {
        let record = self.record_repo.set_validation(id, None)?;
        info!(record = %record.name, "Measurement validation removed");
        Ok(record)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_record(&self, id: i64) -> ApiResult<MeasurementRecord> {
        self.record_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("MeasurementRecord (id={})", id)))
    }

    /// 一次导入会话创建的记录
    pub fn session_records(&self, import_session_id: &str) -> ApiResult<Vec<MeasurementRecord>> {
        Ok(self.record_repo.list_by_session(import_session_id)?)
    }

    /// 最近的记录
    pub fn recent_records(&self, limit: i64) -> ApiResult<Vec<MeasurementRecord>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("limit must be positive, got {}", limit)));
        }
        Ok(self.record_repo.list_recent(limit)?)
    }

    /// 分析报表: 日期区间（含首尾两天）内的记录按设备分组统计
    ///
    /// # 参数
    /// - device_ids: 为空表示全部设备
    ///
    /// # 返回
    /// - Err(InvalidInput): date_from 晚于 date_to
    /// - Err(UserError): 区间内没有记录
    pub fn analysis_report(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        device_ids: &[i64],
    ) -> ApiResult<Vec<DeviceRecordGroup>> {
        if date_from > date_to {
            return Err(ApiError::InvalidInput(format!(
                "Start date {} is after end date {}",
                date_from, date_to
            )));
        }

        let (from, to) = match (date_from.and_hms_opt(0, 0, 0), date_to.and_hms_opt(23, 59, 59)) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(ApiError::InvalidInput(format!(
                    "Invalid date range {} .. {}",
                    date_from, date_to
                )))
            }
        };
        let records = self.record_repo.list_between(from, to, device_ids)?;
        if records.is_empty() {
            return Err(ApiError::UserError(
                "No measurement records found for the selected criteria.".to_string(),
            ));
        }

        let groups = group_by_device(records);
        info!(
            date_from = %date_from,
            date_to = %date_to,
            devices = groups.len(),
            "分析报表已生成"
        );
        Ok(groups)
    }
}
