// ==========================================
// 测量数据管理系统 - 设备 API
// ==========================================
// 职责: 设备登记 / 更新 / 归档、校准计划、设备统计与报表
// 约束: 量程变更后重新计算该设备全部记录的质量状态
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::device::{Device, DeviceStats, NewDevice};
use crate::domain::measurement::MeasurementRecord;
use crate::domain::report::DeviceReport;
use crate::domain::types::QualityStatus;
use crate::repository::{DeviceRepository, MeasurementRecordRepository};

// ==========================================
// DeviceApi - 设备 API
// ==========================================
pub struct DeviceApi {
    device_repo: Arc<DeviceRepository>,
    record_repo: Arc<MeasurementRecordRepository>,
}

impl DeviceApi {
    pub fn new(
        device_repo: Arc<DeviceRepository>,
        record_repo: Arc<MeasurementRecordRepository>,
    ) -> Self {
        Self {
            device_repo,
            record_repo,
        }
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 登记设备
    ///
    /// # 返回
    /// - Ok(Device): 新设备
    /// - Err(InvalidInput): 名称 / 序列号为空、校准周期非正数
    /// - Err(BusinessRuleViolation): 序列号已被占用
    pub fn register_device(&self, device: &NewDevice) -> ApiResult<Device> {
        validate_identity(&device.name, &device.serial_number)?;
        validate_interval(device.calibration_interval)?;

        let created = self.device_repo.insert(device)?;
        info!(
            device_id = created.id,
            name = %created.name,
            serial_number = %created.serial_number,
            "设备已登记"
        );
        Ok(created)
    }

    /// 更新设备
    ///
    /// 量程（min_range / max_range）变化时重新分级该设备的全部记录
    pub fn update_device(&self, device: &Device) -> ApiResult<Device> {
        validate_identity(&device.name, &device.serial_number)?;
        validate_interval(device.calibration_interval)?;

        let before = self.get_device(device.id)?;
        let updated = self.device_repo.update(device)?;

        if before.min_range != updated.min_range || before.max_range != updated.max_range {
            let regraded = self.regrade_records(&updated)?;
            info!(device_id = updated.id, regraded = regraded, "设备量程变更，记录已重新分级");
        }

        Ok(updated)
    }

    /// 归档设备（不再参与导入解析）
    pub fn archive_device(&self, id: i64) -> ApiResult<()> {
        self.device_repo.set_active(id, false)?;
        info!(device_id = id, "设备已归档");
        Ok(())
    }

    /// 恢复已归档设备
    pub fn restore_device(&self, id: i64) -> ApiResult<()> {
        self.device_repo.set_active(id, true)?;
        info!(device_id = id, "设备已恢复");
        Ok(())
    }

    /// 登记一次校准（下次校准日期按周期重新派生）
    pub fn record_calibration(&self, id: i64, calibration_date: NaiveDate) -> ApiResult<Device> {
        let mut device = self.get_device(id)?;
        device.calibration_date = Some(calibration_date);
        let updated = self.device_repo.update(&device)?;
        info!(
            device_id = id,
            calibration_date = %calibration_date,
            next_calibration_date = ?updated.next_calibration_date,
            "设备校准已登记"
        );
        Ok(updated)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_device(&self, id: i64) -> ApiResult<Device> {
        self.device_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Device (id={})", id)))
    }

    /// 设备列表（按名称排序）
    pub fn list_devices(&self, include_archived: bool) -> ApiResult<Vec<Device>> {
        Ok(self.device_repo.list(include_archived)?)
    }

    /// 设备统计（记录数 + 最近测量时间）
    pub fn device_stats(&self, id: i64) -> ApiResult<DeviceStats> {
        self.get_device(id)?;
        Ok(self.device_repo.stats(id)?)
    }

    /// 设备的测量记录（按测量时间倒序）
    pub fn device_records(&self, id: i64) -> ApiResult<Vec<MeasurementRecord>> {
        self.get_device(id)?;
        Ok(self.record_repo.list_by_device(id)?)
    }

    /// 设备报表（以 now 为基准的近 30 天统计）
    pub fn device_report(&self, id: i64, now: NaiveDateTime) -> ApiResult<DeviceReport> {
        let device = self.get_device(id)?;
        let records = self.record_repo.list_by_device(id)?;
        let report = DeviceReport::build(device, records, now);
        debug!(
            device_id = id,
            recent = report.statistics.count,
            calibration_status = %report.calibration_status,
            "设备报表已生成"
        );
        Ok(report)
    }

    /// 截至 today 已到期（或已过期）需要校准的在用设备
    pub fn calibration_due(&self, today: NaiveDate) -> ApiResult<Vec<Device>> {
        let due: Vec<Device> = self
            .device_repo
            .list(false)?
            .into_iter()
            .filter(|d| d.next_calibration_date.map_or(false, |next| next <= today))
            .collect();
        debug!(today = %today, due = due.len(), "校准到期查询");
        Ok(due)
    }

    fn regrade_records(&self, device: &Device) -> ApiResult<usize> {
        let updates: Vec<(i64, QualityStatus)> = self
            .record_repo
            .list_by_device(device.id)?
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    QualityStatus::classify(r.value, device.min_range, device.max_range),
                )
            })
            .collect();
        Ok(self.record_repo.update_quality_status(&updates)?)
    }
}

fn validate_identity(name: &str, serial_number: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("Device name is required".to_string()));
    }
    if serial_number.trim().is_empty() {
        return Err(ApiError::InvalidInput("Serial number is required".to_string()));
    }
    Ok(())
}

fn validate_interval(days: i32) -> ApiResult<()> {
    if days <= 0 {
        return Err(ApiError::InvalidInput(format!(
            "Calibration interval must be positive, got {}",
            days
        )));
    }
    Ok(())
}
