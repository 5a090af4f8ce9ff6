// ==========================================
// 测量数据管理系统 - 设备领域模型
// ==========================================
// 职责: 设备主数据 / 校准计划 / 设备统计
// 红线: 序列号全局唯一（由仓储层保证）
// ==========================================

use crate::domain::types::DeviceType;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 默认校准周期（天）
pub const DEFAULT_CALIBRATION_INTERVAL_DAYS: i32 = 365;

// ==========================================
// Device - 测量设备
// ==========================================
// 用途: 设备管理写入，导入层只读（按名称/序列号解析）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    // ===== 主键与标识 =====
    pub id: i64,
    pub name: String,          // 设备名称
    pub serial_number: String, // 序列号（唯一）
    pub device_type: DeviceType,

    // ===== 基础信息 =====
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub active: bool, // false = 已归档

    // ===== 校准 =====
    pub calibration_date: Option<NaiveDate>,
    pub next_calibration_date: Option<NaiveDate>,
    pub calibration_interval: i32, // 校准周期（天）

    // ===== 量程与精度 =====
    pub measurement_unit: Option<String>, // 默认测量单位
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub accuracy: Option<f64>,
    pub accuracy_unit: Option<String>,

    pub notes: Option<String>,
}

impl Device {
    /// 设备默认单位（空白视为未配置）
    pub fn default_unit(&self) -> Option<&str> {
        self.measurement_unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// 检查测量值是否超出设备量程，返回告警描述
    pub fn range_warning(&self, value: f64) -> Option<String> {
        if let Some(min) = self.min_range.filter(|m| *m != 0.0) {
            if value < min {
                return Some(format!(
                    "Measurement value {} is below device minimum range {}",
                    value, min
                ));
            }
        }
        if let Some(max) = self.max_range.filter(|m| *m != 0.0) {
            if value > max {
                return Some(format!(
                    "Measurement value {} is above device maximum range {}",
                    value, max
                ));
            }
        }
        None
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.serial_number)
    }
}

/// 根据上次校准日期与校准周期计算下次校准日期
pub fn next_calibration_date(
    calibration_date: Option<NaiveDate>,
    calibration_interval: i32,
) -> Option<NaiveDate> {
    match calibration_date {
        Some(date) if calibration_interval > 0 => {
            date.checked_add_signed(Duration::days(calibration_interval as i64))
        }
        _ => None,
    }
}

// ==========================================
// NewDevice - 设备登记参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub serial_number: String,
    pub device_type: DeviceType,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub calibration_date: Option<NaiveDate>,
    pub calibration_interval: i32,
    pub measurement_unit: Option<String>,
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub accuracy: Option<f64>,
    pub accuracy_unit: Option<String>,
    pub notes: Option<String>,
}

impl NewDevice {
    /// 仅含必填字段的登记参数，其余取默认值
    pub fn new(name: &str, serial_number: &str, device_type: DeviceType) -> Self {
        Self {
            name: name.to_string(),
            serial_number: serial_number.to_string(),
            device_type,
            manufacturer: None,
            model: None,
            location: None,
            calibration_date: None,
            calibration_interval: DEFAULT_CALIBRATION_INTERVAL_DAYS,
            measurement_unit: None,
            min_range: None,
            max_range: None,
            accuracy: None,
            accuracy_unit: None,
            notes: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.measurement_unit = Some(unit.to_string());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_range = Some(min);
        self.max_range = Some(max);
        self
    }

    pub fn with_calibration(mut self, date: NaiveDate, interval_days: i32) -> Self {
        self.calibration_date = Some(date);
        self.calibration_interval = interval_days;
        self
    }
}

// ==========================================
// DeviceStats - 设备统计（派生）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub device_id: i64,
    pub record_count: i64,
    pub last_measurement_date: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            id: 1,
            name: "SensorA".to_string(),
            serial_number: "SN-001".to_string(),
            device_type: DeviceType::Pressure,
            manufacturer: None,
            model: None,
            location: None,
            active: true,
            calibration_date: None,
            next_calibration_date: None,
            calibration_interval: DEFAULT_CALIBRATION_INTERVAL_DAYS,
            measurement_unit: Some("  ".to_string()),
            min_range: Some(1.0),
            max_range: Some(10.0),
            accuracy: None,
            accuracy_unit: None,
            notes: None,
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(sample_device().to_string(), "SensorA (SN-001)");
    }

    #[test]
    fn test_blank_unit_is_none() {
        assert_eq!(sample_device().default_unit(), None);
    }

    #[test]
    fn test_next_calibration_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            next_calibration_date(Some(date), 30),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(next_calibration_date(Some(date), 0), None);
        assert_eq!(next_calibration_date(None, 365), None);
    }

    #[test]
    fn test_range_warning() {
        let device = sample_device();
        assert!(device.range_warning(0.5).unwrap().contains("below"));
        assert!(device.range_warning(11.0).unwrap().contains("above"));
        assert_eq!(device.range_warning(5.0), None);
    }
}
