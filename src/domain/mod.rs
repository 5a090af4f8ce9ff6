// ==========================================
// 测量数据管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、纯业务规则（质量分级）
// 红线: 不含数据访问逻辑
// ==========================================

pub mod device;
pub mod measurement;
pub mod report;
pub mod types;

// 重导出核心类型
pub use device::{Device, DeviceStats, NewDevice};
pub use measurement::{
    ImportRunResult, ImportSummary, MeasurementRecord, NewMeasurementRecord, RowOutcome,
};
pub use report::{CalibrationStatus, DeviceRecordGroup, DeviceReport, QualityCounts, ValueStatistics};
pub use types::{DeviceType, Delimiter, MeasurementType, QualityStatus, WizardState};
