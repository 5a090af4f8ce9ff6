// ==========================================
// 测量数据管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行前端调用
// ==========================================

pub mod device_api;
pub mod error;
pub mod import_api;
pub mod measurement_api;

// 重导出核心类型
pub use device_api::DeviceApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportWizard, DEFAULT_IMPORT_NAME};
pub use measurement_api::{ManualEntry, MeasurementApi};
