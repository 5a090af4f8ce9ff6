// ==========================================
// 测量数据管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 设备登记 / 测量记录 / CSV 批量导入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - CSV 测量数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 通用工具
mod utils;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Delimiter, DeviceType, MeasurementType, QualityStatus, WizardState};

// 领域实体
pub use domain::{
    Device, DeviceStats, ImportRunResult, ImportSummary, MeasurementRecord, NewDevice,
    NewMeasurementRecord, RowOutcome,
};

// 导入器
pub use importer::{ImportOptions, MeasurementImporter, MeasurementImporterImpl};

// API
pub use api::{DeviceApi, ImportApi, ImportWizard, MeasurementApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "测量数据管理系统";
