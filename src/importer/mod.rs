// ==========================================
// 测量数据管理系统 - 导入层
// ==========================================
// 职责: CSV 测量数据导入（预览 + 批量导入）
// 容错: 行级错误进入摘要，致命错误在处理任何行之前中止
// ==========================================

// 模块声明
pub mod date_normalizer;
pub mod device_resolver;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_options;
pub mod measurement_importer_impl;
pub mod measurement_importer_trait;
pub mod measurement_store;
pub mod report;
pub mod session_id;

// 重导出核心类型
pub use error::{ImportError, ImportResult, RowError};
pub use file_parser::{CsvParser, RawRow};
pub use import_options::ImportOptions;
pub use measurement_importer_impl::MeasurementImporterImpl;
pub use measurement_store::SqliteMeasurementStore;
pub use report::{render_preview, render_summary};
pub use session_id::SessionIdGenerator;

// 重导出 Trait 接口
pub use measurement_importer_trait::{MeasurementImporter, MeasurementStore};
