// ==========================================
// 测量数据管理系统 - 应用层
// ==========================================
// 职责: 组装仓储 / 导入器 / API，供命令行前端使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
