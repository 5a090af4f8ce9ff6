// ==========================================
// 测量数据管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储共享同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ApiError, ApiResult, DeviceApi, ImportApi, MeasurementApi};
use crate::config::{ConfigManager, ImportSettings};
use crate::importer::{MeasurementImporterImpl, SqliteMeasurementStore};
use crate::repository::{DeviceRepository, MeasurementRecordRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 设备API
    pub device_api: Arc<DeviceApi>,

    /// 测量记录API
    pub measurement_api: Arc<MeasurementApi>,

    /// 导入向导API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 打开数据库（建表幂等）并初始化全部 API
    pub fn new(db_path: &str) -> ApiResult<Self> {
        tracing::info!(db_path = db_path, "初始化AppState");

        let conn = crate::db::open_and_migrate(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path.to_string();
        Ok(state)
    }

    /// 基于已建表的共享连接初始化（测试使用内存库 / 临时库）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        );
        let settings = ImportSettings::load(config_manager.as_ref())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let sequence = settings.record_sequence();

        // ==========================================
        // Repository层
        // ==========================================
        let device_repo = Arc::new(DeviceRepository::from_connection(conn.clone()));
        let record_repo = Arc::new(
            MeasurementRecordRepository::from_connection(conn.clone())
                .with_sequence(sequence.clone()),
        );

        // ==========================================
        // API层
        // ==========================================
        let device_api = Arc::new(DeviceApi::new(device_repo.clone(), record_repo.clone()));
        let measurement_api = Arc::new(MeasurementApi::new(device_repo, record_repo.clone()));

        let store = SqliteMeasurementStore::new(conn, sequence);
        let importer = MeasurementImporterImpl::new(store, settings);
        let import_api = Arc::new(ImportApi::new(importer, record_repo));

        Ok(Self {
            db_path: String::new(),
            device_api,
            measurement_api,
            import_api,
            config_manager,
        })
    }
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "MEASUREMENT_DATA_DB_PATH";

/// 获取默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./measurement_data.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("measurement-data");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("measurement_data.db");
        }
    }

    path.to_string_lossy().to_string()
}
