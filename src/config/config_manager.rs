// ==========================================
// 测量数据管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 缺失键回退默认值；格式错误的值视为配置错误
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::Delimiter;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("Failed to acquire lock: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("Failed to acquire lock: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("Failed to acquire lock: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置值，缺失时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                format!("Invalid configuration value for {}: {:?} ({})", key, raw, e).into()
            }),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 返回
    /// - Ok(String): 配置快照的JSON字符串（键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("Failed to acquire lock: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_max_preview_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::IMPORT_MAX_PREVIEW_ROWS, 10)
    }

    fn get_max_error_lines(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::IMPORT_MAX_ERROR_LINES, 10)
    }

    fn get_default_delimiter(&self) -> Result<Delimiter, Box<dyn Error>> {
        match self.get_config_value(config_keys::IMPORT_DEFAULT_DELIMITER)? {
            None => Ok(Delimiter::Comma),
            Some(raw) => Delimiter::parse(&raw).ok_or_else(|| {
                format!(
                    "Invalid configuration value for {}: {:?}",
                    config_keys::IMPORT_DEFAULT_DELIMITER,
                    raw
                )
                .into()
            }),
        }
    }

    fn get_default_has_header(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::IMPORT_DEFAULT_HAS_HEADER, true)
    }

    fn get_sequence_prefix(&self) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(config_keys::RECORD_SEQUENCE_PREFIX)?
            .unwrap_or_else(|| "MR".to_string()))
    }

    fn get_sequence_padding(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::RECORD_SEQUENCE_PADDING, 5)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入向导
    pub const IMPORT_MAX_PREVIEW_ROWS: &str = "import_max_preview_rows";
    pub const IMPORT_MAX_ERROR_LINES: &str = "import_max_error_lines";
    pub const IMPORT_DEFAULT_DELIMITER: &str = "import_default_delimiter";
    pub const IMPORT_DEFAULT_HAS_HEADER: &str = "import_default_has_header";

    // 记录编号
    pub const RECORD_SEQUENCE_PREFIX: &str = "record_sequence_prefix";
    pub const RECORD_SEQUENCE_PADDING: &str = "record_sequence_padding";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::import_config_trait::ImportSettings;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_missing() {
        let manager = setup_manager();
        let settings = ImportSettings::load(&manager).unwrap();
        assert_eq!(settings, ImportSettings::default());
    }

    #[test]
    fn test_overrides_are_read() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::IMPORT_MAX_PREVIEW_ROWS, "3")
            .unwrap();
        manager
            .set_global_config_value(config_keys::IMPORT_DEFAULT_DELIMITER, ";")
            .unwrap();
        manager
            .set_global_config_value(config_keys::IMPORT_DEFAULT_HAS_HEADER, "false")
            .unwrap();

        assert_eq!(manager.get_max_preview_rows().unwrap(), 3);
        assert_eq!(manager.get_default_delimiter().unwrap(), Delimiter::Semicolon);
        assert!(!manager.get_default_has_header().unwrap());

        // 覆写同一键
        manager
            .set_global_config_value(config_keys::IMPORT_MAX_PREVIEW_ROWS, "7")
            .unwrap();
        assert_eq!(manager.get_max_preview_rows().unwrap(), 7);
    }

    #[test]
    fn test_malformed_value_is_error() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::IMPORT_MAX_ERROR_LINES, "many")
            .unwrap();
        let err = manager.get_max_error_lines().unwrap_err();
        assert!(err.to_string().contains(config_keys::IMPORT_MAX_ERROR_LINES));
    }

    #[test]
    fn test_config_snapshot() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::RECORD_SEQUENCE_PREFIX, "MD")
            .unwrap();
        let snapshot: serde_json::Value =
            serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot[config_keys::RECORD_SEQUENCE_PREFIX], "MD");
    }
}
