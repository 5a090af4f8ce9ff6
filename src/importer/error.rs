// ==========================================
// 测量数据管理系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层:
// - ImportError: 致命错误，整批中止（未写入任何记录）
// - RowError: 行级错误，记入摘要后继续下一行
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块致命错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("Please select a CSV file to import.")]
    NoFile,

    #[error("The CSV file is empty.")]
    EmptyFile,

    #[error("Unable to decode the file as UTF-8: {0}")]
    DecodeError(String),

    #[error("CSV parsing failed: {0}")]
    CsvParseError(String),

    // ===== 配置错误 =====
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<std::str::Utf8Error>
impl From<std::str::Utf8Error> for ImportError {
    fn from(err: std::str::Utf8Error) -> Self {
        ImportError::DecodeError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

/// 行级错误类型（Display 即摘要中 "Row {n}: " 之后的文本）
#[derive(Error, Debug)]
pub enum RowError {
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    #[error("Invalid date format: {value}")]
    DateFormat { value: String },

    #[error("Measurement value is required")]
    MissingValue,

    #[error("Invalid measurement value: {value}")]
    InvalidValue { value: String },

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_messages() {
        let err = RowError::DeviceNotFound {
            name: "Unknown".to_string(),
        };
        assert_eq!(err.to_string(), "Device not found: Unknown");
        assert_eq!(
            RowError::DateFormat { value: "2024.01.01".to_string() }.to_string(),
            "Invalid date format: 2024.01.01"
        );
        assert_eq!(RowError::MissingValue.to_string(), "Measurement value is required");
        assert_eq!(
            RowError::InvalidValue { value: "abc".to_string() }.to_string(),
            "Invalid measurement value: abc"
        );
    }

    #[test]
    fn test_fatal_messages() {
        assert_eq!(ImportError::EmptyFile.to_string(), "The CSV file is empty.");
        assert_eq!(ImportError::NoFile.to_string(), "Please select a CSV file to import.");
    }
}
