// ==========================================
// 测量数据管理系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::Delimiter;
use crate::repository::sequence_repo::{ReferenceSequence, MEASUREMENT_RECORD_SEQUENCE};
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）；测试中使用 Mock
pub trait ImportConfigReader: Send + Sync {
    /// 预览最多展示的数据行数
    ///
    /// # 默认值
    /// - 10
    fn get_max_preview_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 导入摘要中最多展示的错误行数
    ///
    /// # 默认值
    /// - 10
    fn get_max_error_lines(&self) -> Result<usize, Box<dyn Error>>;

    /// 向导默认分隔符
    ///
    /// # 默认值
    /// - Delimiter::Comma
    fn get_default_delimiter(&self) -> Result<Delimiter, Box<dyn Error>>;

    /// 向导默认是否含表头
    ///
    /// # 默认值
    /// - true
    fn get_default_has_header(&self) -> Result<bool, Box<dyn Error>>;

    /// 记录编号前缀
    ///
    /// # 默认值
    /// - "MR"
    fn get_sequence_prefix(&self) -> Result<String, Box<dyn Error>>;

    /// 记录编号数字位数（左补零）
    ///
    /// # 默认值
    /// - 5
    fn get_sequence_padding(&self) -> Result<usize, Box<dyn Error>>;
}

// ==========================================
// ImportSettings - 导入配置快照
// ==========================================
// 一次导入 / 预览开始前读取，运行中不再访问配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub max_preview_rows: usize,
    pub max_error_lines: usize,
    pub default_delimiter: Delimiter,
    pub default_has_header: bool,
    pub sequence_prefix: String,
    pub sequence_padding: usize,
}

impl ImportSettings {
    /// 从配置读取器加载
    pub fn load(reader: &dyn ImportConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            max_preview_rows: reader.get_max_preview_rows()?,
            max_error_lines: reader.get_max_error_lines()?,
            default_delimiter: reader.get_default_delimiter()?,
            default_has_header: reader.get_default_has_header()?,
            sequence_prefix: reader.get_sequence_prefix()?,
            sequence_padding: reader.get_sequence_padding()?,
        })
    }

    /// 按配置的前缀 / 位数构造记录编号序列
    pub fn record_sequence(&self) -> ReferenceSequence {
        ReferenceSequence::new(
            MEASUREMENT_RECORD_SEQUENCE,
            &self.sequence_prefix,
            self.sequence_padding,
        )
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_preview_rows: 10,
            max_error_lines: 10,
            default_delimiter: Delimiter::Comma,
            default_has_header: true,
            sequence_prefix: "MR".to_string(),
            sequence_padding: 5,
        }
    }
}
