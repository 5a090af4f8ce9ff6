// ==========================================
// 测量数据管理系统 - 导入参数
// ==========================================
// 来源: 导入向导表单（分隔符 / 表头 / 默认设备 / 默认单位 / 默认操作员）
// ==========================================

use crate::domain::types::Delimiter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub delimiter: Delimiter,
    pub has_header: bool,
    pub default_device_id: Option<i64>,
    pub default_unit: Option<String>,
    pub default_operator: Option<String>,
}

impl ImportOptions {
    pub fn new(delimiter: Delimiter, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
            default_device_id: None,
            default_unit: None,
            default_operator: None,
        }
    }

    pub fn with_default_device(mut self, device_id: i64) -> Self {
        self.default_device_id = Some(device_id);
        self
    }

    pub fn with_default_unit(mut self, unit: &str) -> Self {
        self.default_unit = Some(unit.to_string());
        self
    }

    pub fn with_default_operator(mut self, operator: &str) -> Self {
        self.default_operator = Some(operator.to_string());
        self
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::new(Delimiter::Comma, true)
    }
}
