// ==========================================
// 测量数据管理系统 - 领域类型定义
// ==========================================
// 职责: 设备类型 / 测量类型 / 质量状态 / 分隔符 / 向导状态
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 设备类型 (Device Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Temperature,  // 温度传感器
    Pressure,     // 压力传感器
    Distance,     // 距离传感器
    Displacement, // 位移传感器
    Thickness,    // 测厚仪
    Vibration,    // 振动传感器
    Flow,         // 流量计
    Level,        // 液位传感器
    Force,        // 力传感器
    Other,        // 其他
}

impl DeviceType {
    pub const ALL: [DeviceType; 10] = [
        DeviceType::Temperature,
        DeviceType::Pressure,
        DeviceType::Distance,
        DeviceType::Displacement,
        DeviceType::Thickness,
        DeviceType::Vibration,
        DeviceType::Flow,
        DeviceType::Level,
        DeviceType::Force,
        DeviceType::Other,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeviceType::Temperature => "temperature",
            DeviceType::Pressure => "pressure",
            DeviceType::Distance => "distance",
            DeviceType::Displacement => "displacement",
            DeviceType::Thickness => "thickness",
            DeviceType::Vibration => "vibration",
            DeviceType::Flow => "flow",
            DeviceType::Level => "level",
            DeviceType::Force => "force",
            DeviceType::Other => "other",
        }
    }

    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.to_db_str() == normalized)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 测量类型 (Measurement Type)
// ==========================================
// manual: 人工录入 / imported: CSV 导入 / automatic: 自动采集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    #[default]
    Manual,
    Imported,
    Automatic,
}

impl MeasurementType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MeasurementType::Manual => "manual",
            MeasurementType::Imported => "imported",
            MeasurementType::Automatic => "automatic",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Some(MeasurementType::Manual),
            "imported" => Some(MeasurementType::Imported),
            "automatic" => Some(MeasurementType::Automatic),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 质量状态 (Quality Status)
// ==========================================
// 由测量值与设备量程计算，导入层只读
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    Good,       // 正常
    Warning,    // 接近量程边界
    Critical,   // 严重（保留，当前规则不产出）
    OutOfRange, // 超出量程
}

impl QualityStatus {
    /// 按设备量程分级
    ///
    /// 规则:
    /// - 量程上下限任一未配置（None 或 0）→ Good
    /// - value < min 或 value > max → OutOfRange
    /// - value < min * 1.1 或 value > max * 0.9 → Warning
    /// - 其余 → Good
    pub fn classify(value: f64, min_range: Option<f64>, max_range: Option<f64>) -> Self {
        let (min, max) = match (min_range, max_range) {
            (Some(min), Some(max)) if min != 0.0 && max != 0.0 => (min, max),
            _ => return QualityStatus::Good,
        };

        if value < min || value > max {
            QualityStatus::OutOfRange
        } else if value < min * 1.1 || value > max * 0.9 {
            QualityStatus::Warning
        } else {
            QualityStatus::Good
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            QualityStatus::Good => "good",
            QualityStatus::Warning => "warning",
            QualityStatus::Critical => "critical",
            QualityStatus::OutOfRange => "out_of_range",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "good" => Some(QualityStatus::Good),
            "warning" => Some(QualityStatus::Warning),
            "critical" => Some(QualityStatus::Critical),
            "out_of_range" => Some(QualityStatus::OutOfRange),
            _ => None,
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// CSV 分隔符 (Delimiter)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    #[default]
    Comma,     // ,
    Semicolon, // ;
    Tab,       // \t
    Pipe,      // |
}

impl Delimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    pub fn as_char(&self) -> char {
        self.as_byte() as char
    }

    /// 从单字符或名称解析（",", "comma", "\t", "tab" ...）
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "," => return Some(Delimiter::Comma),
            ";" => return Some(Delimiter::Semicolon),
            "\t" => return Some(Delimiter::Tab),
            "|" => return Some(Delimiter::Pipe),
            _ => {}
        }
        match s.trim().to_lowercase().as_str() {
            "comma" => Some(Delimiter::Comma),
            "semicolon" => Some(Delimiter::Semicolon),
            "tab" | "\\t" => Some(Delimiter::Tab),
            "pipe" => Some(Delimiter::Pipe),
            _ => None,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Comma => write!(f, "Comma (,)"),
            Delimiter::Semicolon => write!(f, "Semicolon (;)"),
            Delimiter::Tab => write!(f, "Tab"),
            Delimiter::Pipe => write!(f, "Pipe (|)"),
        }
    }
}

// ==========================================
// 导入向导状态 (Wizard State)
// ==========================================
// 流转: Draft → Preview（可选）→ Done
// Done 状态下允许再次导入（生成新的会话 ID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    #[default]
    Draft,
    Preview,
    Done,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardState::Draft => write!(f, "draft"),
            WizardState::Preview => write!(f, "preview"),
            WizardState::Done => write!(f, "done"),
        }
    }
}
