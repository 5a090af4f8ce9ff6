// ==========================================
// 测量数据管理系统 - CSV 文件解析器
// ==========================================
// 职责: 字节 → UTF-8 文本 → 按分隔符切分的原始行
// 说明: 预览与导入共用同一解析步骤；不隐式消费表头
// 约束: 空行保留为零单元格行，行号与文件物理行一一对应
// ==========================================

use crate::domain::types::Delimiter;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;

const UTF8_BOM: &str = "\u{feff}";

/// 原始行（单元格保持原样，不做 trim）
pub type RawRow = Vec<String>;

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser {
    delimiter: Delimiter,
}

impl CsvParser {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    /// 解析 CSV 字节为原始行列表
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 全部行（含表头行，若存在）
    /// - Err(DecodeError): 非 UTF-8 内容
    /// - Err(EmptyFile): 没有任何行
    /// - Err(CsvParseError): CSV 语法错误
    pub fn parse_rows(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let text = decode_utf8(bytes)?;

        let mut rows = Vec::new();
        for line in split_logical_lines(text) {
            // csv 读取器会跳过空行，这里显式保留
            if line.is_empty() {
                rows.push(RawRow::new());
                continue;
            }
            self.parse_line(line, &mut rows)?;
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        Ok(rows)
    }

    fn parse_line(&self, line: &str, rows: &mut Vec<RawRow>) -> ImportResult<()> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter.as_byte())
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(line.as_bytes());

        let mut parsed_any = false;
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
            parsed_any = true;
        }
        if !parsed_any {
            rows.push(RawRow::new());
        }
        Ok(())
    }
}

/// 按换行切分逻辑行（引号内的换行属于字段内容）
///
/// 行尾 `\r` 被去除；末尾换行之后的空串不算作一行
fn split_logical_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' if !in_quotes => {
                lines.push(strip_cr(&text[start..idx]));
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        lines.push(strip_cr(&text[start..]));
    }
    lines
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// UTF-8 解码（去除 BOM）
fn decode_utf8(bytes: &[u8]) -> ImportResult<&str> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text))
}
