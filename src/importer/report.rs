// ==========================================
// 测量数据管理系统 - 预览 / 摘要文本渲染
// ==========================================
// 预览:
//   Header: a, b, c
//   --------------------------------------------------
//   Row 1: ...
//   ... and K more rows
// 摘要:
//   Import completed / File / Total rows processed / Records created / Errors
//   （有错误时）空行 + "Errors:" + 至多 N 条 + "... and K more errors"
// ==========================================

use crate::domain::measurement::ImportRunResult;
use crate::importer::file_parser::RawRow;

const PREVIEW_SEPARATOR_WIDTH: usize = 50;

/// 渲染预览文本
///
/// # 参数
/// - rows: 全部原始行（含表头行，若存在）
/// - has_header: 首行是否为表头
/// - max_rows: 最多展示的数据行数
pub fn render_preview(rows: &[RawRow], has_header: bool, max_rows: usize) -> String {
    let mut lines = Vec::new();

    let data_rows = if has_header && !rows.is_empty() {
        lines.push(format!("Header: {}", rows[0].join(", ")));
        lines.push("-".repeat(PREVIEW_SEPARATOR_WIDTH));
        &rows[1..]
    } else {
        rows
    };

    for (i, row) in data_rows.iter().take(max_rows).enumerate() {
        lines.push(format!("Row {}: {}", i + 1, row.join(", ")));
    }

    if data_rows.len() > max_rows {
        lines.push(format!("... and {} more rows", data_rows.len() - max_rows));
    }

    lines.join("\n")
}

/// 渲染导入摘要文本
pub fn render_summary(
    import_name: &str,
    filename: Option<&str>,
    result: &ImportRunResult,
    max_error_lines: usize,
) -> String {
    let errors = result.error_lines();
    let mut lines = vec![
        format!("Import completed: {}", import_name),
        format!("File: {}", filename.unwrap_or_default()),
        format!("Total rows processed: {}", result.total_rows),
        format!("Records created: {}", result.created_count()),
        format!("Errors: {}", errors.len()),
    ];

    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        lines.extend(errors.iter().take(max_error_lines).cloned());
        if errors.len() > max_error_lines {
            lines.push(format!("... and {} more errors", errors.len() - max_error_lines));
        }
    }

    lines.join("\n")
}
