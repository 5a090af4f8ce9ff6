// ==========================================
// 测量数据管理系统 - 通用文本工具
// ==========================================

/// trim 后非空才返回（空白单元格 / 表单字段视为未填写）
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  bar ")), Some("bar"));
        assert_eq!(non_blank(Some(" \t ")), None);
        assert_eq!(non_blank(None), None);
    }
}
