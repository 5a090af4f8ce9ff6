// ==========================================
// 测量数据管理系统 - 行解析 / 字段映射
// ==========================================
// 职责: 原始行（按表头名或列位置）→ 候选测量记录
// 校验顺序: 设备 → 日期 → 测量值
// 空白行（无单元格或全部为空白）返回 None，由调用方计为跳过
// ==========================================

use crate::domain::device::Device;
use crate::domain::measurement::NewMeasurementRecord;
use crate::domain::types::MeasurementType;
use crate::importer::date_normalizer::normalize_date;
use crate::importer::device_resolver::resolve_device;
use crate::importer::error::RowError;
use crate::importer::measurement_importer_trait::MeasurementStore;
use crate::utils::non_blank;
use chrono::NaiveDateTime;
use std::collections::HashMap;

// ===== 字段别名表 =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Device,
    Serial,
    Date,
    Value,
    Unit,
    Operator,
    Notes,
}

/// 表头模式: 每个字段按顺序尝试的列名（首个非空白值生效）
const FIELD_ALIASES: [(Field, &[&str]); 7] = [
    (Field::Device, &["device", "device_name"]),
    (Field::Serial, &["serial_number", "serial"]),
    (Field::Date, &["date", "measurement_date", "timestamp"]),
    (Field::Value, &["value", "measurement_value"]),
    (Field::Unit, &["unit", "measurement_unit"]),
    (Field::Operator, &["operator", "user"]),
    (Field::Notes, &["notes", "comment"]),
];

/// 无表头模式: 固定列位置（无序列号列）
const POSITIONAL_FIELDS: [Field; 6] = [
    Field::Device,
    Field::Date,
    Field::Value,
    Field::Unit,
    Field::Operator,
    Field::Notes,
];

// ===== 解析上下文 =====

/// 一次导入中所有行共享的解析参数
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub header: Option<&'a [String]>,
    pub import_session_id: &'a str,
    pub default_device: Option<&'a Device>,
    pub default_unit: Option<&'a str>,
    pub default_operator: Option<&'a str>,
    pub now: NaiveDateTime, // 日期单元格为空白时使用
}

/// 解析成功的行: 候选记录 + 已解析设备
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub record: NewMeasurementRecord,
    pub device: Device,
}

/// 表头规范化（trim + 小写）
pub fn normalize_header(row: &[String]) -> Vec<String> {
    row.iter().map(|h| h.trim().to_lowercase()).collect()
}

/// 解析单行
///
/// # 返回
/// - Ok(None): 空白行
/// - Ok(Some(ParsedRow)): 候选记录
/// - Err(RowError): 设备 / 日期 / 测量值校验失败
pub fn parse_row<S: MeasurementStore + ?Sized>(
    store: &S,
    row: &[String],
    ctx: &RowContext<'_>,
) -> Result<Option<ParsedRow>, RowError> {
    if row.iter().all(|cell| cell.trim().is_empty()) {
        return Ok(None);
    }

    let cells = match ctx.header {
        Some(header) => map_by_header(header, row),
        None => map_by_position(row),
    };
    let get = |field: Field| cells.get(&field).copied();

    let device = resolve_device(
        store,
        get(Field::Device),
        get(Field::Serial),
        ctx.default_device,
    )?;

    let measurement_date = match non_blank(get(Field::Date)) {
        Some(raw) => normalize_date(raw)?,
        None => ctx.now,
    };

    let value = parse_value(get(Field::Value))?;

    let unit = non_blank(get(Field::Unit))
        .or_else(|| non_blank(ctx.default_unit))
        .or_else(|| device.default_unit())
        .unwrap_or_default()
        .to_string();
    let operator = non_blank(get(Field::Operator))
        .or_else(|| non_blank(ctx.default_operator))
        .unwrap_or_default()
        .to_string();
    let notes = non_blank(get(Field::Notes)).unwrap_or_default().to_string();

    let record = NewMeasurementRecord {
        device_id: device.id,
        measurement_date,
        value,
        unit,
        operator,
        notes,
        measurement_type: MeasurementType::Imported,
        temperature: None,
        humidity: None,
        batch_id: None,
        import_session_id: Some(ctx.import_session_id.to_string()),
    };

    Ok(Some(ParsedRow { record, device }))
}

/// 表头模式: 列名 → 值（同名列后者覆盖；缺失的尾部单元格视为不存在）
fn map_by_header<'r>(header: &[String], row: &'r [String]) -> HashMap<Field, &'r str> {
    let by_name: HashMap<&str, &str> = header
        .iter()
        .zip(row.iter())
        .map(|(name, cell)| (name.as_str(), cell.as_str()))
        .collect();

    let mut cells = HashMap::new();
    for (field, aliases) in FIELD_ALIASES.iter() {
        let value = aliases
            .iter()
            .filter_map(|alias| by_name.get(alias).copied())
            .find(|v| !v.trim().is_empty());
        if let Some(value) = value {
            cells.insert(*field, value);
        }
    }
    cells
}

fn map_by_position(row: &[String]) -> HashMap<Field, &str> {
    POSITIONAL_FIELDS
        .iter()
        .zip(row.iter())
        .map(|(field, cell)| (*field, cell.as_str()))
        .collect()
}

fn parse_value(raw: Option<&str>) -> Result<f64, RowError> {
    let raw = raw.unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RowError::MissingValue);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(RowError::InvalidValue {
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::MeasurementRecord;
    use crate::domain::types::DeviceType;
    use crate::repository::RepositoryResult;
    use chrono::NaiveDate;

    struct SingleDeviceStore {
        device: Device,
    }

    impl MeasurementStore for SingleDeviceStore {
        fn find_device_by_name(&self, name: &str) -> RepositoryResult<Option<Device>> {
            Ok(Some(self.device.clone()).filter(|d| d.name == name))
        }

        fn find_device_by_serial(&self, serial_number: &str) -> RepositoryResult<Option<Device>> {
            Ok(Some(self.device.clone()).filter(|d| d.serial_number == serial_number))
        }

        fn find_device_by_id(&self, id: i64) -> RepositoryResult<Option<Device>> {
            Ok(Some(self.device.clone()).filter(|d| d.id == id))
        }

        fn create_record(
            &self,
            _record: &NewMeasurementRecord,
            _device: &Device,
        ) -> RepositoryResult<MeasurementRecord> {
            unreachable!("row parser never creates records")
        }

        fn latest_import_session_id(&self) -> RepositoryResult<Option<String>> {
            Ok(None)
        }
    }

    fn store_with_unit(unit: Option<&str>) -> SingleDeviceStore {
        SingleDeviceStore {
            device: Device {
                id: 1,
                name: "SensorA".to_string(),
                serial_number: "SN-001".to_string(),
                device_type: DeviceType::Distance,
                manufacturer: None,
                model: None,
                location: None,
                active: true,
                calibration_date: None,
                next_calibration_date: None,
                calibration_interval: 365,
                measurement_unit: unit.map(str::to_string),
                min_range: None,
                max_range: None,
                accuracy: None,
                accuracy_unit: None,
                notes: None,
            },
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn ctx<'a>(header: Option<&'a [String]>) -> RowContext<'a> {
        RowContext {
            header,
            import_session_id: "import_20240601120000",
            default_device: None,
            default_unit: None,
            default_operator: None,
            now: now(),
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let store = store_with_unit(None);
        assert!(parse_row(&store, &[], &ctx(None)).unwrap().is_none());
        assert!(parse_row(&store, &row(&["", "  ", "\t"]), &ctx(None)).unwrap().is_none());
    }

    #[test]
    fn test_header_aliases() {
        let store = store_with_unit(None);
        let header = normalize_header(&row(&[" Device_Name ", "Timestamp", "Measurement_Value", "USER", "Comment"]));
        let parsed = parse_row(
            &store,
            &row(&["SensorA", "2024-03-05", "1.5", "bob", "ok"]),
            &ctx(Some(&header)),
        )
        .unwrap()
        .unwrap();

        let record = parsed.record;
        assert_eq!(record.device_id, 1);
        assert_eq!(
            record.measurement_date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(record.value, 1.5);
        assert_eq!(record.operator, "bob");
        assert_eq!(record.notes, "ok");
        assert_eq!(record.measurement_type, MeasurementType::Imported);
        assert_eq!(record.import_session_id.as_deref(), Some("import_20240601120000"));
    }

    #[test]
    fn test_first_non_blank_alias_wins() {
        let store = store_with_unit(None);
        let header = normalize_header(&row(&["device", "device_name", "value"]));
        let parsed = parse_row(&store, &row(&["", "SensorA", "2"]), &ctx(Some(&header)))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.device.name, "SensorA");
    }

    #[test]
    fn test_serial_column_resolves_device() {
        let store = store_with_unit(None);
        let header = normalize_header(&row(&["device", "serial", "value"]));
        let parsed = parse_row(&store, &row(&["Renamed", "SN-001", "2"]), &ctx(Some(&header)))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.device.id, 1);
    }

    #[test]
    fn test_positional_mapping_and_blank_date() {
        let store = store_with_unit(None);
        let parsed = parse_row(&store, &row(&["SensorA", " ", "42", "mm", "eve", "n"]), &ctx(None))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.record.measurement_date, now());
        assert_eq!(parsed.record.value, 42.0);
        assert_eq!(parsed.record.unit, "mm");
        assert_eq!(parsed.record.operator, "eve");
    }

    #[test]
    fn test_unit_and_operator_cascade() {
        let store = store_with_unit(Some("m"));
        let mut context = ctx(None);
        context.default_unit = Some("cm");
        context.default_operator = Some("wizard");

        // 单元格 > 向导默认 > 设备默认
        let parsed = parse_row(&store, &row(&["SensorA", "", "1", "mm"]), &context).unwrap().unwrap();
        assert_eq!(parsed.record.unit, "mm");
        assert_eq!(parsed.record.operator, "wizard");

        let parsed = parse_row(&store, &row(&["SensorA", "", "1"]), &context).unwrap().unwrap();
        assert_eq!(parsed.record.unit, "cm");

        context.default_unit = None;
        let parsed = parse_row(&store, &row(&["SensorA", "", "1"]), &context).unwrap().unwrap();
        assert_eq!(parsed.record.unit, "m");

        let bare = store_with_unit(None);
        let parsed = parse_row(&bare, &row(&["SensorA", "", "1"]), &ctx(None)).unwrap().unwrap();
        assert_eq!(parsed.record.unit, "");
        assert_eq!(parsed.record.operator, "");
        assert_eq!(parsed.record.notes, "");
    }

    #[test]
    fn test_value_validation() {
        let store = store_with_unit(None);
        let err = parse_row(&store, &row(&["SensorA", "", ""]), &ctx(None)).unwrap_err();
        assert_eq!(err.to_string(), "Measurement value is required");

        let err = parse_row(&store, &row(&["SensorA", "", "abc"]), &ctx(None)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid measurement value: abc");

        let err = parse_row(&store, &row(&["SensorA", "", "NaN"]), &ctx(None)).unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { .. }));
    }

    #[test]
    fn test_device_error_precedes_other_fields() {
        let store = store_with_unit(None);
        let err = parse_row(&store, &row(&["Ghost", "not-a-date", "abc"]), &ctx(None)).unwrap_err();
        assert_eq!(err.to_string(), "Device not found: Ghost");
    }

    #[test]
    fn test_invalid_date_reported() {
        let store = store_with_unit(None);
        let err = parse_row(&store, &row(&["SensorA", "2024.03.05", "1"]), &ctx(None)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format: 2024.03.05");
    }
}
