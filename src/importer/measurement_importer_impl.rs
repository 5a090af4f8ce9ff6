// ==========================================
// 测量数据管理系统 - 测量数据导入器实现
// ==========================================
// 职责: 整合导入流程，从 CSV 字节到记录落库
// 流程: 解码 → 切分 → 表头处理 → 会话 ID → 逐行解析 → 落库
// 红线: 单行失败只记入错误列表，不中断整批
// ==========================================

use crate::config::ImportSettings;
use crate::domain::measurement::{ImportRunResult, RowOutcome};
use crate::importer::error::{ImportResult, RowError};
use crate::importer::field_mapper::{normalize_header, parse_row, RowContext};
use crate::importer::file_parser::{CsvParser, RawRow};
use crate::importer::import_options::ImportOptions;
use crate::importer::measurement_importer_trait::{MeasurementImporter, MeasurementStore};
use crate::importer::report::render_preview;
use crate::importer::session_id::SessionIdGenerator;
use crate::repository::RepositoryError;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// MeasurementImporterImpl - 测量数据导入器实现
// ==========================================
pub struct MeasurementImporterImpl<S>
where
    S: MeasurementStore,
{
    // 记录存储
    store: S,

    // 导入配置快照
    settings: ImportSettings,

    // 会话 ID 生成器
    session_ids: SessionIdGenerator,
}

impl<S> MeasurementImporterImpl<S>
where
    S: MeasurementStore,
{
    pub fn new(store: S, settings: ImportSettings) -> Self {
        Self {
            store,
            settings,
            session_ids: SessionIdGenerator::new(),
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 拆分表头与数据行，返回 (表头, 数据行, 首个数据行的行号)
    fn split_header(rows: &[RawRow], has_header: bool) -> (Option<Vec<String>>, &[RawRow], usize) {
        match rows.split_first() {
            Some((header, data)) if has_header => (Some(normalize_header(header)), data, 2),
            _ => (None, rows, 1),
        }
    }
}

impl<S> MeasurementImporter for MeasurementImporterImpl<S>
where
    S: MeasurementStore,
{
    #[instrument(skip(self, bytes, options), fields(size = bytes.len()))]
    fn preview(&self, bytes: &[u8], options: &ImportOptions) -> ImportResult<String> {
        let rows = CsvParser::new(options.delimiter).parse_rows(bytes)?;
        debug!(rows = rows.len(), "预览解析完成");
        Ok(render_preview(&rows, options.has_header, self.settings.max_preview_rows))
    }

    #[instrument(skip(self, bytes, options), fields(session_id))]
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> ImportResult<ImportRunResult> {
        let start_time = Instant::now();

        // === 步骤 1: 解码 + 切分 ===
        let rows = CsvParser::new(options.delimiter).parse_rows(bytes)?;
        let (header, data_rows, first_row_number) = Self::split_header(&rows, options.has_header);

        // === 步骤 2: 默认设备 ===
        let default_device = match options.default_device_id {
            Some(id) => Some(self.store.find_device_by_id(id)?.ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "Device".to_string(),
                    id: id.to_string(),
                }
            })?),
            None => None,
        };

        // === 步骤 3: 会话 ID（在处理任何行之前生成） ===
        let now = Utc::now().naive_utc();
        let latest = self.store.latest_import_session_id()?;
        let import_session_id = self.session_ids.next_id(now, latest.as_deref())?;
        tracing::Span::current().record("session_id", import_session_id.as_str());
        info!(
            session_id = %import_session_id,
            total_rows = data_rows.len(),
            has_header = options.has_header,
            "开始导入测量数据"
        );

        // === 步骤 4: 逐行处理 ===
        let ctx = RowContext {
            header: header.as_deref(),
            import_session_id: &import_session_id,
            default_device: default_device.as_ref(),
            default_unit: options.default_unit.as_deref(),
            default_operator: options.default_operator.as_deref(),
            now,
        };

        let mut outcomes = Vec::with_capacity(data_rows.len());
        for (idx, row) in data_rows.iter().enumerate() {
            let row_number = first_row_number + idx;
            let outcome = match self.process_row(row, &ctx) {
                Ok(Some(outcome)) => outcome,
                Ok(None) => RowOutcome::Skipped { row_number },
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "行导入失败");
                    RowOutcome::Failed {
                        row_number,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let result = ImportRunResult {
            import_session_id,
            total_rows: data_rows.len(),
            outcomes,
            elapsed_time: start_time.elapsed(),
        };

        info!(
            session_id = %result.import_session_id,
            created = result.created_count(),
            skipped = result.skipped_count(),
            errors = result.failed_count(),
            elapsed_ms = result.elapsed_time.as_millis() as u64,
            "CSV import completed"
        );

        Ok(result)
    }
}

impl<S> MeasurementImporterImpl<S>
where
    S: MeasurementStore,
{
    /// 单行: 解析 + 落库（每行独立原子单元）
    fn process_row(&self, row: &[String], ctx: &RowContext<'_>) -> Result<Option<RowOutcome>, RowError> {
        let parsed = match parse_row(&self.store, row, ctx)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };
        let record = self.store.create_record(&parsed.record, &parsed.device)?;
        Ok(Some(RowOutcome::Created(record)))
    }
}
