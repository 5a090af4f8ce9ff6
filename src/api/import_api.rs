// ==========================================
// 测量数据管理系统 - 导入向导 API
// ==========================================
// 职责: 封装 CSV 导入向导（表单 + 状态机）
// 状态流转: Draft → Preview（可选）→ Done
// 说明: Done 状态下允许再次导入，生成新的会话 ID（不去重）
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportSettings;
use crate::domain::measurement::{ImportRunResult, ImportSummary, MeasurementRecord};
use crate::domain::types::{Delimiter, WizardState};
use crate::importer::{
    render_summary, ImportError, ImportOptions, MeasurementImporter, MeasurementImporterImpl,
    SqliteMeasurementStore,
};
use crate::repository::MeasurementRecordRepository;

/// 向导默认导入名称
pub const DEFAULT_IMPORT_NAME: &str = "CSV Import";

// ==========================================
// ImportWizard - 导入向导表单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportWizard {
    // ===== 表单输入 =====
    pub name: String,
    pub filename: Option<String>,
    #[serde(skip)]
    pub csv_file: Option<Vec<u8>>,
    pub delimiter: Delimiter,
    pub has_header: bool,
    pub device_id: Option<i64>, // 默认设备
    pub unit: Option<String>,   // 默认单位
    pub operator: Option<String>,

    // ===== 输出（只读） =====
    pub preview_data: Option<String>,
    pub import_summary: Option<String>,
    pub state: WizardState,
    pub last_import_session_id: Option<String>,
    pub last_result: Option<ImportSummary>,
}

impl ImportWizard {
    /// 以配置中的默认分隔符 / 表头设置创建向导
    pub fn new(settings: &ImportSettings) -> Self {
        Self {
            name: DEFAULT_IMPORT_NAME.to_string(),
            filename: None,
            csv_file: None,
            delimiter: settings.default_delimiter,
            has_header: settings.default_has_header,
            device_id: None,
            unit: None,
            operator: None,
            preview_data: None,
            import_summary: None,
            state: WizardState::Draft,
            last_import_session_id: None,
            last_result: None,
        }
    }

    /// 载入文件内容
    pub fn with_file(mut self, filename: &str, bytes: Vec<u8>) -> Self {
        self.filename = Some(filename.to_string());
        self.csv_file = Some(bytes);
        self
    }

    fn options(&self) -> ImportOptions {
        ImportOptions {
            delimiter: self.delimiter,
            has_header: self.has_header,
            default_device_id: self.device_id,
            default_unit: self.unit.clone(),
            default_operator: self.operator.clone(),
        }
    }

    fn file_bytes(&self) -> ApiResult<&[u8]> {
        match self.csv_file.as_deref() {
            Some(bytes) => Ok(bytes),
            None => Err(ImportError::NoFile.into()),
        }
    }
}

// ==========================================
// ImportApi - 导入 API
// ==========================================
pub struct ImportApi {
    importer: MeasurementImporterImpl<SqliteMeasurementStore>,
    record_repo: Arc<MeasurementRecordRepository>,
}

impl ImportApi {
    pub fn new(
        importer: MeasurementImporterImpl<SqliteMeasurementStore>,
        record_repo: Arc<MeasurementRecordRepository>,
    ) -> Self {
        Self {
            importer,
            record_repo,
        }
    }

    /// 新建向导（默认值取自导入配置）
    pub fn new_wizard(&self) -> ImportWizard {
        ImportWizard::new(self.importer.settings())
    }

    /// 生成预览（无副作用），向导进入 Preview
    pub fn action_preview(&self, wizard: &mut ImportWizard) -> ApiResult<()> {
        let bytes = wizard.file_bytes()?;
        let preview = self.importer.preview(bytes, &wizard.options())?;

        wizard.preview_data = Some(preview);
        wizard.state = WizardState::Preview;
        Ok(())
    }

    /// 执行导入，向导进入 Done
    ///
    /// # 返回
    /// - Ok(ImportRunResult): 行级结果（失败行不会导致 Err）
    /// - Err: 未选择文件 / 空文件 / 解码失败等致命错误（向导状态不变）
    pub fn action_import(&self, wizard: &mut ImportWizard) -> ApiResult<ImportRunResult> {
        let bytes = wizard.file_bytes()?;
        let result = self.importer.import(bytes, &wizard.options())?;

        wizard.import_summary = Some(render_summary(
            &wizard.name,
            wizard.filename.as_deref(),
            &result,
            self.importer.settings().max_error_lines,
        ));
        wizard.last_import_session_id = Some(result.import_session_id.clone());
        wizard.last_result = Some(result.summary());
        wizard.state = WizardState::Done;

        info!(
            name = %wizard.name,
            session_id = %result.import_session_id,
            created = result.created_count(),
            errors = result.failed_count(),
            "导入向导完成"
        );
        Ok(result)
    }

    /// 查看最近一次导入创建的记录（仅 Done 状态可用）
    pub fn action_view_imported_records(
        &self,
        wizard: &ImportWizard,
    ) -> ApiResult<Vec<MeasurementRecord>> {
        let session_id = match (&wizard.state, &wizard.last_import_session_id) {
            (WizardState::Done, Some(id)) => id,
            _ => {
                return Err(ApiError::UserError(
                    "Import has not been completed yet.".to_string(),
                ))
            }
        };
        Ok(self.record_repo.list_by_session(session_id)?)
    }
}
