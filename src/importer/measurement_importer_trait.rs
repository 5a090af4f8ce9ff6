// ==========================================
// 测量数据管理系统 - 测量导入 Trait
// ==========================================
// 职责: 定义导入管道的接口（不包含实现）
// - MeasurementStore: 导入所需的记录存储能力
// - MeasurementImporter: 预览 / 导入主接口
// ==========================================

use crate::domain::device::Device;
use crate::domain::measurement::{ImportRunResult, MeasurementRecord, NewMeasurementRecord};
use crate::importer::error::ImportResult;
use crate::importer::ImportOptions;
use crate::repository::RepositoryResult;

// ==========================================
// MeasurementStore Trait
// ==========================================
// 用途: 设备解析（只读）+ 记录创建
// 实现者: SqliteMeasurementStore；测试中可替换为内存实现
pub trait MeasurementStore {
    /// 按名称精确查找设备（区分大小写）
    fn find_device_by_name(&self, name: &str) -> RepositoryResult<Option<Device>>;

    /// 按序列号精确查找设备
    fn find_device_by_serial(&self, serial_number: &str) -> RepositoryResult<Option<Device>>;

    /// 按主键查找设备（向导默认设备）
    fn find_device_by_id(&self, id: i64) -> RepositoryResult<Option<Device>>;

    /// 创建记录（分配唯一编号）
    ///
    /// # 参数
    /// - record: 行解析器产出的候选记录
    /// - device: 已解析的设备（用于质量分级）
    fn create_record(
        &self,
        record: &NewMeasurementRecord,
        device: &Device,
    ) -> RepositoryResult<MeasurementRecord>;

    /// 已落库的最大导入会话 ID
    fn latest_import_session_id(&self) -> RepositoryResult<Option<String>>;
}

// ==========================================
// MeasurementImporter Trait
// ==========================================
// 用途: 测量数据导入主接口
// 实现者: MeasurementImporterImpl
pub trait MeasurementImporter {
    /// 生成预览文本（无副作用）
    ///
    /// # 返回
    /// - Ok(String): 表头行 + 分隔线 + 至多 N 行数据 + 截断提示
    /// - Err: 解码错误 / 空文件
    fn preview(&self, bytes: &[u8], options: &ImportOptions) -> ImportResult<String>;

    /// 执行导入
    ///
    /// # 返回
    /// - Ok(ImportRunResult): 每个数据行恰好一个结果
    /// - Err: 致命错误（解码失败 / 空文件 / 会话 ID 生成失败），不会写入任何记录
    ///
    /// # 导入流程
    /// 1. 解码 + 切分
    /// 2. 表头处理（小写 + trim）
    /// 3. 生成会话 ID
    /// 4. 逐行解析 → 落库；失败行记录错误并继续
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> ImportResult<ImportRunResult>;
}
