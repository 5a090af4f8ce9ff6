// ==========================================
// 测量数据管理系统 - SQLite 记录存储
// ==========================================
// 职责: MeasurementStore 的仓储实现
// 说明: 质量状态按设备量程在创建时计算；超量程只告警不拒绝
// ==========================================

use crate::domain::device::Device;
use crate::domain::measurement::{MeasurementRecord, NewMeasurementRecord};
use crate::domain::types::QualityStatus;
use crate::importer::measurement_importer_trait::MeasurementStore;
use crate::repository::{
    DeviceRepository, MeasurementRecordRepository, ReferenceSequence, RepositoryResult,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct SqliteMeasurementStore {
    devices: DeviceRepository,
    records: MeasurementRecordRepository,
}

impl SqliteMeasurementStore {
    /// 共享连接构造（设备仓储与记录仓储使用同一连接）
    pub fn new(conn: Arc<Mutex<Connection>>, sequence: ReferenceSequence) -> Self {
        Self {
            devices: DeviceRepository::from_connection(conn.clone()),
            records: MeasurementRecordRepository::from_connection(conn).with_sequence(sequence),
        }
    }
}

impl MeasurementStore for SqliteMeasurementStore {
    fn find_device_by_name(&self, name: &str) -> RepositoryResult<Option<Device>> {
        self.devices.find_by_name(name)
    }

    fn find_device_by_serial(&self, serial_number: &str) -> RepositoryResult<Option<Device>> {
        self.devices.find_by_serial(serial_number)
    }

    fn find_device_by_id(&self, id: i64) -> RepositoryResult<Option<Device>> {
        self.devices.find_by_id(id)
    }

    fn create_record(
        &self,
        record: &NewMeasurementRecord,
        device: &Device,
    ) -> RepositoryResult<MeasurementRecord> {
        if let Some(message) = device.range_warning(record.value) {
            warn!(device_id = device.id, value = record.value, "{}", message);
        }
        let quality = QualityStatus::classify(record.value, device.min_range, device.max_range);
        self.records.create(record, quality)
    }

    fn latest_import_session_id(&self) -> RepositoryResult<Option<String>> {
        self.records.latest_import_session_id()
    }
}
