// ==========================================
// 测量数据管理系统 - 设备解析
// ==========================================
// 顺序（首个命中即返回）:
// 1. 名称非空白 → 按名称精确匹配
// 2. 序列号非空白 → 按序列号精确匹配
// 3. 向导默认设备
// 4. 失败: Device not found: {名称 | Unknown}
// ==========================================

use crate::domain::device::Device;
use crate::importer::error::RowError;
use crate::importer::measurement_importer_trait::MeasurementStore;
use crate::utils::non_blank;

const UNKNOWN_DEVICE: &str = "Unknown";

/// 解析一行数据对应的设备
pub fn resolve_device<S: MeasurementStore + ?Sized>(
    store: &S,
    device_name: Option<&str>,
    serial_number: Option<&str>,
    default_device: Option<&Device>,
) -> Result<Device, RowError> {
    let name = non_blank(device_name);

    if let Some(name) = name {
        if let Some(device) = store.find_device_by_name(name)? {
            return Ok(device);
        }
    }

    if let Some(serial) = non_blank(serial_number) {
        if let Some(device) = store.find_device_by_serial(serial)? {
            return Ok(device);
        }
    }

    if let Some(device) = default_device {
        return Ok(device.clone());
    }

    Err(RowError::DeviceNotFound {
        name: name.unwrap_or(UNKNOWN_DEVICE).to_string(),
    })
}
