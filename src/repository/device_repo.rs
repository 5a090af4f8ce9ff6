// ==========================================
// 测量数据管理系统 - 设备数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 序列号全局唯一（含已归档设备）
// ==========================================

use crate::domain::device::{next_calibration_date, Device, DeviceStats, NewDevice};
use crate::domain::types::DeviceType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const DEVICE_COLUMNS: &str = r#"
    id, name, serial_number, device_type, manufacturer, model, location, active,
    calibration_date, next_calibration_date, calibration_interval,
    measurement_unit, min_range, max_range, accuracy, accuracy_unit, notes
"#;

// ==========================================
// DeviceRepository - 设备仓储
// ==========================================
/// 设备仓储
/// 职责: 管理 measurement_device 表的 CRUD 操作
pub struct DeviceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeviceRepository {
    /// 创建新的 DeviceRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记设备
    ///
    /// # 返回
    /// - Ok(Device): 新建设备（含自增 id 与派生的下次校准日期）
    /// - Err(UniqueConstraintViolation): 序列号已被其他设备占用
    pub fn insert(&self, device: &NewDevice) -> RepositoryResult<Device> {
        let conn = self.get_conn()?;
        ensure_serial_available(&conn, &device.serial_number, None)?;

        let next_date = next_calibration_date(device.calibration_date, device.calibration_interval);
        conn.execute(
            r#"
            INSERT INTO measurement_device (
                name, serial_number, device_type, manufacturer, model, location, active,
                calibration_date, next_calibration_date, calibration_interval,
                measurement_unit, min_range, max_range, accuracy, accuracy_unit, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                device.name,
                device.serial_number,
                device.device_type.to_db_str(),
                device.manufacturer,
                device.model,
                device.location,
                device.calibration_date.map(|d| d.format(DATE_FMT).to_string()),
                next_date.map(|d| d.format(DATE_FMT).to_string()),
                device.calibration_interval,
                device.measurement_unit,
                device.min_range,
                device.max_range,
                device.accuracy,
                device.accuracy_unit,
                device.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        find_by_id_inner(&conn, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Device".to_string(),
            id: id.to_string(),
        })
    }

    /// 整体更新设备（下次校准日期按校准日期与周期重新派生）
    pub fn update(&self, device: &Device) -> RepositoryResult<Device> {
        let conn = self.get_conn()?;
        ensure_serial_available(&conn, &device.serial_number, Some(device.id))?;

        let next_date = next_calibration_date(device.calibration_date, device.calibration_interval);
        let affected = conn.execute(
            r#"
            UPDATE measurement_device SET
                name = ?2, serial_number = ?3, device_type = ?4, manufacturer = ?5,
                model = ?6, location = ?7, active = ?8, calibration_date = ?9,
                next_calibration_date = ?10, calibration_interval = ?11,
                measurement_unit = ?12, min_range = ?13, max_range = ?14,
                accuracy = ?15, accuracy_unit = ?16, notes = ?17
            WHERE id = ?1
            "#,
            params![
                device.id,
                device.name,
                device.serial_number,
                device.device_type.to_db_str(),
                device.manufacturer,
                device.model,
                device.location,
                device.active as i32,
                device.calibration_date.map(|d| d.format(DATE_FMT).to_string()),
                next_date.map(|d| d.format(DATE_FMT).to_string()),
                device.calibration_interval,
                device.measurement_unit,
                device.min_range,
                device.max_range,
                device.accuracy,
                device.accuracy_unit,
                device.notes,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: device.id.to_string(),
            });
        }

        find_by_id_inner(&conn, device.id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Device".to_string(),
            id: device.id.to_string(),
        })
    }

    /// 归档 / 恢复设备
    pub fn set_active(&self, id: i64, active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE measurement_device SET active = ?2 WHERE id = ?1",
            params![id, active as i32],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 按主键查询（含已归档设备）
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Device>> {
        let conn = self.get_conn()?;
        find_by_id_inner(&conn, id)
    }

    /// 按名称精确查询（区分大小写，仅在用设备）
    ///
    /// 同名设备取 id 最小者（最早登记）
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Device>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM measurement_device WHERE name = ?1 AND active = 1 ORDER BY id ASC LIMIT 1",
            DEVICE_COLUMNS
        );
        let device = conn
            .query_row(&sql, params![name], map_device_row)
            .optional()?;
        Ok(device)
    }

    /// 按序列号精确查询（仅在用设备）
    pub fn find_by_serial(&self, serial_number: &str) -> RepositoryResult<Option<Device>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM measurement_device WHERE serial_number = ?1 AND active = 1 ORDER BY id ASC LIMIT 1",
            DEVICE_COLUMNS
        );
        let device = conn
            .query_row(&sql, params![serial_number], map_device_row)
            .optional()?;
        Ok(device)
    }

    /// 设备列表（按名称排序）
    pub fn list(&self, include_archived: bool) -> RepositoryResult<Vec<Device>> {
        let conn = self.get_conn()?;
        let sql = if include_archived {
            format!("SELECT {} FROM measurement_device ORDER BY name ASC, id ASC", DEVICE_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM measurement_device WHERE active = 1 ORDER BY name ASC, id ASC",
                DEVICE_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let devices = stmt
            .query_map([], map_device_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(devices)
    }

    /// 设备统计：记录数 + 最近测量时间
    pub fn stats(&self, id: i64) -> RepositoryResult<DeviceStats> {
        let conn = self.get_conn()?;
        let (record_count, last_date): (i64, Option<String>) = conn.query_row(
            "SELECT COUNT(*), MAX(measurement_date) FROM measurement_record WHERE device_id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DeviceStats {
            device_id: id,
            record_count,
            last_measurement_date: last_date
                .and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).ok()),
        })
    }
}

/// 序列号占用检查（exclude_id 为更新场景下的自身 id）
fn ensure_serial_available(
    conn: &Connection,
    serial_number: &str,
    exclude_id: Option<i64>,
) -> RepositoryResult<()> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT name FROM measurement_device WHERE serial_number = ?1 AND id != ?2 LIMIT 1",
            params![serial_number, exclude_id.unwrap_or(-1)],
            |row| row.get(0),
        )
        .optional()?;

    match holder {
        Some(name) => Err(RepositoryError::UniqueConstraintViolation(format!(
            "Serial number must be unique. Device \"{}\" already uses this serial number.",
            name
        ))),
        None => Ok(()),
    }
}

fn find_by_id_inner(conn: &Connection, id: i64) -> RepositoryResult<Option<Device>> {
    let sql = format!("SELECT {} FROM measurement_device WHERE id = ?1", DEVICE_COLUMNS);
    let device = conn.query_row(&sql, params![id], map_device_row).optional()?;
    Ok(device)
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok())
}

fn map_device_row(row: &Row) -> SqliteResult<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        serial_number: row.get(2)?,
        device_type: DeviceType::from_db_str(&row.get::<_, String>(3)?)
            .unwrap_or(DeviceType::Other),
        manufacturer: row.get(4)?,
        model: row.get(5)?,
        location: row.get(6)?,
        active: row.get::<_, i32>(7)? != 0,
        calibration_date: parse_date(row.get(8)?),
        next_calibration_date: parse_date(row.get(9)?),
        calibration_interval: row.get(10)?,
        measurement_unit: row.get(11)?,
        min_range: row.get(12)?,
        max_range: row.get(13)?,
        accuracy: row.get(14)?,
        accuracy_unit: row.get(15)?,
        notes: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> DeviceRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        DeviceRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup_repo();
        let device = repo
            .insert(&NewDevice::new("SensorA", "SN-001", DeviceType::Pressure).with_unit("bar"))
            .unwrap();

        assert!(device.active);
        assert_eq!(device.measurement_unit.as_deref(), Some("bar"));

        let by_name = repo.find_by_name("SensorA").unwrap().unwrap();
        assert_eq!(by_name.id, device.id);
        let by_serial = repo.find_by_serial("SN-001").unwrap().unwrap();
        assert_eq!(by_serial.id, device.id);

        // 名称区分大小写
        assert!(repo.find_by_name("sensora").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let repo = setup_repo();
        repo.insert(&NewDevice::new("SensorA", "SN-001", DeviceType::Pressure))
            .unwrap();

        let err = repo
            .insert(&NewDevice::new("SensorB", "SN-001", DeviceType::Flow))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert!(err.to_string().contains("\"SensorA\""));
    }

    #[test]
    fn test_duplicate_name_resolves_to_earliest() {
        let repo = setup_repo();
        let first = repo
            .insert(&NewDevice::new("Thermo", "SN-A", DeviceType::Temperature))
            .unwrap();
        repo.insert(&NewDevice::new("Thermo", "SN-B", DeviceType::Temperature))
            .unwrap();

        let found = repo.find_by_name("Thermo").unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[test]
    fn test_archived_device_not_resolved() {
        let repo = setup_repo();
        let device = repo
            .insert(&NewDevice::new("Old", "SN-OLD", DeviceType::Other))
            .unwrap();
        repo.set_active(device.id, false).unwrap();

        assert!(repo.find_by_name("Old").unwrap().is_none());
        assert!(repo.find_by_serial("SN-OLD").unwrap().is_none());
        assert_eq!(repo.list(false).unwrap().len(), 0);
        assert_eq!(repo.list(true).unwrap().len(), 1);
    }

    #[test]
    fn test_update_recomputes_next_calibration() {
        let repo = setup_repo();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut device = repo
            .insert(&NewDevice::new("Gauge", "SN-G", DeviceType::Thickness).with_calibration(date, 365))
            .unwrap();
        assert_eq!(device.next_calibration_date, NaiveDate::from_ymd_opt(2024, 12, 31));

        device.calibration_interval = 30;
        let updated = repo.update(&device).unwrap();
        assert_eq!(updated.next_calibration_date, NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn test_list_sorted_by_name() {
        let repo = setup_repo();
        repo.insert(&NewDevice::new("Zeta", "SN-Z", DeviceType::Level)).unwrap();
        repo.insert(&NewDevice::new("Alpha", "SN-A", DeviceType::Level)).unwrap();

        let names: Vec<String> = repo.list(false).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
