// ==========================================
// 测量数据管理系统 - 测量记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（质量分级由调用方计算后传入）
// 约束: 每条记录的编号推进 + 插入在同一事务内完成
// ==========================================

use crate::domain::measurement::{MeasurementRecord, NewMeasurementRecord};
use crate::domain::types::{MeasurementType, QualityStatus};
use crate::repository::device_repo::DATETIME_FMT;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sequence_repo::ReferenceSequence;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = r#"
    id, name, device_id, measurement_date, value, unit, operator, measurement_type,
    quality_status, temperature, humidity, notes, batch_id, import_session_id,
    is_validated, validated_by, validated_date
"#;

// ==========================================
// MeasurementRecordRepository - 测量记录仓储
// ==========================================
pub struct MeasurementRecordRepository {
    conn: Arc<Mutex<Connection>>,
    sequence: ReferenceSequence,
}

impl MeasurementRecordRepository {
    /// 创建新的 MeasurementRecordRepository 实例（默认编号格式）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            sequence: ReferenceSequence::default(),
        }
    }

    /// 注入编号序列（前缀 / 位数来自配置）
    pub fn with_sequence(mut self, sequence: ReferenceSequence) -> Self {
        self.sequence = sequence;
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建测量记录
    ///
    /// # 参数
    /// - record: 新建参数
    /// - quality_status: 调用方按设备量程计算的质量状态
    ///
    /// # 返回
    /// - Ok(MeasurementRecord): 已落库记录（含编号）
    pub fn create(
        &self,
        record: &NewMeasurementRecord,
        quality_status: QualityStatus,
    ) -> RepositoryResult<MeasurementRecord> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let name = self.sequence.next_in_tx(&tx)?;
        tx.execute(
            r#"
            INSERT INTO measurement_record (
                name, device_id, measurement_date, value, unit, operator, measurement_type,
                quality_status, temperature, humidity, notes, batch_id, import_session_id,
                is_validated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0)
            "#,
            params![
                name,
                record.device_id,
                record.measurement_date.format(DATETIME_FMT).to_string(),
                record.value,
                record.unit,
                record.operator,
                record.measurement_type.to_db_str(),
                quality_status.to_db_str(),
                record.temperature,
                record.humidity,
                record.notes,
                record.batch_id,
                record.import_session_id,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = find_by_id_inner(&tx, id)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        created.ok_or_else(|| RepositoryError::NotFound {
            entity: "MeasurementRecord".to_string(),
            id: id.to_string(),
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<MeasurementRecord>> {
        let conn = self.get_conn()?;
        find_by_id_inner(&conn, id)
    }

    /// 查询设备的全部记录（按测量时间倒序）
    pub fn list_by_device(&self, device_id: i64) -> RepositoryResult<Vec<MeasurementRecord>> {
        self.query_list(
            &format!(
                "SELECT {} FROM measurement_record WHERE device_id = ?1 \
                 ORDER BY measurement_date DESC, id DESC",
                RECORD_COLUMNS
            ),
            params![device_id],
        )
    }

    /// 查询一次导入会话创建的全部记录
    pub fn list_by_session(&self, import_session_id: &str) -> RepositoryResult<Vec<MeasurementRecord>> {
        self.query_list(
            &format!(
                "SELECT {} FROM measurement_record WHERE import_session_id = ?1 \
                 ORDER BY measurement_date DESC, id DESC",
                RECORD_COLUMNS
            ),
            params![import_session_id],
        )
    }

    /// 按测量时间区间查询（闭区间 [from, to]），可按设备过滤
    ///
    /// device_ids 为空表示全部设备
    pub fn list_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        device_ids: &[i64],
    ) -> RepositoryResult<Vec<MeasurementRecord>> {
        let mut sql = format!(
            "SELECT {} FROM measurement_record WHERE measurement_date >= ?1 AND measurement_date <= ?2",
            RECORD_COLUMNS
        );
        let mut values: Vec<rusqlite::types::Value> = vec![
            from.format(DATETIME_FMT).to_string().into(),
            to.format(DATETIME_FMT).to_string().into(),
        ];
        if !device_ids.is_empty() {
            let placeholders: Vec<String> =
                (0..device_ids.len()).map(|i| format!("?{}", i + 3)).collect();
            sql.push_str(&format!(" AND device_id IN ({})", placeholders.join(", ")));
            values.extend(device_ids.iter().map(|id| rusqlite::types::Value::from(*id)));
        }
        sql.push_str(" ORDER BY measurement_date DESC, id DESC");

        self.query_list(&sql, rusqlite::params_from_iter(values))
    }

    /// 最近的记录（按测量时间倒序）
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<MeasurementRecord>> {
        self.query_list(
            &format!(
                "SELECT {} FROM measurement_record ORDER BY measurement_date DESC, id DESC LIMIT ?1",
                RECORD_COLUMNS
            ),
            params![limit],
        )
    }

    /// 已落库的最大导入会话 ID（用于生成严格递增的新会话 ID）
    pub fn latest_import_session_id(&self) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(import_session_id) FROM measurement_record",
            [],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    /// 设置 / 清除质检确认
    ///
    /// - Some((by, at)): 标记为已确认
    /// - None: 清除确认信息
    pub fn set_validation(
        &self,
        id: i64,
        validation: Option<(&str, NaiveDateTime)>,
    ) -> RepositoryResult<MeasurementRecord> {
        let conn = self.get_conn()?;
        let affected = match validation {
            Some((by, at)) => conn.execute(
                "UPDATE measurement_record SET is_validated = 1, validated_by = ?2, validated_date = ?3 WHERE id = ?1",
                params![id, by, at.format(DATETIME_FMT).to_string()],
            )?,
            None => conn.execute(
                "UPDATE measurement_record SET is_validated = 0, validated_by = NULL, validated_date = NULL WHERE id = ?1",
                params![id],
            )?,
        };

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MeasurementRecord".to_string(),
                id: id.to_string(),
            });
        }

        find_by_id_inner(&conn, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "MeasurementRecord".to_string(),
            id: id.to_string(),
        })
    }

    /// 批量回写质量状态（设备量程变更后重新分级）
    pub fn update_quality_status(&self, updates: &[(i64, QualityStatus)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE measurement_record SET quality_status = ?2 WHERE id = ?1")?;
            for (id, status) in updates {
                count += stmt.execute(params![id, status.to_db_str()])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    fn query_list<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> RepositoryResult<Vec<MeasurementRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, map_record_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }
}

fn find_by_id_inner(conn: &Connection, id: i64) -> RepositoryResult<Option<MeasurementRecord>> {
    let sql = format!("SELECT {} FROM measurement_record WHERE id = ?1", RECORD_COLUMNS);
    let record = conn.query_row(&sql, params![id], map_record_row).optional()?;
    Ok(record)
}

fn parse_datetime(idx: usize, raw: &str) -> SqliteResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_record_row(row: &Row) -> SqliteResult<MeasurementRecord> {
    let validated_date = match row.get::<_, Option<String>>(16)? {
        Some(raw) => Some(parse_datetime(16, &raw)?),
        None => None,
    };

    Ok(MeasurementRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        device_id: row.get(2)?,
        measurement_date: parse_datetime(3, &row.get::<_, String>(3)?)?,
        value: row.get(4)?,
        unit: row.get(5)?,
        operator: row.get(6)?,
        measurement_type: MeasurementType::from_db_str(&row.get::<_, String>(7)?)
            .unwrap_or_default(),
        quality_status: QualityStatus::from_db_str(&row.get::<_, String>(8)?)
            .unwrap_or(QualityStatus::Good),
        temperature: row.get(9)?,
        humidity: row.get(10)?,
        notes: row.get(11)?,
        batch_id: row.get(12)?,
        import_session_id: row.get(13)?,
        is_validated: row.get::<_, i32>(14)? != 0,
        validated_by: row.get(15)?,
        validated_date,
    })
}
