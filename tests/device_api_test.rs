// ==========================================
// 测量数据管理系统 - DeviceApi / MeasurementApi 集成测试
// ==========================================


use chrono::NaiveDate;
use measurement_data_mgmt::api::{ApiError, ManualEntry};
use measurement_data_mgmt::domain::types::{DeviceType, MeasurementType, QualityStatus};
use measurement_data_mgmt::domain::NewDevice;
use test_helpers::{create_test_state, seed_bare_device, seed_device};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==========================================
// 设备登记 / 维护
// ==========================================

#[test]
fn test_register_device_derives_next_calibration() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");

    assert!(device.id > 0);
    assert!(device.active);
    assert_eq!(device.calibration_date, Some(day(2024, 1, 1)));
    assert_eq!(device.next_calibration_date, Some(day(2024, 6, 29)));
    assert_eq!(device.measurement_unit.as_deref(), Some("bar"));
}

#[test]
fn test_register_device_rejects_blank_identity_and_bad_interval() {
    let (_tmp, state) = create_test_state();

    let err = state
        .device_api
        .register_device(&NewDevice::new("  ", "S-1", DeviceType::Flow))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = state
        .device_api
        .register_device(&NewDevice::new("Flow", "", DeviceType::Flow))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = state
        .device_api
        .register_device(&NewDevice::new("Flow", "S-1", DeviceType::Flow).with_calibration(day(2024, 1, 1), 0))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_duplicate_serial_is_rejected() {
    let (_tmp, state) = create_test_state();
    seed_device(&state, "Gauge 1", "G-001");

    let err = state
        .device_api
        .register_device(&NewDevice::new("Gauge 2", "G-001", DeviceType::Pressure))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_archive_hides_device_from_active_list() {
    let (_tmp, state) = create_test_state();
    let a = seed_device(&state, "Alpha", "A-1");
    seed_device(&state, "Beta", "B-1");

    state.device_api.archive_device(a.id).unwrap();
    let active: Vec<String> = state
        .device_api
        .list_devices(false)
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(active, vec!["Beta".to_string()]);
    assert_eq!(state.device_api.list_devices(true).unwrap().len(), 2);

    state.device_api.restore_device(a.id).unwrap();
    assert!(state.device_api.get_device(a.id).unwrap().active);
}

#[test]
fn test_record_calibration_and_due_list() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");
    seed_bare_device(&state, "Never calibrated", "N-1");

    let due = state.device_api.calibration_due(day(2024, 7, 1)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, device.id);

    let updated = state
        .device_api
        .record_calibration(device.id, day(2024, 7, 1))
        .unwrap();
    assert_eq!(updated.next_calibration_date, Some(day(2024, 12, 28)));
    assert!(state.device_api.calibration_due(day(2024, 7, 1)).unwrap().is_empty());
}

#[test]
fn test_missing_device_is_not_found() {
    let (_tmp, state) = create_test_state();
    assert!(matches!(state.device_api.get_device(42), Err(ApiError::NotFound(_))));
    assert!(matches!(state.device_api.device_stats(42), Err(ApiError::NotFound(_))));
}

#[test]
fn test_range_change_regrades_existing_records() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");

    let record = state
        .measurement_api
        .record_measurement(&ManualEntry {
            device_id: device.id,
            value: 95.0,
            ..ManualEntry::default()
        })
        .unwrap();
    assert_eq!(record.quality_status, QualityStatus::Warning);

    let mut widened = device.clone();
    widened.max_range = Some(200.0);
    state.device_api.update_device(&widened).unwrap();

    let regraded = state.measurement_api.get_record(record.id).unwrap();
    assert_eq!(regraded.quality_status, QualityStatus::Good);
}

// ==========================================
// 人工录入 / 质检确认
// ==========================================

#[test]
fn test_manual_entry_uses_device_unit_and_updates_stats() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");
    let when = day(2024, 5, 2).and_hms_opt(9, 15, 0).unwrap();

    let record = state
        .measurement_api
        .record_measurement(&ManualEntry {
            device_id: device.id,
            measurement_date: Some(when),
            value: 40.0,
            operator: Some("dave".to_string()),
            temperature: Some(21.0),
            ..ManualEntry::default()
        })
        .unwrap();

    assert_eq!(record.name, "MR00001");
    assert_eq!(record.unit, "bar");
    assert_eq!(record.measurement_type, MeasurementType::Manual);
    assert_eq!(record.import_session_id, None);
    assert_eq!(record.temperature, Some(21.0));

    let stats = state.device_api.device_stats(device.id).unwrap();
    assert_eq!(stats.record_count, 1);
    assert_eq!(stats.last_measurement_date, Some(when));
}

#[test]
fn test_manual_entry_rejects_unknown_device_and_nan() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");

    let err = state
        .measurement_api
        .record_measurement(&ManualEntry {
            device_id: device.id + 100,
            value: 1.0,
            ..ManualEntry::default()
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = state
        .measurement_api
        .record_measurement(&ManualEntry {
            device_id: device.id,
            value: f64::NAN,
            ..ManualEntry::default()
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_validate_and_invalidate_record() {
    let (_tmp, state) = create_test_state();
    let device = seed_device(&state, "Gauge 1", "G-001");
    let record = state
        .measurement_api
        .record_measurement(&ManualEntry {
            device_id: device.id,
            value: 50.0,
            ..ManualEntry::default()
        })
        .unwrap();

    assert!(matches!(
        state.measurement_api.validate_record(record.id, " "),
        Err(ApiError::InvalidInput(_))
    ));

    let validated = state.measurement_api.validate_record(record.id, "erin").unwrap();
    assert!(validated.is_validated);
    assert_eq!(validated.validated_by.as_deref(), Some("erin"));
    assert!(validated.validated_date.is_some());

    let cleared = state.measurement_api.invalidate_record(record.id).unwrap();
    assert!(!cleared.is_validated);
    assert_eq!(cleared.validated_by, None);
    assert_eq!(cleared.validated_date, None);
}

#[test]
fn test_recent_records_requires_positive_limit() {
    let (_tmp, state) = create_test_state();
    assert!(matches!(
        state.measurement_api.recent_records(0),
        Err(ApiError::InvalidInput(_))
    ));
}
