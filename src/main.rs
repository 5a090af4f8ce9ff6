// ==========================================
// 测量数据管理系统 - 命令行入口
// ==========================================
// 子命令: device / record / import / config
// 数据库: --db > MEASUREMENT_DATA_DB_PATH > 用户数据目录
// ==========================================

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use measurement_data_mgmt::api::ManualEntry;
use measurement_data_mgmt::app::{get_default_db_path, AppState, DB_PATH_ENV};
use measurement_data_mgmt::domain::device::DEFAULT_CALIBRATION_INTERVAL_DAYS;
use measurement_data_mgmt::importer::date_normalizer::normalize_date;
use measurement_data_mgmt::{logging, Delimiter, Device, DeviceType, MeasurementRecord, NewDevice};

// ==========================================
// CLI 参数
// ==========================================

#[derive(Parser, Debug)]
#[command(name = "measurement-data")]
#[command(version, about = "Measurement device registry, records and CSV import")]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 设备管理
    #[command(subcommand)]
    Device(DeviceCommand),

    /// 测量记录
    #[command(subcommand)]
    Record(RecordCommand),

    /// CSV 导入
    #[command(subcommand)]
    Import(ImportCommand),

    /// 系统配置
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum DeviceCommand {
    /// 登记设备
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        serial: String,
        #[arg(long = "type", value_parser = parse_device_type, default_value = "other")]
        device_type: DeviceType,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        #[arg(long)]
        manufacturer: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// 最近一次校准日期 (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        calibrated: Option<NaiveDate>,
        /// 校准周期（天）
        #[arg(long, default_value_t = DEFAULT_CALIBRATION_INTERVAL_DAYS)]
        interval: i32,
    },
    /// 设备列表
    List {
        /// 包含已归档设备
        #[arg(long)]
        all: bool,
    },
    /// 设备详情与统计
    Show { id: i64 },
    /// 归档设备（--restore 恢复）
    Archive {
        id: i64,
        #[arg(long)]
        restore: bool,
    },
    /// 登记校准（默认今天）
    Calibrate {
        id: i64,
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// 列出到期需校准的设备
    Due {
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// 设备报表（近 30 天，JSON 输出）
    Report { id: i64 },
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    /// 人工录入
    Add {
        #[arg(long)]
        device: i64,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        /// 测量时间（缺省为当前时间）
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        operator: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        humidity: Option<f64>,
        #[arg(long)]
        batch: Option<String>,
    },
    /// 查询记录
    List {
        #[arg(long, conflicts_with = "session")]
        device: Option<i64>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// 质检确认
    Validate {
        id: i64,
        #[arg(long)]
        by: String,
    },
    /// 撤销质检确认
    Invalidate { id: i64 },
    /// 区间分析报表（按设备分组，JSON 输出）
    Report {
        #[arg(long, value_parser = parse_day)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_day)]
        to: NaiveDate,
        /// 限定设备（可重复；缺省为全部）
        #[arg(long = "device")]
        devices: Vec<i64>,
    },
}

#[derive(Args, Debug)]
struct CsvArgs {
    /// CSV 文件路径
    file: PathBuf,
    /// 分隔符: , ; tab |（缺省取配置）
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<Delimiter>,
    /// 首行不是表头
    #[arg(long)]
    no_header: bool,
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// 预览（不写入）
    Preview {
        #[command(flatten)]
        csv: CsvArgs,
    },
    /// 执行导入
    Run {
        #[command(flatten)]
        csv: CsvArgs,
        /// 导入名称
        #[arg(long)]
        name: Option<String>,
        /// 默认设备 id
        #[arg(long)]
        device: Option<i64>,
        /// 默认单位
        #[arg(long)]
        unit: Option<String>,
        /// 默认操作员
        #[arg(long)]
        operator: Option<String>,
        /// 导入后列出本次创建的记录
        #[arg(long)]
        show_records: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 输出全部配置（JSON）
    Show,
    /// 写入配置项
    Set { key: String, value: String },
}

// ==========================================
// 参数解析
// ==========================================

fn parse_device_type(s: &str) -> Result<DeviceType, String> {
    DeviceType::from_db_str(s).ok_or_else(|| {
        let names: Vec<&str> = DeviceType::ALL.iter().map(|t| t.to_db_str()).collect();
        format!("unknown device type {:?}, expected one of: {}", s, names.join(", "))
    })
}

fn parse_delimiter(s: &str) -> Result<Delimiter, String> {
    Delimiter::parse(s).ok_or_else(|| format!("unsupported delimiter {:?}", s))
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("{}: {}", s, e))
}

// ==========================================
// 主入口
// ==========================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::debug!(db_path = %db_path, "使用数据库");

    let state = AppState::new(&db_path).with_context(|| format!("cannot open {}", db_path))?;

    match cli.command {
        Command::Device(cmd) => run_device(&state, cmd),
        Command::Record(cmd) => run_record(&state, cmd),
        Command::Import(cmd) => run_import(&state, cmd),
        Command::Config(cmd) => run_config(&state, cmd),
    }
}

fn run_device(state: &AppState, cmd: DeviceCommand) -> Result<()> {
    let api = &state.device_api;
    match cmd {
        DeviceCommand::Add {
            name,
            serial,
            device_type,
            unit,
            min,
            max,
            manufacturer,
            model,
            location,
            calibrated,
            interval,
        } => {
            let mut new_device = NewDevice::new(&name, &serial, device_type);
            new_device.min_range = min;
            new_device.max_range = max;
            if let Some(unit) = unit.as_deref() {
                new_device = new_device.with_unit(unit);
            }
            if let Some(date) = calibrated {
                new_device = new_device.with_calibration(date, interval);
            } else {
                new_device.calibration_interval = interval;
            }
            new_device.manufacturer = manufacturer;
            new_device.model = model;
            new_device.location = location;

            let device = api.register_device(&new_device)?;
            println!("Registered device #{}: {}", device.id, device);
        }
        DeviceCommand::List { all } => {
            for device in api.list_devices(all)? {
                print_device_line(&device);
            }
        }
        DeviceCommand::Show { id } => {
            let device = api.get_device(id)?;
            let stats = api.device_stats(id)?;
            println!("{}", serde_json::to_string_pretty(&device)?);
            println!("Total records: {}", stats.record_count);
            match stats.last_measurement_date {
                Some(date) => println!("Last measurement: {}", date),
                None => println!("Last measurement: -"),
            }
        }
        DeviceCommand::Archive { id, restore } => {
            if restore {
                api.restore_device(id)?;
                println!("Device #{} restored", id);
            } else {
                api.archive_device(id)?;
                println!("Device #{} archived", id);
            }
        }
        DeviceCommand::Calibrate { id, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let device = api.record_calibration(id, date)?;
            match device.next_calibration_date {
                Some(next) => println!("{} calibrated on {}, next due {}", device, date, next),
                None => println!("{} calibrated on {}", device, date),
            }
        }
        DeviceCommand::Due { date } => {
            let today = date.unwrap_or_else(|| Utc::now().date_naive());
            for device in api.calibration_due(today)? {
                print_device_line(&device);
            }
        }
        DeviceCommand::Report { id } => {
            let report = api.device_report(id, Utc::now().naive_utc())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn run_record(state: &AppState, cmd: RecordCommand) -> Result<()> {
    let api = &state.measurement_api;
    match cmd {
        RecordCommand::Add {
            device,
            value,
            date,
            unit,
            operator,
            notes,
            temperature,
            humidity,
            batch,
        } => {
            let measurement_date = match date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                Some(raw) => Some(normalize_date(raw).map_err(|e| anyhow!(e.to_string()))?),
                None => None,
            };
            let entry = ManualEntry {
                device_id: device,
                measurement_date,
                value,
                unit,
                operator,
                notes,
                temperature,
                humidity,
                batch_id: batch,
            };
            let record = api.record_measurement(&entry)?;
            print_record_line(&record);
        }
        RecordCommand::List {
            device,
            session,
            limit,
        } => {
            let records = match (device, session) {
                (Some(device_id), _) => state.device_api.device_records(device_id)?,
                (None, Some(session_id)) => api.session_records(&session_id)?,
                (None, None) => api.recent_records(limit)?,
            };
            for record in records.iter().take(limit.max(0) as usize) {
                print_record_line(record);
            }
        }
        RecordCommand::Validate { id, by } => {
            let record = api.validate_record(id, &by)?;
            println!("{} validated by {}", record.name, by);
        }
        RecordCommand::Invalidate { id } => {
            let record = api.invalidate_record(id)?;
            println!("{} validation removed", record.name);
        }
        RecordCommand::Report { from, to, devices } => {
            let groups = api.analysis_report(from, to, &devices)?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }
    Ok(())
}

fn run_import(state: &AppState, cmd: ImportCommand) -> Result<()> {
    let api = &state.import_api;
    match cmd {
        ImportCommand::Preview { csv } => {
            let mut wizard = api.new_wizard();
            load_csv(&mut wizard, &csv)?;
            api.action_preview(&mut wizard)?;
            println!("{}", wizard.preview_data.unwrap_or_default());
        }
        ImportCommand::Run {
            csv,
            name,
            device,
            unit,
            operator,
            show_records,
        } => {
            let mut wizard = api.new_wizard();
            load_csv(&mut wizard, &csv)?;
            if let Some(name) = name {
                wizard.name = name;
            }
            wizard.device_id = device;
            wizard.unit = unit;
            wizard.operator = operator;

            api.action_import(&mut wizard)?;
            println!("{}", wizard.import_summary.as_deref().unwrap_or_default());

            if show_records {
                println!();
                for record in api.action_view_imported_records(&wizard)? {
                    print_record_line(&record);
                }
            }
        }
    }
    Ok(())
}

fn run_config(state: &AppState, cmd: ConfigCommand) -> Result<()> {
    let manager = &state.config_manager;
    match cmd {
        ConfigCommand::Show => {
            let snapshot = manager
                .get_config_snapshot()
                .map_err(|e| anyhow!(e.to_string()))?;
            println!("{}", snapshot);
        }
        ConfigCommand::Set { key, value } => {
            if key.trim().is_empty() {
                bail!("configuration key must not be empty");
            }
            manager
                .set_global_config_value(key.trim(), &value)
                .map_err(|e| anyhow!(e.to_string()))?;
            println!("{} = {}", key.trim(), value);
        }
    }
    Ok(())
}

fn load_csv(wizard: &mut measurement_data_mgmt::ImportWizard, csv: &CsvArgs) -> Result<()> {
    let bytes = std::fs::read(&csv.file)
        .with_context(|| format!("cannot read {}", csv.file.display()))?;
    let filename = csv
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| csv.file.display().to_string());

    wizard.filename = Some(filename);
    wizard.csv_file = Some(bytes);
    if let Some(delimiter) = csv.delimiter {
        wizard.delimiter = delimiter;
    }
    if csv.no_header {
        wizard.has_header = false;
    }
    Ok(())
}

fn print_device_line(device: &Device) {
    println!(
        "#{:<4} {:<24} {:<16} {:<12} unit={:<6} next_calibration={}{}",
        device.id,
        device.name,
        device.serial_number,
        device.device_type,
        device.measurement_unit.as_deref().unwrap_or("-"),
        device
            .next_calibration_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        if device.active { "" } else { " [archived]" }
    );
}

fn print_record_line(record: &MeasurementRecord) {
    println!(
        "{} device=#{} {} {} {} [{}]{}",
        record.name,
        record.device_id,
        record.measurement_date,
        record.value,
        record.unit,
        record.quality_status,
        if record.is_validated { " validated" } else { "" }
    );
}
