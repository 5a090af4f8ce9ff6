// ==========================================
// 日志系统初始化
// ==========================================
// 输出: stderr（stdout 留给命令结果）
// 级别: RUST_LOG 优先，缺省为本 crate info、依赖库 warn
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 缺省过滤器
pub const DEFAULT_FILTER: &str = "warn,measurement_data_mgmt=info";

/// 测试过滤器
pub const TEST_FILTER: &str = "warn,measurement_data_mgmt=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 人类可读格式
///
/// # 示例
/// ```no_run
/// use measurement_data_mgmt::logging;
/// logging::init();
/// ```
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// JSON 格式（--json-logs），每行一条，带当前 span 字段
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(true)
        .with_writer(std::io::stderr)
        .init();
}

/// 测试环境；重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(TEST_FILTER))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_parse() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(EnvFilter::try_new(TEST_FILTER).is_ok());
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::debug!(target: "measurement_data_mgmt", "logging ready");
    }
}
