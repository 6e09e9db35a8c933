// ==========================================
// 船期延误追踪系统 - 日志系统
// ==========================================
// 基于 tracing / tracing-subscriber
// 约定: 管道阶段用结构化字段, 承运人失败必须记名
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=vessel_delay_report=debug 可观察缓存命中与延迟
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // 单机单操作员场景: 紧凑格式, 不带线程号
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// 初始化测试环境的日志系统 (重复调用安全)
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
