// ==========================================
// 船期延误追踪系统 - 配置层
// ==========================================
// 职责: 运行配置加载与校验
// 存储: data/config.json
// ==========================================

pub mod report_config;

pub use report_config::{ConfigError, ReportConfig};
