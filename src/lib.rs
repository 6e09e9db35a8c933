// ==========================================
// 船期延误追踪系统 - 核心库
// ==========================================
// 技术栈: Rust + tokio + calamine
// 系统定位: 多数据源船期对账, 生成延误报告
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 数据形状
pub mod domain;

// 缓存层 - 当日响应落盘
pub mod cache;

// 网络层 - HTTP 客户端
pub mod net;

// 承运人适配层 - 四阶段提取协议
pub mod carrier;

// 引擎层 - 规划/合并/延误/编排
pub mod engine;

// 导入层 - 主表与对照表
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 报告层 - 结果输出
pub mod report;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{Carrier, JoinKey, LocationCode, RouteKey, RouteQuery, ScheduleRecord, ShipmentLine};

// 缓存
pub use cache::{CachedPayload, ResponseCache};

// 承运人适配
pub use carrier::{
    BigSchedulesAdapter, CarrierAdapter, CarrierError, G2OceanAdapter, LocationMap,
    LocationResolver, MscAdapter,
};

// 引擎
pub use engine::{
    DeltaEngine, PipelineOrchestrator, PipelineReport, PipelineRun, QueryPlanner,
    ReconciliationMerger,
};

// 导入与配置
pub use config::ReportConfig;
pub use importer::{Crosswalks, SheetLoader};

// 报告
pub use report::ReportWriter;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "船期延误追踪系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
