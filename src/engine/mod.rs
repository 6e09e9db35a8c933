// ==========================================
// 船期延误追踪系统 - 引擎层
// ==========================================
// 职责: 查询规划 / 对账合并 / 延误计算 / 管道编排
// 红线: 所有失败路径必须给出可解释的记名原因
// ==========================================

pub mod delta;
pub mod merger;
pub mod orchestrator;
pub mod query_planner;
pub mod run_context;

// 重导出核心引擎
pub use delta::DeltaEngine;
pub use merger::{MergeError, MergeOutcome, ReconciliationMerger};
pub use orchestrator::{CarrierOutcome, PipelineOrchestrator, PipelineReport};
pub use query_planner::QueryPlanner;
pub use run_context::PipelineRun;
