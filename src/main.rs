// ==========================================
// 船期延误追踪系统 - 主入口
// ==========================================
// 流程: 配置 → 对照表 → 主表 → 管道 → 报告
// 致命错误仅限启动阶段 (配置/主表不可加载);
// 承运人级故障由编排器记名吞掉
// ==========================================

use chrono::Local;
use std::path::Path;
use vessel_delay_report::config::ReportConfig;
use vessel_delay_report::engine::{PipelineOrchestrator, PipelineRun};
use vessel_delay_report::importer::{Crosswalks, SheetLoader};
use vessel_delay_report::report::ReportWriter;
use vessel_delay_report::logging;

// 单承运人逐条查询, 无并发诉求: 单线程运行时足够
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", vessel_delay_report::APP_NAME);
    tracing::info!("系统版本: {}", vessel_delay_report::VERSION);
    tracing::info!("==================================================");

    // 配置文件路径可由首个参数覆盖
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/config.json".to_string());
    tracing::info!("使用配置: {}", config_path);
    let config = ReportConfig::load(&config_path)?;

    // 静态对照表 (启动时一次性加载)
    let crosswalks = Crosswalks::load(&config.data_dir)?;

    // 主追踪表: 取最新日期命名的工作表
    let (sheet, mut master) = SheetLoader::load_master(Path::new(&config.delay_filename))?;
    crosswalks.assign_carriers(&mut master);
    tracing::info!(sheet = %sheet, lines = master.len(), "主表就绪");

    // 运行上下文与管道
    let today = Local::now().date_naive();
    let run = PipelineRun::new(&config.responses_dir, today, config.delay_interval());
    let orchestrator = PipelineOrchestrator::from_config(&config, &crosswalks)?;
    let report = orchestrator.execute(&run, &mut master).await?;

    for outcome in &report.outcomes {
        match &outcome.error {
            None => tracing::info!(
                carrier = %outcome.carrier,
                lines = outcome.lines,
                queries = outcome.queries,
                records = outcome.records,
                matched = outcome.matched,
                "承运人完成"
            ),
            Some(error) => tracing::warn!(
                carrier = %outcome.carrier,
                error = %error,
                "承运人失败 (行保持空更新)"
            ),
        }
    }

    // 报告输出
    let path = ReportWriter::write(&config.output_dir, today, &master)?;
    tracing::info!(path = %path.display(), "延误报告已生成, 本次运行结束");
    Ok(())
}
