// ==========================================
// 船期延误追踪系统 - 管道编排器
// ==========================================
// 职责: 按固定顺序驱动各承运人的四阶段提取协议
// 核心韧性红线: 单承运人内的任何异常都在该承运人边界
//   捕获并记名放行, 绝不影响其他承运人与最终报告
// 主流程: resolve → plan → fetch → parse → merge,
//   全部承运人完成后 DeltaEngine 收尾一次
// ==========================================

use crate::cache::response_cache::{CachedPayload, ResponseCache};
use crate::carrier::{
    BigSchedulesAdapter, CarrierAdapter, ExtractionContext, G2OceanAdapter, MscAdapter,
};
use crate::config::report_config::ReportConfig;
use crate::domain::shipment::{ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use crate::engine::delta::DeltaEngine;
use crate::engine::merger::ReconciliationMerger;
use crate::engine::run_context::PipelineRun;
use crate::importer::crosswalk::Crosswalks;
use crate::net::http::{HttpError, PortalClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// CarrierOutcome - 单承运人运行结果
// ==========================================
#[derive(Debug, Clone)]
pub struct CarrierOutcome {
    pub carrier: Carrier,
    pub lines: usize,
    pub queries: usize,
    pub records: usize,
    pub matched: usize,
    /// 失败承运人的记名原因 (成功为 None)
    pub error: Option<String>,
}

/// 全管道运行汇总
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<CarrierOutcome>,
}

impl PipelineReport {
    pub fn failed_carriers(&self) -> Vec<Carrier> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.carrier)
            .collect()
    }
}

// ==========================================
// PipelineOrchestrator - 管道编排器
// ==========================================
pub struct PipelineOrchestrator {
    adapters: Vec<Box<dyn CarrierAdapter>>,
    delta: DeltaEngine,
}

impl PipelineOrchestrator {
    pub fn new(adapters: Vec<Box<dyn CarrierAdapter>>, delta: DeltaEngine) -> Self {
        Self { adapters, delta }
    }

    /// 按配置装配启用的承运人 (固定顺序)
    pub fn from_config(
        config: &ReportConfig,
        crosswalks: &Crosswalks,
    ) -> Result<Self, HttpError> {
        let client = Arc::new(PortalClient::new()?);

        let mut adapters: Vec<Box<dyn CarrierAdapter>> = Vec::new();
        for carrier in Carrier::PIPELINE_ORDER {
            if !config.carrier_enabled(carrier) {
                info!(carrier = %carrier, "承运人未启用, 跳过");
                continue;
            }
            adapters.push(match carrier {
                Carrier::BigSchedules => Box::new(BigSchedulesAdapter::new(
                    client.clone(),
                    crosswalks.unlocode_names.clone(),
                    config.bigschedules_search_weeks,
                )),
                Carrier::Msc => Box::new(MscAdapter::new(
                    client.clone(),
                    crosswalks.msc_ports.clone(),
                    config.msc_weeks_out,
                )),
                Carrier::G2Ocean => Box::new(G2OceanAdapter::new(
                    PathBuf::from(&config.g2_filename),
                    config.g2_skiprows,
                    crosswalks.g2_ports.clone(),
                )),
            });
        }

        Ok(Self::new(
            adapters,
            DeltaEngine::new(config.mask_date_if_bol_present),
        ))
    }

    /// 执行整条管道
    ///
    /// # 参数
    /// - run: 运行上下文 (日期/缓存目录/延迟区间)
    /// - master: 主表, 运行期间由编排器独占
    ///
    /// # 错误
    /// 仅当日缓存目录不可创建时失败 (启动级故障);
    /// 承运人级故障一律记名吞掉
    pub async fn execute(
        &self,
        run: &PipelineRun,
        master: &mut [ShipmentLine],
    ) -> Result<PipelineReport, crate::cache::response_cache::CacheError> {
        let cache = run.open_cache()?;
        info!(
            date = %run.today,
            cache_root = %run.cache_root.display(),
            carriers = self.adapters.len(),
            "开始执行延误对账管道"
        );

        let mut report = PipelineReport::default();
        for adapter in &self.adapters {
            let carrier = adapter.carrier();

            // 本承运人的只读副本 (主表仅在合并时回写)
            let lines: Vec<ShipmentLine> = master
                .iter()
                .filter(|line| line.carrier == Some(carrier))
                .cloned()
                .collect();

            let outcome = match self.run_carrier(adapter.as_ref(), run, &cache, &lines).await {
                Ok((records, queries)) => {
                    // 合并仍在承运人边界内: 键冲突同样记名放行
                    match ReconciliationMerger::merge(master, carrier, &records) {
                        Ok(merged) => CarrierOutcome {
                            carrier,
                            lines: lines.len(),
                            queries,
                            records: records.len(),
                            matched: merged.matched,
                            error: None,
                        },
                        Err(e) => Self::failed_outcome(carrier, lines.len(), e.to_string()),
                    }
                }
                Err(e) => Self::failed_outcome(carrier, lines.len(), format!("{:#}", e)),
            };
            report.outcomes.push(outcome);
        }

        // ==========================================
        // 收尾: 全表延误计算 (含提单日屏蔽)
        // ==========================================
        self.delta.apply(master);

        info!(
            failed = ?report.failed_carriers(),
            "延误对账管道执行完毕"
        );
        Ok(report)
    }

    /// 单承运人四阶段驱动
    async fn run_carrier(
        &self,
        adapter: &dyn CarrierAdapter,
        run: &PipelineRun,
        cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> anyhow::Result<(Vec<ScheduleRecord>, usize)> {
        let carrier = adapter.carrier();
        info!(carrier = %carrier, lines = lines.len(), "开始承运人管道");

        // ==========================================
        // 阶段1: 位置解析
        // ==========================================
        debug!(carrier = %carrier, "阶段1: 位置解析");
        let locations = adapter.resolve_locations(run, cache, lines).await?;

        // ==========================================
        // 阶段2: 查询规划
        // ==========================================
        debug!(carrier = %carrier, "阶段2: 查询规划");
        let queries = adapter.plan(lines, &locations);
        info!(carrier = %carrier, queries = queries.len(), "查询规划完成");

        // ==========================================
        // 阶段3: 逐条抓取 (单查询失败降级为空响应)
        // ==========================================
        debug!(carrier = %carrier, "阶段3: 抓取");
        let mut payloads = Vec::with_capacity(queries.len());
        for query in queries {
            let payload = match adapter.fetch(run, cache, &query).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        carrier = %carrier,
                        route = %query.route,
                        error = %e,
                        "查询抓取失败, 按空响应处理"
                    );
                    CachedPayload::empty()
                }
            };
            payloads.push((query, payload));
        }

        // ==========================================
        // 阶段4: 解析
        // ==========================================
        debug!(carrier = %carrier, "阶段4: 解析");
        let ctx = ExtractionContext {
            today: run.today,
            lines,
            locations: &locations,
        };
        let records = adapter.parse(&ctx, &payloads)?;
        info!(carrier = %carrier, records = records.len(), "解析完成");

        Ok((records, payloads.len()))
    }

    fn failed_outcome(carrier: Carrier, lines: usize, error: String) -> CarrierOutcome {
        // 记名放行: 该承运人的行保持原状, 管道继续
        warn!(carrier = %carrier, error = %error, "承运人管道失败, 忽略并继续");
        CarrierOutcome {
            carrier,
            lines,
            queries: 0,
            records: 0,
            matched: 0,
            error: Some(error),
        }
    }
}
