// ==========================================
// 船期延误追踪系统 - 承运人适配层
// ==========================================
// 四阶段提取协议 (适配器能力集):
//   resolve_locations (可选远程) → plan → fetch → parse
// 状态机: INIT → LOCATIONS_RESOLVED → QUERIES_PLANNED
//        → RESPONSES_FETCHED → RECORDS_PARSED → MERGED
// 红线: 任一阶段空结果向后传播为 "无匹配数据", 绝不中止管道
// ==========================================

// 模块声明
pub mod bigschedules;
pub mod error;
pub mod g2ocean;
pub mod html;
pub mod location;
pub mod msc;

// 重导出核心类型
pub use bigschedules::BigSchedulesAdapter;
pub use error::{CarrierError, CarrierResult};
pub use g2ocean::G2OceanAdapter;
pub use location::{LocationMap, LocationResolver};
pub use msc::MscAdapter;

use crate::cache::response_cache::{CachedPayload, ResponseCache};
use crate::domain::shipment::{RouteQuery, ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use crate::engine::run_context::PipelineRun;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

// ==========================================
// ExtractionContext - 解析阶段上下文
// ==========================================
// 适配器 parse 的只读输入: 参考日期, 本承运人行集, 位置映射
pub struct ExtractionContext<'a> {
    pub today: NaiveDate,
    pub lines: &'a [ShipmentLine],
    pub locations: &'a LocationMap,
}

// ==========================================
// CarrierAdapter Trait
// ==========================================
// 实现者: MscAdapter / BigSchedulesAdapter / G2OceanAdapter
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// 所属承运人家族
    fn carrier(&self) -> Carrier;

    /// 阶段 1: 位置解析
    ///
    /// 远程解析承运人 (MSC) 经 LocationResolver 走当日工件;
    /// 静态对照承运人直接由映射表构造, 无网络调用。
    /// 未解析港口记入 "<承运人>_exceptions.txt", 不上抛
    async fn resolve_locations(
        &self,
        run: &PipelineRun,
        cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> CarrierResult<LocationMap>;

    /// 阶段 2: 查询规划
    ///
    /// 基础路线集由 QueryPlanner 归并去重;
    /// 多时间窗承运人在此展开窗口序号
    fn plan(&self, lines: &[ShipmentLine], locations: &LocationMap) -> Vec<RouteQuery>;

    /// 阶段 3: 单查询抓取 (必须经 ResponseCache)
    ///
    /// 失败语义: 调用方将 Err 降级为空哨兵载荷, 单查询失败
    /// 不影响同承运人其余查询
    async fn fetch(
        &self,
        run: &PipelineRun,
        cache: &ResponseCache,
        query: &RouteQuery,
    ) -> CarrierResult<CachedPayload>;

    /// 阶段 4: 解析为规范船期记录
    ///
    /// 要求: 缺船名/航次的航线防御性跳过; 同复合键多航线
    /// 取最早 ETA 一条后去重; 空载荷静默跳过
    fn parse(
        &self,
        ctx: &ExtractionContext<'_>,
        payloads: &[(RouteQuery, CachedPayload)],
    ) -> CarrierResult<Vec<ScheduleRecord>>;
}

/// 同复合键多航线去重: 保留最早 ETA 一条
///
/// 无 ETA 的记录视为最晚; 输出按复合键稳定排序,
/// 保证同日重放产生逐字节一致的记录集
pub fn dedup_soonest_eta(records: Vec<ScheduleRecord>) -> Vec<ScheduleRecord> {
    let mut best: BTreeMap<crate::domain::shipment::JoinKey, ScheduleRecord> = BTreeMap::new();
    for record in records {
        let key = record.join_key();
        match best.get(&key) {
            None => {
                best.insert(key, record);
            }
            Some(existing) => {
                let keep_new = match (record.resolved_eta, existing.resolved_eta) {
                    (Some(new), Some(old)) => new < old,
                    (Some(_), None) => true,
                    _ => false,
                };
                if keep_new {
                    best.insert(key, record);
                }
            }
        }
    }
    best.into_values().collect()
}
