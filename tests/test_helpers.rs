// ==========================================
// 测试辅助
// ==========================================
// 职责: 主表行构造 + 可编排的桩承运人适配器
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vessel_delay_report::cache::{CachedPayload, ResponseCache};
use vessel_delay_report::carrier::{
    dedup_soonest_eta, CarrierAdapter, CarrierError, ExtractionContext, LocationMap,
};
use vessel_delay_report::domain::{Carrier, RouteQuery, ScheduleRecord, ShipmentLine};
use vessel_delay_report::engine::{PipelineRun, QueryPlanner};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 构造一条主表行
pub fn line(
    row_no: usize,
    agent: &str,
    carrier: Option<Carrier>,
    origin: &str,
    destination: &str,
    vessel: &str,
    voyage: &str,
) -> ShipmentLine {
    let mut line = ShipmentLine::new(row_no);
    line.fwd_agent = Some(agent.to_string());
    line.carrier = carrier;
    line.origin_port = Some(origin.to_string());
    line.destination_port = Some(destination.to_string());
    line.vessel = Some(vessel.to_string());
    line.voyage = Some(voyage.to_string());
    line
}

pub fn record(
    origin: &str,
    destination: &str,
    vessel: &str,
    voyage: &str,
    etd: Option<&str>,
    eta: Option<&str>,
) -> ScheduleRecord {
    ScheduleRecord {
        origin_port: origin.to_string(),
        destination_port: destination.to_string(),
        vessel: vessel.to_string(),
        voyage: voyage.to_string(),
        resolved_etd: etd.map(date),
        resolved_eta: eta.map(date),
    }
}

// ==========================================
// StubAdapter - 可编排的桩承运人
// ==========================================
// 位置解析: 恒等映射 (代码 = 规范代码)
// 抓取: 走真实 ResponseCache, 载荷为 JSON 序列化的记录集
// 解析: 反序列化载荷 + 标准去重
pub struct StubAdapter {
    pub carrier: Carrier,
    /// 路线串 ("SGSIN-CNSHA") → 该路线的记录集
    pub bodies: HashMap<String, Vec<ScheduleRecord>>,
    /// 指定路线的 fetch 直接报错 (单查询隔离场景)
    pub fail_fetch_route: Option<String>,
    /// parse 阶段整体报错 (承运人隔离场景)
    pub fail_parse: bool,
    /// 真实网络抓取计数 (缓存命中不计)
    pub fetch_calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn new(carrier: Carrier) -> Self {
        Self {
            carrier,
            bodies: HashMap::new(),
            fail_fetch_route: None,
            fail_parse: false,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_route(mut self, route: &str, records: Vec<ScheduleRecord>) -> Self {
        self.bodies.insert(route.to_string(), records);
        self
    }
}

#[async_trait]
impl CarrierAdapter for StubAdapter {
    fn carrier(&self) -> Carrier {
        self.carrier
    }

    async fn resolve_locations(
        &self,
        _run: &PipelineRun,
        _cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> Result<LocationMap, CarrierError> {
        let mut map = LocationMap::default();
        for line in lines {
            for port in [line.origin_port.as_deref(), line.destination_port.as_deref()] {
                if let Some(port) = port {
                    map.insert(port, port.to_string());
                }
            }
        }
        Ok(map)
    }

    fn plan(&self, lines: &[ShipmentLine], locations: &LocationMap) -> Vec<RouteQuery> {
        QueryPlanner::plan(lines, locations)
    }

    async fn fetch(
        &self,
        _run: &PipelineRun,
        cache: &ResponseCache,
        query: &RouteQuery,
    ) -> Result<CachedPayload, CarrierError> {
        let route = query.route.to_string();
        if self.fail_fetch_route.as_deref() == Some(route.as_str()) {
            return Err(CarrierError::UrlBuild(format!("桩故障: {}", route)));
        }

        let body = self
            .bodies
            .get(&route)
            .map(|records| serde_json::to_string(records).unwrap())
            .unwrap_or_default();
        let calls = self.fetch_calls.clone();
        cache
            .get_or_fetch(
                &query.cache_file_name(self.carrier, "json"),
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CarrierError>(body)
                },
            )
            .await
    }

    fn parse(
        &self,
        _ctx: &ExtractionContext<'_>,
        payloads: &[(RouteQuery, CachedPayload)],
    ) -> Result<Vec<ScheduleRecord>, CarrierError> {
        if self.fail_parse {
            return Err(CarrierError::Parse {
                carrier: self.carrier.as_str().to_string(),
                message: "桩解析故障".to_string(),
            });
        }

        let mut records = Vec::new();
        for (_query, payload) in payloads {
            if payload.is_empty() {
                continue;
            }
            let parsed: Vec<ScheduleRecord> =
                serde_json::from_str(&payload.body).map_err(|e| CarrierError::Parse {
                    carrier: self.carrier.as_str().to_string(),
                    message: e.to_string(),
                })?;
            records.extend(parsed);
        }
        Ok(dedup_soonest_eta(records))
    }
}
