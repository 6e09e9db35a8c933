// ==========================================
// 船期延误追踪系统 - MSC 适配器
// ==========================================
// 数据源: MSC 官网 JSON API
// 阶段 1: autocomplete API 解析港名 → 位置 ID (当日工件)
// 阶段 3: search API 按路线查询, WeeksOut 可配置
// 阶段 4: Sailings 数组遍历, 最早 ETA 去重
// ==========================================

use crate::cache::response_cache::{CachedPayload, ResponseCache};
use crate::carrier::error::{CarrierError, CarrierResult};
use crate::carrier::location::{collect_requests, LocationMap, LocationResolver};
use crate::carrier::{dedup_soonest_eta, CarrierAdapter, ExtractionContext};
use crate::domain::shipment::{RouteQuery, ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use crate::engine::query_planner::QueryPlanner;
use crate::engine::run_context::PipelineRun;
use crate::importer::file_parser::parse_date_flex;
use crate::net::http::PortalClient;
use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const AUTOCOMPLETE_URL: &str = "https://www.msc.com/api/schedules/autocomplete";
const SEARCH_URL: &str = "https://www.msc.com/api/schedules/search";

// 浏览器伪装的附加请求头 (与基础 UA 叠加)
const API_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json"),
    ("Content-Type", "application/json"),
    ("Referer", "https://www.msc.com/search-schedules"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Dest", "empty"),
];

// ==========================================
// 响应结构 (仅取需要的字段)
// ==========================================

#[derive(Debug, Deserialize)]
struct AutocompleteEntry {
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Sailings", default)]
    sailings: Vec<Sailing>,
}

#[derive(Debug, Deserialize)]
struct Sailing {
    #[serde(rename = "PortOfLoadId")]
    port_of_load_id: Option<i64>,
    #[serde(rename = "PortOfDischargeId")]
    port_of_discharge_id: Option<i64>,
    #[serde(rename = "VesselName")]
    vessel_name: Option<String>,
    #[serde(rename = "VoyageNum")]
    voyage_num: Option<String>,
    #[serde(rename = "NextETD")]
    next_etd: Option<String>,
    #[serde(rename = "ArrivalDate")]
    arrival_date: Option<String>,
}

// ==========================================
// MscAdapter
// ==========================================
pub struct MscAdapter {
    client: Arc<PortalClient>,
    /// UN/LOCODE → MSC 港名 (静态对照表)
    port_mapping: HashMap<String, String>,
    weeks_out: u32,
}

impl MscAdapter {
    pub fn new(
        client: Arc<PortalClient>,
        port_mapping: HashMap<String, String>,
        weeks_out: u32,
    ) -> Self {
        Self {
            client,
            port_mapping,
            weeks_out,
        }
    }

    /// autocomplete 响应 → 首条位置 ID
    fn first_location_id(body: &str) -> CarrierResult<Option<String>> {
        let entries: Vec<AutocompleteEntry> =
            serde_json::from_str(body).map_err(|e| CarrierError::Parse {
                carrier: Carrier::Msc.as_str().to_string(),
                message: format!("autocomplete 响应非法: {}", e),
            })?;
        Ok(entries
            .first()
            .and_then(|entry| entry.id)
            .map(|id| id.to_string()))
    }

    /// 单份 search 响应 → 船期记录 (未去重)
    fn extract_sailings(
        body: &str,
        locations: &LocationMap,
    ) -> CarrierResult<Vec<ScheduleRecord>> {
        // 响应外层是数组, 首元素携带 Sailings
        let responses: Vec<SearchResponse> =
            serde_json::from_str(body).map_err(|e| CarrierError::Parse {
                carrier: Carrier::Msc.as_str().to_string(),
                message: format!("search 响应非法: {}", e),
            })?;

        let mut records = Vec::new();
        let sailings = match responses.first() {
            Some(response) => &response.sailings,
            None => return Ok(records),
        };

        for sailing in sailings {
            // 防御性跳过: 缺船名/航次/港口 ID 的航线
            let (Some(vessel), Some(voyage)) = (&sailing.vessel_name, &sailing.voyage_num)
            else {
                continue;
            };
            let (Some(pol_id), Some(pod_id)) =
                (sailing.port_of_load_id, sailing.port_of_discharge_id)
            else {
                continue;
            };
            // 位置 ID 反查规范港口; 未知 ID 同样跳过
            let (Some(origin), Some(destination)) = (
                locations.canonical_for(&pol_id.to_string()),
                locations.canonical_for(&pod_id.to_string()),
            ) else {
                continue;
            };

            records.push(ScheduleRecord {
                origin_port: origin.clone(),
                destination_port: destination.clone(),
                vessel: vessel.clone(),
                voyage: voyage.clone(),
                resolved_etd: sailing.next_etd.as_deref().and_then(parse_date_flex),
                resolved_eta: sailing.arrival_date.as_deref().and_then(parse_date_flex),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl CarrierAdapter for MscAdapter {
    fn carrier(&self) -> Carrier {
        Carrier::Msc
    }

    async fn resolve_locations(
        &self,
        _run: &PipelineRun,
        cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> CarrierResult<LocationMap> {
        let ports = lines
            .iter()
            .flat_map(|line| [line.origin_port.clone(), line.destination_port.clone()])
            .flatten();
        let requests = collect_requests(ports, &self.port_mapping);

        let client = self.client.clone();
        LocationResolver::new(Carrier::Msc)
            .resolve(cache, &requests, move |name| {
                let client = client.clone();
                async move {
                    let url = reqwest::Url::parse_with_params(
                        AUTOCOMPLETE_URL,
                        &[("q", name.as_str())],
                    )
                    .map_err(|e| CarrierError::UrlBuild(e.to_string()))?;
                    let body = client.get_text(url.as_str(), API_HEADERS).await?;
                    Self::first_location_id(&body)
                }
            })
            .await
    }

    fn plan(&self, lines: &[ShipmentLine], locations: &LocationMap) -> Vec<RouteQuery> {
        // 单窗查询: WeeksOut 参数覆盖整个搜索窗口
        QueryPlanner::plan(lines, locations)
    }

    async fn fetch(
        &self,
        run: &PipelineRun,
        cache: &ResponseCache,
        query: &RouteQuery,
    ) -> CarrierResult<CachedPayload> {
        // 搜索起点固定为当月首日, 同月内缓存键稳定
        let first_of_month = run.today.with_day(1).unwrap_or(run.today);
        let url = reqwest::Url::parse_with_params(
            SEARCH_URL,
            &[
                ("WeeksOut", self.weeks_out.to_string()),
                ("DirectRoutes", "false".to_string()),
                ("Date", first_of_month.format("%Y-%m-%d").to_string()),
                ("From", query.origin_code.clone()),
                ("To", query.destination_code.clone()),
            ],
        )
        .map_err(|e| CarrierError::UrlBuild(e.to_string()))?;

        let file_name = query.cache_file_name(Carrier::Msc, "json");
        let client = self.client.clone();
        cache
            .get_or_fetch(&file_name, move || async move {
                let body = client.get_text(url.as_str(), API_HEADERS).await?;
                debug!(bytes = body.len(), "MSC search 响应");
                Ok(body)
            })
            .await
    }

    fn parse(
        &self,
        ctx: &ExtractionContext<'_>,
        payloads: &[(RouteQuery, CachedPayload)],
    ) -> CarrierResult<Vec<ScheduleRecord>> {
        let mut records = Vec::new();
        for (_query, payload) in payloads {
            if payload.is_empty() {
                // 空哨兵载荷 (抓取失败或远端无数据) 静默跳过
                continue;
            }
            records.extend(Self::extract_sailings(&payload.body, ctx.locations)?);
        }
        Ok(dedup_soonest_eta(records))
    }
}
