// ==========================================
// 船期延误追踪系统 - BigSchedules 适配器
// ==========================================
// 数据源: BigSchedules 门户 HTML 页面
// 阶段 1: 静态 UN/LOCODE → 港口全名对照, 无远程解析
// 阶段 3: 逐周时间窗查询 (窗口序号进入缓存键)
// 阶段 4: 声明式 "表格形状 → 字段行" 映射提取;
//        未识别形状显式报错, 不做猜测回退
// ==========================================

use crate::cache::response_cache::{CachedPayload, ResponseCache};
use crate::carrier::error::{CarrierError, CarrierResult};
use crate::carrier::html::{cell_texts, row_blocks, table_inner};
use crate::carrier::location::{write_exceptions, LocationMap};
use crate::carrier::{dedup_soonest_eta, CarrierAdapter, ExtractionContext};
use crate::domain::shipment::{RouteQuery, ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use crate::engine::query_planner::QueryPlanner;
use crate::engine::run_context::PipelineRun;
use crate::importer::file_parser::parse_date_flex;
use crate::net::http::PortalClient;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;

const SEARCH_URL: &str = "https://www.bigschedules.com/schedule/search";
const TABLE_MARKER: &str = r#"<table class="schedule-results""#;

const PAGE_HEADERS: &[(&str, &str)] = &[
    ("Accept", "text/html,application/xhtml+xml"),
    ("Referer", "https://www.bigschedules.com/"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Sec-Fetch-Mode", "navigate"),
];

// ==========================================
// 表格形状 → 字段行映射
// ==========================================
// 门户按路线类型渲染不同行数的结果表; 每种形状的字段行
// 位置固定。首列为字段标签, 其后每列一条航线。
#[derive(Debug, Clone, Copy)]
struct FieldRows {
    vessel: usize,
    voyage: usize,
    etd: usize,
    eta: usize,
}

/// 按总行数识别表格形状
///
/// 22 行: 含中转段的全量表; 18 行: 无中转段; 10 行: 直航简表
fn field_rows_for(row_count: usize) -> Option<FieldRows> {
    match row_count {
        22 => Some(FieldRows {
            vessel: 2,
            voyage: 3,
            etd: 8,
            eta: 20,
        }),
        18 => Some(FieldRows {
            vessel: 2,
            voyage: 3,
            etd: 8,
            eta: 16,
        }),
        10 => Some(FieldRows {
            vessel: 2,
            voyage: 3,
            etd: 4,
            eta: 8,
        }),
        _ => None,
    }
}

// ==========================================
// BigSchedulesAdapter
// ==========================================
pub struct BigSchedulesAdapter {
    client: Arc<PortalClient>,
    /// UN/LOCODE → 港口全名 (UNLOCODE 码表, 搜索参数用)
    port_names: HashMap<String, String>,
    /// 逐周查询窗口数
    search_weeks: u32,
}

impl BigSchedulesAdapter {
    pub fn new(
        client: Arc<PortalClient>,
        port_names: HashMap<String, String>,
        search_weeks: u32,
    ) -> Self {
        Self {
            client,
            port_names,
            search_weeks: search_weeks.max(1),
        }
    }

    /// 单页 HTML → 船期记录 (未去重)
    ///
    /// 规范港口取自查询本身 (页面不回显代码)
    fn extract_page(query: &RouteQuery, body: &str) -> CarrierResult<Vec<ScheduleRecord>> {
        let table = match table_inner(body, TABLE_MARKER) {
            Some(table) => table,
            // 无结果页: 合法空结果, 向后传播
            None => return Ok(Vec::new()),
        };

        let rows: Vec<Vec<String>> = row_blocks(table).iter().map(|r| cell_texts(r)).collect();
        let shape = field_rows_for(rows.len())
            .ok_or(CarrierError::UnrecognizedShape { rows: rows.len() })?;

        fn field(rows: &[Vec<String>], row: usize, col: usize) -> Option<&str> {
            rows.get(row)
                .and_then(|cells| cells.get(col))
                .map(String::as_str)
                .filter(|s| !s.is_empty())
        }

        // 首列为字段标签, 航线从第 1 列起
        let sailing_count = rows.first().map(|cells| cells.len()).unwrap_or(0);
        let mut records = Vec::new();
        for col in 1..sailing_count {
            // 防御性跳过: 缺船名/航次的航线列
            let (Some(vessel), Some(voyage)) = (
                field(&rows, shape.vessel, col),
                field(&rows, shape.voyage, col),
            ) else {
                continue;
            };

            records.push(ScheduleRecord {
                origin_port: query.route.origin.clone(),
                destination_port: query.route.destination.clone(),
                vessel: vessel.to_string(),
                voyage: voyage.to_string(),
                resolved_etd: field(&rows, shape.etd, col).and_then(parse_date_flex),
                resolved_eta: field(&rows, shape.eta, col).and_then(parse_date_flex),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl CarrierAdapter for BigSchedulesAdapter {
    fn carrier(&self) -> Carrier {
        Carrier::BigSchedules
    }

    async fn resolve_locations(
        &self,
        _run: &PipelineRun,
        cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> CarrierResult<LocationMap> {
        // 静态解析: UN/LOCODE → 全名, 码表未命中即未解析
        let ports: BTreeSet<String> = lines
            .iter()
            .flat_map(|line| [line.origin_port.clone(), line.destination_port.clone()])
            .flatten()
            .collect();

        let mut map = LocationMap::default();
        let mut unresolved = BTreeSet::new();
        for port in ports {
            match self.port_names.get(&port) {
                Some(name) => map.insert(&port, name.clone()),
                None => {
                    unresolved.insert(port);
                }
            }
        }

        write_exceptions(cache, Carrier::BigSchedules, &unresolved)?;
        info!(
            resolved = map.len(),
            unresolved = unresolved.len(),
            "BigSchedules 港名对照完成"
        );
        Ok(map)
    }

    fn plan(&self, lines: &[ShipmentLine], locations: &LocationMap) -> Vec<RouteQuery> {
        // 基础路线集按窗口展开: 每路线 search_weeks 条查询
        QueryPlanner::plan(lines, locations)
            .into_iter()
            .flat_map(|query| {
                (0..self.search_weeks).map(move |week| RouteQuery {
                    window: Some(week),
                    ..query.clone()
                })
            })
            .collect()
    }

    async fn fetch(
        &self,
        run: &PipelineRun,
        cache: &ResponseCache,
        query: &RouteQuery,
    ) -> CarrierResult<CachedPayload> {
        let week = query.window.unwrap_or(0);
        let date = (run.today + Duration::weeks(i64::from(week)))
            .format("%Y-%m-%d")
            .to_string();
        let url = reqwest::Url::parse_with_params(
            SEARCH_URL,
            &[
                ("from", query.origin_code.as_str()),
                ("to", query.destination_code.as_str()),
                ("date", date.as_str()),
            ],
        )
        .map_err(|e| CarrierError::UrlBuild(e.to_string()))?;

        let file_name = query.cache_file_name(Carrier::BigSchedules, "html");
        let client = self.client.clone();
        cache
            .get_or_fetch(&file_name, move || async move {
                Ok(client.get_text(url.as_str(), PAGE_HEADERS).await?)
            })
            .await
    }

    fn parse(
        &self,
        _ctx: &ExtractionContext<'_>,
        payloads: &[(RouteQuery, CachedPayload)],
    ) -> CarrierResult<Vec<ScheduleRecord>> {
        let mut records = Vec::new();
        for (query, payload) in payloads {
            if payload.is_empty() {
                continue;
            }
            records.extend(Self::extract_page(query, &payload.body)?);
        }
        Ok(dedup_soonest_eta(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shipment::RouteKey;
    use chrono::NaiveDate;

    fn query() -> RouteQuery {
        RouteQuery {
            route: RouteKey {
                origin: "SGSIN".to_string(),
                destination: "CNSHA".to_string(),
            },
            origin_code: "Singapore".to_string(),
            destination_code: "Shanghai, SH".to_string(),
            window: Some(0),
        }
    }

    /// 构造 10 行直航简表: 船名行 2, 航次行 3, ETD 行 4, ETA 行 8
    fn direct_table(columns: &[(&str, &str, &str, &str)]) -> String {
        let mut rows = vec![String::new(); 10];
        let labels = [
            "Route", "Service", "Vessel", "Voyage", "ETD", "Cutoff", "Terminal", "Transit",
            "ETA", "Notes",
        ];
        for (i, row) in rows.iter_mut().enumerate() {
            row.push_str(&format!("<tr><td>{}</td>", labels[i]));
            for (vessel, voyage, etd, eta) in columns {
                let cell = match i {
                    2 => vessel,
                    3 => voyage,
                    4 => etd,
                    8 => eta,
                    _ => "-",
                };
                row.push_str(&format!("<td>{}</td>", cell));
            }
            row.push_str("</tr>");
        }
        format!(
            r#"<html><table class="schedule-results">{}</table></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn test_extract_direct_table() {
        let body = direct_table(&[
            ("EVER GIVEN", "021E", "2024-01-12", "2024-01-20"),
            ("", "022E", "2024-01-19", "2024-01-27"), // 缺船名, 跳过
        ]);
        let records = BigSchedulesAdapter::extract_page(&query(), &body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vessel, "EVER GIVEN");
        assert_eq!(records[0].origin_port, "SGSIN");
        assert_eq!(
            records[0].resolved_etd,
            Some(NaiveDate::from_ymd_opt(2024, 1, 12).unwrap())
        );
        assert_eq!(
            records[0].resolved_eta,
            Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())
        );
    }

    #[test]
    fn test_unrecognized_shape_is_error() {
        // 7 行表: 不在形状映射中
        let mut body = String::from(r#"<table class="schedule-results">"#);
        for _ in 0..7 {
            body.push_str("<tr><td>x</td><td>y</td></tr>");
        }
        body.push_str("</table>");

        let result = BigSchedulesAdapter::extract_page(&query(), &body);
        assert!(matches!(
            result,
            Err(CarrierError::UnrecognizedShape { rows: 7 })
        ));
    }

    #[test]
    fn test_missing_table_is_empty_result() {
        let records =
            BigSchedulesAdapter::extract_page(&query(), "<html><body>no results</body></html>")
                .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_sentinel_dates_left_unset() {
        let body = direct_table(&[("EVER GIVEN", "021E", "TBA", "2024-01-20")]);
        let records = BigSchedulesAdapter::extract_page(&query(), &body).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].resolved_etd.is_none());
        assert!(records[0].resolved_eta.is_some());
    }
}
