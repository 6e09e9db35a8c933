// ==========================================
// 船期延误追踪系统 - G2OCEAN 适配器
// ==========================================
// 数据源: 船期表 Excel 文件, 无网络阶段
// 表结构: 跳过表头前 N 行后, 首行为船名表头 (ETA 列 / ETD 列成对),
//        首列为 G2 港名, 行 × 列交叉即日期
// 规则: 缺船名列与 "无日期" 哨兵单元格统一视为未找到
// ==========================================

use crate::cache::response_cache::{CachedPayload, ResponseCache};
use crate::carrier::error::CarrierResult;
use crate::carrier::location::{write_exceptions, LocationMap};
use crate::carrier::{dedup_soonest_eta, CarrierAdapter, ExtractionContext};
use crate::domain::shipment::{RouteQuery, ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use crate::engine::run_context::PipelineRun;
use crate::importer::error::ImportError;
use crate::importer::file_parser::{cell_to_date, cell_to_string, open_xlsx};
use calamine::{Data, Reader};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::{debug, info};

// ==========================================
// ScheduleTable - 船期表内存结构
// ==========================================
struct ScheduleTable {
    /// 船名表头 (数据列, 不含首列港名)
    headers: Vec<String>,
    /// G2 港名 (大写) → 数据行 (与 headers 对齐)
    rows: HashMap<String, Vec<Data>>,
}

impl ScheduleTable {
    /// 定位船名所在列
    ///
    /// 表头包含船名即命中 (原表头常带航线后缀)
    fn vessel_column(&self, vessel: &str) -> Option<usize> {
        let needle = vessel.trim().to_uppercase();
        if needle.is_empty() {
            return None;
        }
        self.headers
            .iter()
            .position(|h| h.to_uppercase().contains(&needle))
    }

    /// 取某港某列的日期; 哨兵值 (TBA 等) 与缺失统一为 None
    fn date_at(&self, port_name: &str, column: usize) -> Option<NaiveDate> {
        self.rows
            .get(&port_name.trim().to_uppercase())
            .and_then(|cells| cells.get(column))
            .and_then(cell_to_date)
    }
}

// ==========================================
// G2OceanAdapter
// ==========================================
pub struct G2OceanAdapter {
    schedule_path: PathBuf,
    skiprows: usize,
    /// UN/LOCODE → G2 港名 (静态对照表)
    port_mapping: HashMap<String, String>,
}

impl G2OceanAdapter {
    pub fn new(
        schedule_path: PathBuf,
        skiprows: usize,
        port_mapping: HashMap<String, String>,
    ) -> Self {
        Self {
            schedule_path,
            skiprows,
            port_mapping,
        }
    }

    /// 加载船期表 (解析阶段调用, 失败在承运人边界内隔离)
    fn load_schedule(&self) -> Result<ScheduleTable, ImportError> {
        let mut workbook = open_xlsx(&self.schedule_path)?;
        let sheet_names = workbook.sheet_names();
        let sheet = sheet_names
            .first()
            .ok_or_else(|| ImportError::ExcelParseError("船期表无工作表".to_string()))?
            .clone();
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows_iter = range.rows().skip(self.skiprows);
        let header_row = rows_iter.next().ok_or_else(|| {
            ImportError::ExcelParseError(format!(
                "船期表跳过 {} 行后无表头行",
                self.skiprows
            ))
        })?;
        // 首列为港名列, 数据列从第 1 列起
        let headers: Vec<String> = header_row
            .iter()
            .skip(1)
            .map(|cell| cell_to_string(cell).unwrap_or_default())
            .collect();

        let mut rows = HashMap::new();
        for row in rows_iter {
            let Some(port_name) = row.first().and_then(cell_to_string) else {
                continue;
            };
            rows.insert(port_name.to_uppercase(), row.iter().skip(1).cloned().collect());
        }

        debug!(
            vessels = headers.len(),
            ports = rows.len(),
            "G2 船期表已加载"
        );
        Ok(ScheduleTable { headers, rows })
    }

    /// 单行查表: (ETD, ETA)
    ///
    /// 船名列即 ETA 列, 其右一列为 ETD (表内成对排布)
    fn lookup_line(
        &self,
        table: &ScheduleTable,
        locations: &LocationMap,
        line: &ShipmentLine,
    ) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let Some(vessel) = line.vessel.as_deref() else {
            return (None, None);
        };
        let Some(eta_column) = table.vessel_column(vessel) else {
            // 船名不在本期船期表: 未找到, 不是错误
            return (None, None);
        };
        let etd_column = eta_column + 1;

        let etd = line
            .origin_port
            .as_deref()
            .and_then(|port| locations.code_for(port))
            .and_then(|name| table.date_at(name, etd_column));
        let eta = line
            .destination_port
            .as_deref()
            .and_then(|port| locations.code_for(port))
            .and_then(|name| table.date_at(name, eta_column));
        (etd, eta)
    }
}

#[async_trait::async_trait]
impl CarrierAdapter for G2OceanAdapter {
    fn carrier(&self) -> Carrier {
        Carrier::G2Ocean
    }

    async fn resolve_locations(
        &self,
        _run: &PipelineRun,
        cache: &ResponseCache,
        lines: &[ShipmentLine],
    ) -> CarrierResult<LocationMap> {
        // 静态对照: UN/LOCODE → G2 港名
        let ports: BTreeSet<String> = lines
            .iter()
            .flat_map(|line| [line.origin_port.clone(), line.destination_port.clone()])
            .flatten()
            .collect();

        let mut map = LocationMap::default();
        let mut unresolved = BTreeSet::new();
        for port in ports {
            match self.port_mapping.get(&port) {
                Some(name) => map.insert(&port, name.clone()),
                None => {
                    unresolved.insert(port);
                }
            }
        }

        write_exceptions(cache, Carrier::G2Ocean, &unresolved)?;
        info!(
            resolved = map.len(),
            unresolved = unresolved.len(),
            "G2 港名对照完成"
        );
        Ok(map)
    }

    fn plan(&self, _lines: &[ShipmentLine], _locations: &LocationMap) -> Vec<RouteQuery> {
        // 文件承运人无抓取阶段
        Vec::new()
    }

    async fn fetch(
        &self,
        _run: &PipelineRun,
        _cache: &ResponseCache,
        _query: &RouteQuery,
    ) -> CarrierResult<CachedPayload> {
        // plan 恒为空, 正常流程不会到达; 返回空哨兵保持契约
        Ok(CachedPayload::empty())
    }

    fn parse(
        &self,
        ctx: &ExtractionContext<'_>,
        _payloads: &[(RouteQuery, CachedPayload)],
    ) -> CarrierResult<Vec<ScheduleRecord>> {
        let table = self.load_schedule()?;

        let mut records = Vec::new();
        for line in ctx.lines {
            let (etd, eta) = self.lookup_line(&table, ctx.locations, line);
            if etd.is_none() && eta.is_none() {
                continue;
            }
            // 复合键取自行本身, 合并时精确回接
            let (Some(origin), Some(destination), Some(vessel)) = (
                line.origin_port.as_deref(),
                line.destination_port.as_deref(),
                line.vessel.as_deref(),
            ) else {
                continue;
            };
            records.push(ScheduleRecord {
                origin_port: origin.to_string(),
                destination_port: destination.to_string(),
                vessel: vessel.to_string(),
                voyage: line.voyage.clone().unwrap_or_default(),
                resolved_etd: etd,
                resolved_eta: eta,
            });
        }
        Ok(dedup_soonest_eta(records))
    }
}
