// ==========================================
// 船期延误追踪系统 - 静态对照表
// ==========================================
// 职责: 启动时一次性加载的映射表
//   1. carrier_mapping.json: 货代标签 → 承运人家族 (路由表)
//   2. <承运人> Port Code Mapping.xlsx: UN/LOCODE → 承运人港名
//   3. UNLOCODE CodeListPart*.csv: UN/LOCODE → 港口全名
// ==========================================

use crate::domain::shipment::ShipmentLine;
use crate::domain::types::Carrier;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{cell_to_string, find_column, open_xlsx};
use calamine::Reader;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

// 港口对照工作簿的列名
const COL_PORT_CODE: &[&str] = &["Port Code", "UNLOCODE"];

// ==========================================
// Crosswalks - 对照表集合
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Crosswalks {
    /// 货代标签 (大写) → 承运人家族
    pub family: HashMap<String, Carrier>,
    /// UN/LOCODE → MSC 港名
    pub msc_ports: HashMap<String, String>,
    /// UN/LOCODE → G2 港名
    pub g2_ports: HashMap<String, String>,
    /// UN/LOCODE → 港口全名 (含子区划后缀)
    pub unlocode_names: HashMap<String, String>,
}

impl Crosswalks {
    /// 从数据目录加载全部对照表
    ///
    /// carrier_mapping.json 缺失视为致命 (路由表不可或缺);
    /// 港口对照表缺失仅告警, 相应承运人的港口将整体无法解析
    pub fn load(data_dir: &Path) -> ImportResult<Self> {
        let family = load_family_mapping(&data_dir.join("carrier_mapping.json"))?;
        let msc_ports =
            load_port_mapping(&data_dir.join("MSC Port Code Mapping.xlsx"), "MSC Port Name");
        let g2_ports =
            load_port_mapping(&data_dir.join("G2 Port Code Mapping.xlsx"), "G2 Port Name");
        let unlocode_names = load_unlocode_parts(data_dir)?;

        info!(
            agents = family.len(),
            msc_ports = msc_ports.len(),
            g2_ports = g2_ports.len(),
            unlocode = unlocode_names.len(),
            "静态对照表已加载"
        );

        Ok(Self {
            family,
            msc_ports,
            g2_ports,
            unlocode_names,
        })
    }

    /// 按货代标签为主表行归属承运人家族
    pub fn assign_carriers(&self, lines: &mut [ShipmentLine]) {
        for line in lines.iter_mut() {
            line.carrier = line
                .fwd_agent
                .as_deref()
                .and_then(|agent| self.family.get(&agent.trim().to_uppercase()))
                .copied();
        }
    }
}

/// 加载货代 → 家族路由表
///
/// 文件形如 {"MSC": "MSC", "ANL": "BIGSCHEDULES", "G2OCEAN": "G2OCEAN"}
fn load_family_mapping(path: &Path) -> ImportResult<HashMap<String, Carrier>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    let raw = fs::read_to_string(path)?;
    let parsed: HashMap<String, String> = serde_json::from_str(&raw)?;

    let mut family = HashMap::new();
    for (agent, family_name) in parsed {
        match Carrier::from_str(&family_name) {
            Some(carrier) => {
                family.insert(agent.trim().to_uppercase(), carrier);
            }
            None => {
                // 未知家族的条目跳过, 对应行保持无承运人归属
                warn!(agent = %agent, family = %family_name, "货代映射指向未知承运人家族, 已跳过");
            }
        }
    }
    Ok(family)
}

/// 加载单个承运人的港口对照工作簿
///
/// 缺失或不可解析时返回空表 (该承运人全部港口视为未解析)
fn load_port_mapping(path: &Path, value_column: &str) -> HashMap<String, String> {
    match try_load_port_mapping(path, value_column) {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "港口对照表不可用, 按空表处理");
            HashMap::new()
        }
    }
}

fn try_load_port_mapping(path: &Path, value_column: &str) -> ImportResult<HashMap<String, String>> {
    let mut workbook = open_xlsx(path)?;
    let sheet_names = workbook.sheet_names();
    let sheet = sheet_names
        .first()
        .ok_or_else(|| ImportError::ExcelParseError("港口对照工作簿无工作表".to_string()))?
        .clone();
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| ImportError::ExcelParseError("港口对照工作簿无数据行".to_string()))?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_to_string(cell).unwrap_or_default())
        .collect();

    let code_idx = find_column(&headers, COL_PORT_CODE).ok_or_else(|| {
        ImportError::HeaderNotFound {
            sheet: sheet.clone(),
            column: COL_PORT_CODE[0].to_string(),
        }
    })?;
    let value_idx =
        find_column(&headers, &[value_column]).ok_or_else(|| ImportError::HeaderNotFound {
            sheet: sheet.clone(),
            column: value_column.to_string(),
        })?;

    let mut mapping = HashMap::new();
    for row in rows {
        let code = row.get(code_idx).and_then(cell_to_string);
        let name = row.get(value_idx).and_then(cell_to_string);
        if let (Some(code), Some(name)) = (code, name) {
            mapping.insert(code.to_uppercase(), name);
        }
    }
    Ok(mapping)
}

/// 加载 UN/LOCODE 码表分卷
///
/// 源文件无表头; 取第 1/2/4/5 列 (国家, 港口, 名称, 子区划),
/// uncode = 国家 + 港口; 全名 = 名称 [+ ", " + 子区划]; 首见优先
fn load_unlocode_parts(data_dir: &Path) -> ImportResult<HashMap<String, String>> {
    let mut names = HashMap::new();

    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %data_dir.display(), error = %e, "数据目录不可读, UN/LOCODE 码表为空");
            return Ok(names);
        }
    };

    let mut part_paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains("UNLOCODE CodeListPart"))
                .unwrap_or(false)
        })
        .collect();
    part_paths.sort();

    for path in part_paths {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        for result in reader.records() {
            let record = result?;
            let country = record.get(1).unwrap_or("").trim();
            let port = record.get(2).unwrap_or("").trim();
            let name = record.get(4).unwrap_or("").trim();
            let subdiv = record.get(5).unwrap_or("").trim();

            // 无港口代码的行是国家标题行, 跳过
            if country.is_empty() || port.is_empty() || name.is_empty() {
                continue;
            }

            let uncode = format!("{}{}", country, port).to_uppercase();
            let full_name = if subdiv.is_empty() {
                name.to_string()
            } else {
                format!("{}, {}", name, subdiv)
            };
            names.entry(uncode).or_insert(full_name);
        }
    }

    Ok(names)
}
