// ==========================================
// 船期延误追踪系统 - 主追踪表加载器
// ==========================================
// 职责: 读取追踪工作簿, 选取最新日期命名的工作表,
//       按表头别名映射为 ShipmentLine
// 规则: 工作表名按 DD.MM.YYYY 解析, 取最大日期
// 规则: 可变列 (updated_etd 等) 不读取, 每次运行从干净状态开始
// ==========================================

use crate::domain::shipment::ShipmentLine;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{cell_to_date, cell_to_string, find_column, open_xlsx};
use calamine::{Data, Reader};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

// 表头别名表: 标准列 → 接受的表头写法
const COL_FWD_AGENT: &[&str] = &["Fwd Agent", "Forwarding Agent"];
const COL_ORIGIN: &[&str] = &["Port of Loading", "POL"];
const COL_DESTINATION: &[&str] = &["Port of discharge", "Port of Discharge", "POD"];
const COL_VESSEL: &[&str] = &["Vessel", "Vessel Name"];
const COL_VOYAGE: &[&str] = &["Voyage", "Voyage No", "Voyage Number"];
const COL_PLANNED_ETD: &[&str] = &["ETD Date", "ETD"];
const COL_PLANNED_ETA: &[&str] = &["Disport ETA", "ETA Date", "ETA"];
const COL_BOL_DATE: &[&str] = &["BL Date", "Bill of Lading Date", "BOL Date"];

// ==========================================
// 列定位结果
// ==========================================
struct ColumnIndex {
    fwd_agent: usize,
    origin: usize,
    destination: usize,
    vessel: usize,
    voyage: Option<usize>,
    planned_etd: Option<usize>,
    planned_eta: Option<usize>,
    bol_date: Option<usize>,
}

impl ColumnIndex {
    fn build(sheet: &str, headers: &[String]) -> ImportResult<Self> {
        let required = |aliases: &[&str]| -> ImportResult<usize> {
            find_column(headers, aliases).ok_or_else(|| ImportError::HeaderNotFound {
                sheet: sheet.to_string(),
                column: aliases[0].to_string(),
            })
        };

        Ok(Self {
            fwd_agent: required(COL_FWD_AGENT)?,
            origin: required(COL_ORIGIN)?,
            destination: required(COL_DESTINATION)?,
            vessel: required(COL_VESSEL)?,
            voyage: find_column(headers, COL_VOYAGE),
            planned_etd: find_column(headers, COL_PLANNED_ETD),
            planned_eta: find_column(headers, COL_PLANNED_ETA),
            bol_date: find_column(headers, COL_BOL_DATE),
        })
    }
}

// ==========================================
// SheetLoader - 主追踪表加载器
// ==========================================
pub struct SheetLoader;

impl SheetLoader {
    /// 加载主追踪表
    ///
    /// # 参数
    /// - path: 追踪工作簿路径
    ///
    /// # 返回
    /// - Ok((工作表名, 行集)): 加载成功
    /// - Err: 文件缺失 / 无日期工作表 / 必需列缺失
    pub fn load_master(path: &Path) -> ImportResult<(String, Vec<ShipmentLine>)> {
        let mut workbook = open_xlsx(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet = Self::latest_dated_sheet(&sheet_names)
            .ok_or_else(|| ImportError::DatedSheetNotFound(path.display().to_string()))?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        let header_row = rows.next().ok_or_else(|| {
            ImportError::ExcelParseError(format!("工作表 {} 无数据行", sheet))
        })?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_to_string(cell).unwrap_or_default())
            .collect();

        let columns = ColumnIndex::build(&sheet, &headers)?;

        let mut lines = Vec::new();
        for (i, row) in rows.enumerate() {
            // 行号 1 起算, 表头占第 1 行
            let line = Self::map_row(row, i + 2, &columns);
            if line.fwd_agent.is_none() && line.vessel.is_none() && line.origin_port.is_none() {
                // 跳过空白行
                continue;
            }
            lines.push(line);
        }

        info!(sheet = %sheet, lines = lines.len(), "主追踪表已加载");
        Ok((sheet, lines))
    }

    /// 从工作表名集合中选取最新日期 (DD.MM.YYYY)
    fn latest_dated_sheet(names: &[String]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| {
                NaiveDate::parse_from_str(name.trim(), "%d.%m.%Y")
                    .ok()
                    .map(|date| (date, name))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(date, name)| {
                debug!(sheet = %name, date = %date, "选定最新日期工作表");
                name.clone()
            })
    }

    fn map_row(row: &[Data], row_no: usize, columns: &ColumnIndex) -> ShipmentLine {
        let get = |idx: usize| row.get(idx).and_then(cell_to_string);
        let get_date =
            |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(cell_to_date);

        let mut line = ShipmentLine::new(row_no);
        line.fwd_agent = get(columns.fwd_agent);
        line.origin_port = get(columns.origin);
        line.destination_port = get(columns.destination);
        line.vessel = get(columns.vessel);
        line.voyage = columns.voyage.and_then(get);
        line.planned_etd = get_date(columns.planned_etd);
        line.planned_eta = get_date(columns.planned_eta);
        line.bol_date = get_date(columns.bol_date);
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_dated_sheet_picks_max() {
        let names = vec![
            "05.01.2024".to_string(),
            "Notes".to_string(),
            "12.01.2024".to_string(),
            "08.01.2024".to_string(),
        ];
        assert_eq!(
            SheetLoader::latest_dated_sheet(&names),
            Some("12.01.2024".to_string())
        );
    }

    #[test]
    fn test_latest_dated_sheet_none_when_undated() {
        let names = vec!["Summary".to_string(), "Raw".to_string()];
        assert_eq!(SheetLoader::latest_dated_sheet(&names), None);
    }

    #[test]
    fn test_map_row_basic() {
        let columns = ColumnIndex {
            fwd_agent: 0,
            origin: 1,
            destination: 2,
            vessel: 3,
            voyage: Some(4),
            planned_etd: Some(5),
            planned_eta: Some(6),
            bol_date: None,
        };
        let row = vec![
            Data::String("MSC".to_string()),
            Data::String("SGSIN".to_string()),
            Data::String("CNSHA".to_string()),
            Data::String("EVER GIVEN".to_string()),
            Data::String("021E".to_string()),
            Data::String("2024-01-10".to_string()),
            Data::String("2024-01-18".to_string()),
        ];

        let line = SheetLoader::map_row(&row, 2, &columns);
        assert_eq!(line.fwd_agent.as_deref(), Some("MSC"));
        assert_eq!(line.origin_port.as_deref(), Some("SGSIN"));
        assert_eq!(
            line.planned_etd,
            Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );
        assert!(line.bol_date.is_none());
        // 可变字段始终从干净状态开始
        assert!(line.resolved_etd.is_none());
        assert!(line.delay_days_eta.is_none());
    }
}
