// ==========================================
// 船期延误追踪系统 - 文件解析基础
// ==========================================
// 职责: 工作簿打开 / 单元格取值 / 日期宽松解析
// 支持: Excel (.xlsx/.xls)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Data, DataType, Xlsx};
use chrono::NaiveDate;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 打开 xlsx 工作簿 (带存在性与扩展名检查)
pub fn open_xlsx(path: &Path) -> ImportResult<Xlsx<BufReader<File>>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext != "xlsx" && ext != "xls" {
        return Err(ImportError::UnsupportedFormat(ext.to_string()));
    }

    Ok(open_workbook(path)?)
}

/// 单元格 → 非空字符串
pub fn cell_to_string(cell: &Data) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    let value = cell.to_string();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 单元格 → 日期
///
/// Excel 日期单元格直接转换; 文本单元格走宽松格式链
pub fn cell_to_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => cell.as_date(),
        _ => parse_date_flex(&cell_to_string(cell)?),
    }
}

/// 宽松日期解析
///
/// 依次尝试: YYYY-MM-DD / DD.MM.YYYY / DD/MM/YYYY / YYYYMMDD,
/// 最后尝试截取 ISO 日期时间前缀 (承运人 API 常见形态)
pub fn parse_date_flex(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    if s.len() > 10 {
        return NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok();
    }
    None
}

/// 在表头行中定位列 (大小写不敏感, 支持别名)
pub fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_flex_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        assert_eq!(parse_date_flex("2024-01-12"), Some(expected));
        assert_eq!(parse_date_flex("12.01.2024"), Some(expected));
        assert_eq!(parse_date_flex("12/01/2024"), Some(expected));
        assert_eq!(parse_date_flex("20240112"), Some(expected));
        // ISO 日期时间取前缀
        assert_eq!(parse_date_flex("2024-01-12T14:30:00"), Some(expected));
        assert_eq!(parse_date_flex("TBA"), None);
    }

    #[test]
    fn test_cell_to_string_trims() {
        assert_eq!(
            cell_to_string(&Data::String("  SGSIN  ".to_string())),
            Some("SGSIN".to_string())
        );
        assert_eq!(cell_to_string(&Data::String("   ".to_string())), None);
        assert_eq!(cell_to_string(&Data::Empty), None);
    }

    #[test]
    fn test_find_column_aliases() {
        let headers = vec![
            "Fwd Agent".to_string(),
            "Port of Loading".to_string(),
            "BL Date".to_string(),
        ];
        assert_eq!(find_column(&headers, &["fwd agent"]), Some(0));
        assert_eq!(
            find_column(&headers, &["Bill of Lading Date", "BL Date"]),
            Some(2)
        );
        assert_eq!(find_column(&headers, &["Voyage"]), None);
    }

    #[test]
    fn test_open_xlsx_missing_file() {
        let result = open_xlsx(Path::new("no_such_file.xlsx"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_open_xlsx_wrong_extension() {
        let result = open_xlsx(Path::new("src/lib.rs"));
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
