// ==========================================
// 船期延误追踪系统 - 报告输出
// ==========================================
// 输出: "Vessel Delay Tracking - <DD.MM.YYYY>.csv"
// 日期列统一 DD/MM/YYYY 格式
// ==========================================

use crate::domain::shipment::ShipmentLine;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("报告写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("报告写入失败: {0}")]
    Io(#[from] std::io::Error),
}

const HEADERS: [&str; 13] = [
    "Fwd Agent",
    "Port of Loading",
    "Port of discharge",
    "Vessel",
    "Voyage",
    "ETD Date",
    "Disport ETA",
    "BL Date",
    "updated_etd",
    "updated_eta",
    "No. of days delayed ETD",
    "No. of days delayed ETA",
    "Reason of Delay",
];

pub struct ReportWriter;

impl ReportWriter {
    /// 写出最终对账表
    ///
    /// # 返回
    /// 生成的报告文件路径
    pub fn write(
        output_dir: &Path,
        today: NaiveDate,
        master: &[ShipmentLine],
    ) -> Result<PathBuf, ReportError> {
        let file_name = format!("Vessel Delay Tracking - {}.csv", today.format("%d.%m.%Y"));
        let path = output_dir.join(file_name);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADERS)?;
        for line in master {
            writer.write_record([
                text(&line.fwd_agent),
                text(&line.origin_port),
                text(&line.destination_port),
                text(&line.vessel),
                text(&line.voyage),
                date(line.planned_etd),
                date(line.planned_eta),
                date(line.bol_date),
                date(line.resolved_etd),
                date(line.resolved_eta),
                days(line.delay_days_etd),
                days(line.delay_days_eta),
                text(&line.delay_reason),
            ])?;
        }
        writer.flush()?;

        info!(path = %path.display(), lines = master.len(), "延误报告已写出");
        Ok(path)
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

fn days(value: Option<i64>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}
