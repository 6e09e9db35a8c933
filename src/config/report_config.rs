// ==========================================
// 船期延误追踪系统 - 运行配置
// ==========================================
// 存储: data/config.json (serde 反序列化)
// 职责: 承运人开关, 抓取延迟区间, 提单日屏蔽开关, 文件路径,
//       各适配器时间窗参数
// ==========================================

use crate::domain::types::Carrier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    FileNotFound(String),

    #[error("配置读取失败: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("配置解析失败: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("延迟区间非法: lower={lower} upper={upper} (要求 lower <= upper)")]
    InvalidInterval { lower: u64, upper: u64 },
}

// ==========================================
// ReportConfig - 运行配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    // ===== 承运人开关 =====
    #[serde(default)]
    pub run_msc: bool,
    #[serde(default)]
    pub run_bigschedules: bool,
    #[serde(default)]
    pub run_g2ocean: bool,

    // ===== 抓取延迟区间 (秒) =====
    #[serde(default = "default_lower_interval")]
    pub randomiser_lower_interval: u64,
    #[serde(default = "default_upper_interval")]
    pub randomiser_upper_interval: u64,

    // ===== 提单日屏蔽 =====
    // 开启后: 有提单日期的行强制 resolved = planned, 延误清零
    #[serde(default)]
    pub mask_date_if_bol_present: bool,

    // ===== 文件路径 =====
    #[serde(default = "default_delay_filename")]
    pub delay_filename: String, // 主追踪表工作簿
    #[serde(default = "default_g2_filename")]
    pub g2_filename: String, // G2OCEAN 船期表文件
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf, // 静态对照表目录
    #[serde(default = "default_responses_dir")]
    pub responses_dir: PathBuf, // 响应缓存根目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf, // 报告输出目录

    // ===== 适配器参数 =====
    #[serde(default = "default_g2_skiprows")]
    pub g2_skiprows: usize, // G2 船期表表头前的跳过行数
    #[serde(default = "default_msc_weeks_out")]
    pub msc_weeks_out: u32, // MSC 搜索 API 的周数窗口
    #[serde(default = "default_bigschedules_weeks")]
    pub bigschedules_search_weeks: u32, // BigSchedules 逐周查询窗口数
}

fn default_lower_interval() -> u64 {
    3
}
fn default_upper_interval() -> u64 {
    8
}
fn default_delay_filename() -> String {
    "Vessel Delay Tracking.xlsx".to_string()
}
fn default_g2_filename() -> String {
    "G2 Schedule.xlsx".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_responses_dir() -> PathBuf {
    PathBuf::from("responses")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_g2_skiprows() -> usize {
    9
}
fn default_msc_weeks_out() -> u32 {
    8
}
fn default_bigschedules_weeks() -> u32 {
    3
}

impl ReportConfig {
    /// 从 JSON 文件加载配置
    ///
    /// # 参数
    /// - path: 配置文件路径
    ///
    /// # 返回
    /// - Ok(ReportConfig): 加载并校验通过
    /// - Err: 文件缺失 / 解析失败 / 区间非法
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let raw = fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 配置自检
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.randomiser_lower_interval > self.randomiser_upper_interval {
            return Err(ConfigError::InvalidInterval {
                lower: self.randomiser_lower_interval,
                upper: self.randomiser_upper_interval,
            });
        }
        Ok(())
    }

    /// 抓取延迟区间 (秒)
    pub fn delay_interval(&self) -> (u64, u64) {
        (
            self.randomiser_lower_interval,
            self.randomiser_upper_interval,
        )
    }

    /// 某承运人是否启用
    pub fn carrier_enabled(&self, carrier: Carrier) -> bool {
        match carrier {
            Carrier::Msc => self.run_msc,
            Carrier::BigSchedules => self.run_bigschedules,
            Carrier::G2Ocean => self.run_g2ocean,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        // serde 默认值与 Default 保持同一来源
        serde_json::from_str("{}").expect("空配置反序列化不应失败")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"run_msc": true, "randomiser_lower_interval": 1, "randomiser_upper_interval": 2}}"#
        )
        .unwrap();

        let config = ReportConfig::load(temp_file.path()).unwrap();
        assert!(config.run_msc);
        assert!(!config.run_g2ocean);
        assert_eq!(config.delay_interval(), (1, 2));
        // 未给出的路径取默认值
        assert_eq!(config.delay_filename, "Vessel Delay Tracking.xlsx");
        assert_eq!(config.msc_weeks_out, 8);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"randomiser_lower_interval": 9, "randomiser_upper_interval": 2}}"#
        )
        .unwrap();

        let result = ReportConfig::load(temp_file.path());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval { lower: 9, upper: 2 })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ReportConfig::load("no_such_config.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_carrier_enabled_mapping() {
        let config = ReportConfig {
            run_bigschedules: true,
            ..Default::default()
        };
        assert!(config.carrier_enabled(Carrier::BigSchedules));
        assert!(!config.carrier_enabled(Carrier::Msc));
    }
}
