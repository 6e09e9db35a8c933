// ==========================================
// 船期延误追踪系统 - 货运领域模型
// ==========================================
// ShipmentLine: 主追踪表的一行 (编排器持有, 适配器只读副本)
// ScheduleRecord: 承运人数据规范化后的船期事实
// RouteKey/JoinKey: 查询去重键 / 合并复合键
// ==========================================

use crate::domain::types::{Carrier, LocationCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ShipmentLine - 主追踪表行
// ==========================================
// 用途: 导入层写入标识与计划字段, 合并/延误引擎写入可变字段
// 生命周期: 单次管道运行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLine {
    // ===== 行标识 =====
    pub row_no: usize, // 主表行号 (含表头偏移, 用于日志与回写)

    // ===== 标识字段 =====
    pub fwd_agent: Option<String>,        // 货代标签 (原值)
    pub carrier: Option<Carrier>,         // 归属承运人家族 (经 crosswalk 派生)
    pub origin_port: Option<String>,      // 装货港 UN/LOCODE
    pub destination_port: Option<String>, // 卸货港 UN/LOCODE
    pub vessel: Option<String>,           // 船名
    pub voyage: Option<String>,           // 航次号

    // ===== 计划日期 =====
    pub planned_etd: Option<NaiveDate>, // 计划离港日 (ETD Date)
    pub planned_eta: Option<NaiveDate>, // 计划到港日 (Disport ETA)
    pub bol_date: Option<NaiveDate>,    // 提单日期 (有值 = 货已实际发运)

    // ===== 可变字段 (管道输出) =====
    pub resolved_etd: Option<NaiveDate>, // 更新后 ETD
    pub resolved_eta: Option<NaiveDate>, // 更新后 ETA
    pub delay_days_etd: Option<i64>,     // ETD 延误天数
    pub delay_days_eta: Option<i64>,     // ETA 延误天数
    pub delay_reason: Option<String>,    // 延误原因 (人工填写, 管道不生成)
}

impl ShipmentLine {
    /// 构造空行 (测试与导入层使用)
    pub fn new(row_no: usize) -> Self {
        Self {
            row_no,
            fwd_agent: None,
            carrier: None,
            origin_port: None,
            destination_port: None,
            vessel: None,
            voyage: None,
            planned_etd: None,
            planned_eta: None,
            bol_date: None,
            resolved_etd: None,
            resolved_eta: None,
            delay_days_etd: None,
            delay_days_eta: None,
            delay_reason: None,
        }
    }

    /// 本行的合并复合键
    ///
    /// # 返回
    /// - Some(JoinKey): 两端港口与船名齐备
    /// - None: 关键字段缺失, 无法参与合并
    pub fn join_key(&self) -> Option<JoinKey> {
        Some(JoinKey::new(
            self.origin_port.as_deref()?,
            self.destination_port.as_deref()?,
            self.vessel.as_deref()?,
            self.voyage.as_deref().unwrap_or(""),
        ))
    }

    /// 本行的路线键
    pub fn route_key(&self) -> Option<RouteKey> {
        Some(RouteKey {
            origin: self.origin_port.clone()?,
            destination: self.destination_port.clone()?,
        })
    }
}

// ==========================================
// RouteKey - 路线键
// ==========================================
// 查询去重单位: (装货港, 卸货港)
// Ord 派生保证查询顺序稳定 (缓存文件名可复现)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: String,
    pub destination: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

// ==========================================
// RouteQuery - 承运人查询
// ==========================================
// QueryPlanner 输出; 适配器可按时间窗展开为多条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    pub route: RouteKey,                // 规范路线 (解析回写用)
    pub origin_code: LocationCode,      // 承运人装货港代码
    pub destination_code: LocationCode, // 承运人卸货港代码
    pub window: Option<u32>,            // 时间窗序号 (多窗承运人)
}

impl RouteQuery {
    /// 缓存文件名: "<承运人> <装货港代码>-<卸货港代码>[ w<窗口>].<后缀>"
    ///
    /// 同日同键重复运行会命中同一文件, 实现零网络重放
    pub fn cache_file_name(&self, carrier: Carrier, ext: &str) -> String {
        match self.window {
            Some(w) => format!(
                "{} {}-{} w{}.{}",
                carrier.as_str(),
                self.origin_code,
                self.destination_code,
                w,
                ext
            ),
            None => format!(
                "{} {}-{}.{}",
                carrier.as_str(),
                self.origin_code,
                self.destination_code,
                ext
            ),
        }
    }
}

// ==========================================
// JoinKey - 合并复合键
// ==========================================
// (装货港, 卸货港, 船名, 航次), 规范化为大写去空白
// 同一路线不同航次是合法多条, 键相同才视为同一船期
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JoinKey {
    pub origin: String,
    pub destination: String,
    pub vessel: String,
    pub voyage: String,
}

impl JoinKey {
    pub fn new(origin: &str, destination: &str, vessel: &str, voyage: &str) -> Self {
        Self {
            origin: normalize_key_part(origin),
            destination: normalize_key_part(destination),
            vessel: normalize_key_part(vessel),
            voyage: normalize_key_part(voyage),
        }
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}/{}/{}",
            self.origin, self.destination, self.vessel, self.voyage
        )
    }
}

/// 键部件规范化: 去空白 + 大写
fn normalize_key_part(s: &str) -> String {
    s.trim().to_uppercase()
}

// ==========================================
// ScheduleRecord - 规范船期记录
// ==========================================
// 适配器 parse 产出, 合并器消费; 生命周期单次运行
// 不变式: 日期已规范化为 NaiveDate, 合并前按键去重完毕
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub origin_port: String,      // 装货港 UN/LOCODE
    pub destination_port: String, // 卸货港 UN/LOCODE
    pub vessel: String,           // 船名
    pub voyage: String,           // 航次号
    pub resolved_etd: Option<NaiveDate>,
    pub resolved_eta: Option<NaiveDate>,
}

impl ScheduleRecord {
    pub fn join_key(&self) -> JoinKey {
        JoinKey::new(
            &self.origin_port,
            &self.destination_port,
            &self.vessel,
            &self.voyage,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key_normalized() {
        let a = JoinKey::new("SGSIN", "CNSHA", " Ever Given ", "021e");
        let b = JoinKey::new("SGSIN", "CNSHA", "EVER GIVEN", "021E");
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_join_key_requires_vessel() {
        let mut line = ShipmentLine::new(2);
        line.origin_port = Some("SGSIN".to_string());
        line.destination_port = Some("CNSHA".to_string());
        assert!(line.join_key().is_none());

        line.vessel = Some("EVER GIVEN".to_string());
        let key = line.join_key().unwrap();
        // 航次缺失按空串参与复合键
        assert_eq!(key.voyage, "");
    }

    #[test]
    fn test_cache_file_name_with_window() {
        let query = RouteQuery {
            route: RouteKey {
                origin: "SGSIN".to_string(),
                destination: "CNSHA".to_string(),
            },
            origin_code: "152".to_string(),
            destination_code: "87".to_string(),
            window: Some(2),
        };
        assert_eq!(
            query.cache_file_name(crate::domain::types::Carrier::Msc, "json"),
            "MSC 152-87 w2.json"
        );
    }
}
