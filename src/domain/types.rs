// ==========================================
// 船期延误追踪系统 - 领域类型定义
// ==========================================
// 承运人家族: 每个家族对应一个数据源适配器
// 序列化格式: SCREAMING_SNAKE_CASE (与配置/缓存文件名一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 承运人家族 (Carrier Family)
// ==========================================
// 一个家族 = 一个数据源适配器
// 货代标签 (Fwd Agent) 经 carrier_mapping.json 归入家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Carrier {
    Msc,          // MSC 官网 JSON API
    BigSchedules, // BigSchedules 门户 HTML 抓取
    G2Ocean,      // G2OCEAN 船期表文件 (无网络)
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Carrier::Msc => write!(f, "MSC"),
            Carrier::BigSchedules => write!(f, "BIGSCHEDULES"),
            Carrier::G2Ocean => write!(f, "G2OCEAN"),
        }
    }
}

impl Carrier {
    /// 从字符串解析承运人家族
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MSC" => Some(Carrier::Msc),
            "BIGSCHEDULES" | "BS" => Some(Carrier::BigSchedules),
            "G2OCEAN" | "G2" => Some(Carrier::G2Ocean),
            _ => None,
        }
    }

    /// 缓存文件名/工件名使用的标识
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Msc => "MSC",
            Carrier::BigSchedules => "BIGSCHEDULES",
            Carrier::G2Ocean => "G2OCEAN",
        }
    }

    /// 固定执行顺序 (编排器按此顺序迭代)
    pub const PIPELINE_ORDER: [Carrier; 3] =
        [Carrier::BigSchedules, Carrier::Msc, Carrier::G2Ocean];
}

// ==========================================
// 位置代码 (Location Code)
// ==========================================
// 承运人内部的港口标识, 对系统不透明
// 不变式: 一个承运人当天一个代码只对应一个规范港口
pub type LocationCode = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_roundtrip() {
        for carrier in Carrier::PIPELINE_ORDER {
            assert_eq!(Carrier::from_str(carrier.as_str()), Some(carrier));
        }
    }

    #[test]
    fn test_carrier_aliases() {
        assert_eq!(Carrier::from_str("bs"), Some(Carrier::BigSchedules));
        assert_eq!(Carrier::from_str("G2"), Some(Carrier::G2Ocean));
        assert_eq!(Carrier::from_str("UNKNOWN"), None);
    }
}
