// ==========================================
// 船期延误追踪系统 - 查询规划器
// ==========================================
// 职责: 行集 → 最小查询集
// 规则: 仅两端都解析出位置代码的路线入选
// 规则: 按 (装货港, 卸货港) 去重并稳定排序,
//      保证缓存文件名与跳过/续跑行为跨次运行可复现
// ==========================================

use crate::carrier::location::LocationMap;
use crate::domain::shipment::{RouteKey, RouteQuery, ShipmentLine};
use std::collections::BTreeSet;

pub struct QueryPlanner;

impl QueryPlanner {
    /// 生成最小查询集
    ///
    /// # 参数
    /// - lines: 某承运人的行集
    /// - locations: 该承运人的位置映射
    ///
    /// # 返回
    /// 去重 + 排序后的查询列表; 端点未解析的行自然落选
    /// (它们只是保持空的更新日期, 不报错)
    pub fn plan(lines: &[ShipmentLine], locations: &LocationMap) -> Vec<RouteQuery> {
        let routes: BTreeSet<RouteKey> =
            lines.iter().filter_map(|line| line.route_key()).collect();

        routes
            .into_iter()
            .filter_map(|route| {
                let origin_code = locations.code_for(&route.origin)?.clone();
                let destination_code = locations.code_for(&route.destination)?.clone();
                Some(RouteQuery {
                    route,
                    origin_code,
                    destination_code,
                    window: None,
                })
            })
            .collect()
    }
}
