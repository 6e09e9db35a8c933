// ==========================================
// 船期延误追踪系统 - 延误计算引擎
// ==========================================
// 延误天数 = 更新日期 - 计划日期 (整天)
// 规则: 无更新日期 → 延误为空, 不是零
// 屏蔽规则: 提单日期存在 (货已发运) 时强制
//   更新日期 = 计划日期, 延误 = 0, 覆盖适配器的任何计算
// ==========================================

use crate::domain::shipment::ShipmentLine;
use chrono::NaiveDate;
use tracing::debug;

pub struct DeltaEngine {
    mask_if_bol_present: bool,
}

impl DeltaEngine {
    pub fn new(mask_if_bol_present: bool) -> Self {
        Self {
            mask_if_bol_present,
        }
    }

    /// 对整张主表计算延误 (所有承运人合并完成后调用一次)
    pub fn apply(&self, master: &mut [ShipmentLine]) {
        let mut masked = 0usize;
        for line in master.iter_mut() {
            if self.mask_if_bol_present && line.bol_date.is_some() {
                // 已发运: 不再在途, 不应显示异常延误
                line.resolved_etd = line.planned_etd;
                line.resolved_eta = line.planned_eta;
                line.delay_days_etd = Some(0);
                line.delay_days_eta = Some(0);
                masked += 1;
                continue;
            }

            line.delay_days_etd = day_delta(line.resolved_etd, line.planned_etd);
            line.delay_days_eta = day_delta(line.resolved_eta, line.planned_eta);
        }
        debug!(lines = master.len(), masked, "延误计算完成");
    }
}

fn day_delta(resolved: Option<NaiveDate>, planned: Option<NaiveDate>) -> Option<i64> {
    Some((resolved? - planned?).num_days())
}
