// ==========================================
// 船期延误追踪系统 - 对账合并器
// ==========================================
// 职责: 承运人船期记录按复合键左连接回主表
// 复合键: (装货港, 卸货港, 船名, 航次)
// 红线: 只回写本承运人标签的行, 绝不触碰其他承运人的行
// 红线: 记录集由适配器预去重; 键冲突是去重失效的 bug,
//      必须响亮失败 (在承运人边界内被隔离)
// ==========================================

use crate::domain::shipment::{JoinKey, ScheduleRecord, ShipmentLine};
use crate::domain::types::Carrier;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

/// 合并错误类型
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("合并复合键冲突: {0}（适配器去重失效）")]
    KeyCollision(String),
}

/// 合并结果统计
#[derive(Debug, Clone, Copy)]
pub struct MergeOutcome {
    /// 本承运人的行数
    pub lines: usize,
    /// 命中船期记录的行数
    pub matched: usize,
}

pub struct ReconciliationMerger;

impl ReconciliationMerger {
    /// 左连接合并
    ///
    /// # 参数
    /// - master: 主表 (全部承运人的行)
    /// - carrier: 当前合并的承运人
    /// - records: 该承运人的规范船期记录 (已去重)
    ///
    /// # 行为
    /// - 未命中的行保持空的更新日期
    /// - 构表阶段检出键冲突即返回错误, 主表不发生任何改动
    pub fn merge(
        master: &mut [ShipmentLine],
        carrier: Carrier,
        records: &[ScheduleRecord],
    ) -> Result<MergeOutcome, MergeError> {
        // 先整体建索引, 冲突在触碰主表之前暴露
        let mut index: HashMap<JoinKey, &ScheduleRecord> = HashMap::new();
        for record in records {
            let key = record.join_key();
            if index.insert(key.clone(), record).is_some() {
                return Err(MergeError::KeyCollision(key.to_string()));
            }
        }

        let mut outcome = MergeOutcome {
            lines: 0,
            matched: 0,
        };
        for line in master
            .iter_mut()
            .filter(|line| line.carrier == Some(carrier))
        {
            outcome.lines += 1;
            let Some(key) = line.join_key() else {
                continue;
            };
            if let Some(record) = index.get(&key) {
                line.resolved_etd = record.resolved_etd;
                line.resolved_eta = record.resolved_eta;
                outcome.matched += 1;
            }
        }

        info!(
            carrier = %carrier,
            lines = outcome.lines,
            matched = outcome.matched,
            records = records.len(),
            "合并完成"
        );
        Ok(outcome)
    }
}
