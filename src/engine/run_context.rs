// ==========================================
// 船期延误追踪系统 - 运行上下文
// ==========================================
// PipelineRun: 单次运行的执行上下文
// 红线: 不修改进程工作目录; 缓存路径作为显式参数传递
// ==========================================

use crate::cache::response_cache::{CacheError, ResponseCache};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

// ==========================================
// PipelineRun
// ==========================================
// 生命周期: 每次调用创建一个, 运行结束即弃
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// 今天 (快照粒度: 每日历日一份)
    pub today: NaiveDate,
    /// 当日缓存目录: responses/<YYYY-MM-DD>
    pub cache_root: PathBuf,
    /// 抓取后随机延迟区间 (秒)
    pub interval: (u64, u64),
}

impl PipelineRun {
    /// 创建运行上下文
    ///
    /// # 参数
    /// - responses_root: 缓存根目录 (如 "responses")
    /// - today: 本次运行的日历日
    /// - interval: 抓取后延迟区间 (秒)
    pub fn new(responses_root: &Path, today: NaiveDate, interval: (u64, u64)) -> Self {
        Self {
            today,
            cache_root: responses_root.join(today.format("%Y-%m-%d").to_string()),
            interval,
        }
    }

    /// 打开当日响应缓存
    pub fn open_cache(&self) -> Result<ResponseCache, CacheError> {
        ResponseCache::open(&self.cache_root, self.interval)
    }
}
