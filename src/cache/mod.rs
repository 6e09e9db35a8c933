// ==========================================
// 船期延误追踪系统 - 缓存层
// ==========================================
// 职责: 按日的原始响应落盘与重放
// ==========================================

pub mod response_cache;

pub use response_cache::{CacheError, CachedPayload, ResponseCache};
