// ==========================================
// 船期延误追踪系统 - 承运人适配器错误类型
// ==========================================
// 分类对齐故障语义:
//   抓取失败  → 调用方以空响应继续 (单查询隔离)
//   解析失败  → 上抛至编排器承运人边界 (整承运人隔离)
// ==========================================

use crate::cache::response_cache::CacheError;
use crate::importer::error::ImportError;
use crate::net::http::HttpError;
use thiserror::Error;

/// 承运人适配器错误类型
#[derive(Error, Debug)]
pub enum CarrierError {
    // ===== 抓取阶段 =====
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] HttpError),

    #[error("请求 URL 构建失败: {0}")]
    UrlBuild(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    // ===== 位置解析阶段 =====
    #[error("位置解析工件损坏: {0}")]
    LocationArtifact(String),

    // ===== 解析阶段 =====
    #[error("响应解析失败 ({carrier}): {message}")]
    Parse { carrier: String, message: String },

    #[error("无法识别的表格形状: {rows} 行 (无对应字段行映射)")]
    UnrecognizedShape { rows: usize },

    // ===== 船期表文件 (无网络承运人) =====
    #[error(transparent)]
    ScheduleFile(#[from] ImportError),
}

/// Result 类型别名
pub type CarrierResult<T> = Result<T, CarrierError>;
