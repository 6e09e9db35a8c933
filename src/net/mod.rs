// ==========================================
// 船期延误追踪系统 - 网络层
// ==========================================

pub mod http;

pub use http::{HttpError, PortalClient};
