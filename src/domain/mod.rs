// ==========================================
// 船期延误追踪系统 - 领域层
// ==========================================
// 职责: 全系统共享的数据形状, 无 I/O
// ==========================================

pub mod shipment;
pub mod types;

// 重导出核心类型
pub use shipment::{JoinKey, RouteKey, RouteQuery, ScheduleRecord, ShipmentLine};
pub use types::{Carrier, LocationCode};
