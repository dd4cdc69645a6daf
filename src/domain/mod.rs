// ==========================================
// 租赁资产调度系统 - 领域层
// ==========================================
// 职责: 实体定义与领域类型, 不含数据访问
// ==========================================

pub mod action_log;
pub mod asset;
pub mod availability;
pub mod reservation;
pub mod types;

// 重导出领域实体
pub use action_log::{ActionLog, ActionType};
pub use asset::{Asset, Product};
pub use availability::{
    AvailabilityRequest, AvailabilityResult, BulkAssignment, Conflict, ResolutionContext,
    ResolutionOutcome,
};
pub use reservation::{ranges_overlap, Reservation};
