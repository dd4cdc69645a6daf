// ==========================================
// 租赁资产调度系统 - 引擎层
// ==========================================
// 职责: 实现分配业务规则, 不拼 SQL
// 红线: Engine 不拼 SQL, 所有冲突必须携带可解释输出
// ==========================================

pub mod assigner;
pub mod availability;
pub mod events;
pub mod ranker;
pub mod resolver;

// 重导出核心引擎
pub use assigner::BulkAssigner;
pub use availability::AvailabilityChecker;
pub use events::{
    AllocationEvent, AllocationEventPublisher, AllocationEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use ranker::AssetRanker;
pub use resolver::{ConflictResolver, TrackedConflict};
