// ==========================================
// 租赁资产调度系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 资产可用性与冲突解决引擎 (无状态服务核心)
// 所有持久状态归属事务性存储, 引擎基于快照计算, 提交时复核
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AssetCondition, ConflictState, ConflictType, ReservationStatus, ResolutionStrategy,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Asset, AvailabilityRequest, AvailabilityResult, BulkAssignment,
    Conflict, Product, Reservation, ResolutionContext, ResolutionOutcome,
};

// 引擎
pub use engine::{
    AllocationEvent, AllocationEventPublisher, AllocationEventType, AssetRanker,
    AvailabilityChecker, BulkAssigner, ConflictResolver, NoOpEventPublisher,
    OptionalEventPublisher,
};

// API
pub use api::{AssignmentApi, AvailabilityApi, ConflictApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "租赁资产调度系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
