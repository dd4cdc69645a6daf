// ==========================================
// 租赁资产调度系统 - 领域类型定义
// ==========================================
// 红线1: 维修/报废资产永不参与分配
// 红线2: 同一资产的活动预约时间段不得重叠
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 资产成色 (Asset Condition)
// ==========================================
// 排序口径: 成色档位映射为序数, 序数越小越优先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetCondition {
    Excellent,   // 优
    Good,        // 良
    Fair,        // 中
    Poor,        // 差
    Maintenance, // 维修中
    Retired,     // 已报废
}

impl AssetCondition {
    /// 排序序数 (excellent=0, good=1, fair=2, poor=3, 其余=4)
    pub fn rank_ordinal(&self) -> u8 {
        match self {
            AssetCondition::Excellent => 0,
            AssetCondition::Good => 1,
            AssetCondition::Fair => 2,
            AssetCondition::Poor => 3,
            _ => 4,
        }
    }

    /// 是否可参与分配 (红线1)
    pub fn is_allocatable(&self) -> bool {
        !matches!(self, AssetCondition::Maintenance | AssetCondition::Retired)
    }

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCondition::Excellent => "EXCELLENT",
            AssetCondition::Good => "GOOD",
            AssetCondition::Fair => "FAIR",
            AssetCondition::Poor => "POOR",
            AssetCondition::Maintenance => "MAINTENANCE",
            AssetCondition::Retired => "RETIRED",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EXCELLENT" => Some(AssetCondition::Excellent),
            "GOOD" => Some(AssetCondition::Good),
            "FAIR" => Some(AssetCondition::Fair),
            "POOR" => Some(AssetCondition::Poor),
            "MAINTENANCE" => Some(AssetCondition::Maintenance),
            "RETIRED" => Some(AssetCondition::Retired),
            _ => None,
        }
    }
}

impl fmt::Display for AssetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 预约状态 (Reservation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,    // 活动
    Cancelled, // 已取消
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ReservationStatus::Active),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 冲突类型 (Conflict Type)
// ==========================================
// overlap: 指定资产与既有预约重叠
// maintenance: 指定资产处于维修/报废状态
// reserved: 数量缺口 (无特定资产)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    Overlap,
    Maintenance,
    Reserved,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::Overlap => "OVERLAP",
            ConflictType::Maintenance => "MAINTENANCE",
            ConflictType::Reserved => "RESERVED",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 冲突处理状态 (Conflict State)
// ==========================================
// 状态机: DETECTED -> {ACKNOWLEDGED, RESOLVING} -> RESOLVED
// 处理失败回到 DETECTED 并更新原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictState {
    Detected,     // 已检出
    Acknowledged, // 已确认
    Resolving,    // 处理中
    Resolved,     // 已解决
}

impl ConflictState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictState::Detected => "DETECTED",
            ConflictState::Acknowledged => "ACKNOWLEDGED",
            ConflictState::Resolving => "RESOLVING",
            ConflictState::Resolved => "RESOLVED",
        }
    }

    /// 是否允许进入 RESOLVING
    pub fn can_enter_resolving(&self) -> bool {
        matches!(self, ConflictState::Detected | ConflictState::Acknowledged)
    }
}

impl fmt::Display for ConflictState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 冲突解决策略 (Resolution Strategy)
// ==========================================
// 红线4: force 必须显式授权并记录审计日志, 永远不是默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    Force,       // 强制覆盖 (有意打破独占性保证)
    Alternative, // 改用替代资产
    Cancel,      // 放弃该资产需求 (数量减一)
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::Force => "FORCE",
            ResolutionStrategy::Alternative => "ALTERNATIVE",
            ResolutionStrategy::Cancel => "CANCEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FORCE" | "force" => Some(ResolutionStrategy::Force),
            "ALTERNATIVE" | "alternative" => Some(ResolutionStrategy::Alternative),
            "CANCEL" | "cancel" => Some(ResolutionStrategy::Cancel),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_rank_ordinal() {
        assert_eq!(AssetCondition::Excellent.rank_ordinal(), 0);
        assert_eq!(AssetCondition::Good.rank_ordinal(), 1);
        assert_eq!(AssetCondition::Fair.rank_ordinal(), 2);
        assert_eq!(AssetCondition::Poor.rank_ordinal(), 3);
        assert_eq!(AssetCondition::Maintenance.rank_ordinal(), 4);
        assert_eq!(AssetCondition::Retired.rank_ordinal(), 4);
    }

    #[test]
    fn test_condition_allocatable() {
        assert!(AssetCondition::Excellent.is_allocatable());
        assert!(AssetCondition::Poor.is_allocatable());
        assert!(!AssetCondition::Maintenance.is_allocatable());
        assert!(!AssetCondition::Retired.is_allocatable());
    }

    #[test]
    fn test_condition_roundtrip() {
        for cond in [
            AssetCondition::Excellent,
            AssetCondition::Good,
            AssetCondition::Fair,
            AssetCondition::Poor,
            AssetCondition::Maintenance,
            AssetCondition::Retired,
        ] {
            assert_eq!(AssetCondition::from_str(cond.as_str()), Some(cond));
        }
        assert_eq!(AssetCondition::from_str("BROKEN"), None);
    }

    #[test]
    fn test_conflict_state_transitions() {
        assert!(ConflictState::Detected.can_enter_resolving());
        assert!(ConflictState::Acknowledged.can_enter_resolving());
        assert!(!ConflictState::Resolving.can_enter_resolving());
        assert!(!ConflictState::Resolved.can_enter_resolving());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            ResolutionStrategy::from_str("force"),
            Some(ResolutionStrategy::Force)
        );
        assert_eq!(
            ResolutionStrategy::from_str("ALTERNATIVE"),
            Some(ResolutionStrategy::Alternative)
        );
        assert_eq!(ResolutionStrategy::from_str("retry"), None);
    }
}
