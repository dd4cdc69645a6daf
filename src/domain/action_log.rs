// ==========================================
// 租赁资产调度系统 - 操作日志领域模型
// ==========================================
// 红线4: 强制覆盖等写路径必须记录
// 用途: 审计追踪
// 对齐: db.rs action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,        // 日志ID (UUID)
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 业务关联 =====
    pub order_id: Option<String>,     // 关联订单
    pub line_item_id: Option<String>, // 关联订单行项目

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)

    // ===== 描述 =====
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    BulkAssign,         // 批量指派
    ForceOverride,      // 强制覆盖 (打破独占性保证)
    ResolveAlternative, // 以替代资产解决冲突
    ResolveCancel,      // 放弃需求解决冲突
    CancelReservation,  // 取消预约
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::BulkAssign => "BulkAssign",
            ActionType::ForceOverride => "ForceOverride",
            ActionType::ResolveAlternative => "ResolveAlternative",
            ActionType::ResolveCancel => "ResolveCancel",
            ActionType::CancelReservation => "CancelReservation",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BulkAssign" => Some(ActionType::BulkAssign),
            "ForceOverride" => Some(ActionType::ForceOverride),
            "ResolveAlternative" => Some(ActionType::ResolveAlternative),
            "ResolveCancel" => Some(ActionType::ResolveCancel),
            "CancelReservation" => Some(ActionType::CancelReservation),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    pub fn new(action_type: ActionType, actor: impl Into<String>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.into(),
            order_id: None,
            line_item_id: None,
            payload_json: None,
            detail: None,
        }
    }

    /// 设置订单关联
    pub fn with_order(mut self, order_id: impl Into<String>, line_item_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self.line_item_id = Some(line_item_id.into());
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for t in [
            ActionType::BulkAssign,
            ActionType::ForceOverride,
            ActionType::ResolveAlternative,
            ActionType::ResolveCancel,
            ActionType::CancelReservation,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_str("Unknown"), None);
    }

    #[test]
    fn test_action_log_builder() {
        let log = ActionLog::new(ActionType::ForceOverride, "op01")
            .with_order("O001", "L001")
            .with_detail("覆盖 A-001 的既有预约");

        assert_eq!(log.action_type, "ForceOverride");
        assert_eq!(log.actor, "op01");
        assert_eq!(log.order_id.as_deref(), Some("O001"));
        assert!(log.detail.as_deref().unwrap().contains("A-001"));
    }
}
