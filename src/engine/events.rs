// ==========================================
// 租赁资产调度系统 - 引擎层事件发布
// ==========================================
// 职责: 定义分配事件发布 trait, 实现依赖倒置
// 说明: 事件仅用于可观测性, 不参与正确性契约
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 分配事件类型
// ==========================================

/// 分配事件触发类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEventType {
    /// 冲突检出
    ConflictDetected,
    /// 资产已指派
    AssetsAssigned,
    /// 冲突已解决
    ConflictResolved,
    /// 预约已取消
    ReservationCancelled,
}

impl AllocationEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            AllocationEventType::ConflictDetected => "ConflictDetected",
            AllocationEventType::AssetsAssigned => "AssetsAssigned",
            AllocationEventType::ConflictResolved => "ConflictResolved",
            AllocationEventType::ReservationCancelled => "ReservationCancelled",
        }
    }
}

/// 分配事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEvent {
    /// 事件类型
    pub event_type: AllocationEventType,
    /// 关联产品
    pub product_id: Option<String>,
    /// 关联订单
    pub order_id: Option<String>,
    /// 受影响的资产列表
    pub asset_ids: Vec<String>,
    /// 受影响的日期范围
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// 事件描述
    pub detail: Option<String>,
}

impl AllocationEvent {
    pub fn new(event_type: AllocationEventType) -> Self {
        Self {
            event_type,
            product_id: None,
            order_id: None,
            asset_ids: vec![],
            date_range: None,
            detail: None,
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_assets(mut self, asset_ids: Vec<String>) -> Self {
        self.asset_ids = asset_ids;
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 分配事件发布者 Trait
///
/// 引擎层定义, 下游（通知/看板）实现
/// 发布失败不得影响分配结果
pub trait AllocationEventPublisher: Send + Sync {
    /// 发布分配事件
    ///
    /// # 返回
    /// - `Ok(event_ref)`: 下游引用标识（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: AllocationEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl AllocationEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: AllocationEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            event_type = event.event_type.as_str(),
            "NoOpEventPublisher: 跳过事件发布"
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn AllocationEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn AllocationEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn AllocationEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）; 失败仅记录, 不向上传播
    pub fn publish(&self, event: AllocationEvent) {
        if let Some(publisher) = &self.inner {
            if let Err(e) = publisher.publish(event) {
                tracing::warn!("事件发布失败(忽略): {}", e);
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
