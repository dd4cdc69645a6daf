// ==========================================
// 租赁资产调度系统 - 预约领域模型
// ==========================================
// 红线2: 同一资产的活动预约时间段不得重叠 (核心正确性性质)
// 对齐: db.rs reservation 表
// ==========================================

use crate::domain::types::ReservationStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Reservation - 资产时间段承诺
// ==========================================
// 生命周期: BulkAssigner 创建; 订单取消流程或替代解决取消
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    // ===== 主键与关联 =====
    pub reservation_id: String, // 预约唯一标识 (UUID)
    pub asset_id: String,       // 被占用资产（FK）
    pub order_id: String,       // 归属订单
    pub line_item_id: String,   // 归属订单行项目

    // ===== 时间范围（闭区间, start <= end）=====
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    // ===== 状态 =====
    pub status: ReservationStatus,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl Reservation {
    /// 是否与给定闭区间重叠
    ///
    /// 判定口径与仓储层 SQL 完全一致:
    /// `existing.start <= range.end AND existing.end >= range.start`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

/// 闭区间重叠判定
///
/// 两个 [start, end] 闭区间重叠当且仅当 a_start <= b_end 且 a_end >= b_start。
/// 引擎与仓储层 SQL 的 WHERE 子句必须保持同一口径。
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
