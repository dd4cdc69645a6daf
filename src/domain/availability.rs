// ==========================================
// 租赁资产调度系统 - 可用性与冲突领域模型
// ==========================================
// 说明: 本文件内的类型均为临时对象, 不落库
// Conflict 每次可用性检查重新生成, 由冲突登记簿在内存中跟踪
// ==========================================

use crate::domain::asset::Asset;
use crate::domain::reservation::Reservation;
use crate::domain::types::{ConflictType, ResolutionStrategy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// AvailabilityRequest - 可用性查询请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub product_id: String,
    pub requested_quantity: i32, // >= 1
    pub start_date: NaiveDate,   // 闭区间
    pub end_date: NaiveDate,
}

impl AvailabilityRequest {
    pub fn new(
        product_id: impl Into<String>,
        requested_quantity: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            requested_quantity,
            start_date,
            end_date,
        }
    }
}

// ==========================================
// AvailabilityResult - 可用性查询结果
// ==========================================
// free_assets: 请求区间内完全空闲的资产
// conflicts: 仅在空闲数量不足或指定资产被阻塞时产生
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub product_id: String,
    pub requested_quantity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub free_assets: Vec<Asset>,
    pub conflicts: Vec<Conflict>,
}

impl AvailabilityResult {
    /// 请求是否可直接满足（无冲突）
    pub fn is_satisfiable(&self) -> bool {
        self.conflicts.is_empty()
    }
}

// ==========================================
// Conflict - 检出的缺口或重叠
// ==========================================
// asset_id = None 表示数量缺口（无特定重叠资产）
// asset_id = Some 表示指定资产被阻塞
// alternative_assets: 完整排序候选列表; 引擎不截断, 预览截断由调用方负责
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub product_id: String,
    pub asset_id: Option<String>,
    pub conflicting_order_id: Option<String>,
    pub conflict_type: ConflictType,

    // ===== 冲突窗口（重叠部分, 裁剪到请求区间）=====
    pub conflict_start: NaiveDate,
    pub conflict_end: NaiveDate,

    // ===== 原始请求窗口（解决策略重新提交时使用）=====
    pub requested_start: NaiveDate,
    pub requested_end: NaiveDate,

    // ===== 缺口数量（asset_id = Some 时恒为 0）=====
    pub missing_quantity: i32,

    // ===== 替代候选（AssetRanker 排序, 降序可取性）=====
    pub alternative_assets: Vec<Asset>,
}

impl Conflict {
    /// 数量缺口冲突（无特定资产）
    pub fn shortfall(
        product_id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        missing_quantity: i32,
        alternatives: Vec<Asset>,
    ) -> Self {
        Self {
            conflict_id: Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            asset_id: None,
            conflicting_order_id: None,
            conflict_type: ConflictType::Reserved,
            conflict_start: start,
            conflict_end: end,
            requested_start: start,
            requested_end: end,
            missing_quantity,
            alternative_assets: alternatives,
        }
    }

    /// 指定资产与既有预约重叠
    ///
    /// 冲突窗口取重叠预约与请求区间的交集
    pub fn asset_overlap(
        product_id: impl Into<String>,
        asset_id: impl Into<String>,
        blocking: &Reservation,
        requested_start: NaiveDate,
        requested_end: NaiveDate,
        alternatives: Vec<Asset>,
    ) -> Self {
        Self {
            conflict_id: Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            asset_id: Some(asset_id.into()),
            conflicting_order_id: Some(blocking.order_id.clone()),
            conflict_type: ConflictType::Overlap,
            conflict_start: blocking.start_date.max(requested_start),
            conflict_end: blocking.end_date.min(requested_end),
            requested_start,
            requested_end,
            missing_quantity: 0,
            alternative_assets: alternatives,
        }
    }

    /// 指定资产处于维修/报废状态
    pub fn asset_blocked_by_condition(
        product_id: impl Into<String>,
        asset_id: impl Into<String>,
        requested_start: NaiveDate,
        requested_end: NaiveDate,
        alternatives: Vec<Asset>,
    ) -> Self {
        Self {
            conflict_id: Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            asset_id: Some(asset_id.into()),
            conflicting_order_id: None,
            conflict_type: ConflictType::Maintenance,
            conflict_start: requested_start,
            conflict_end: requested_end,
            requested_start,
            requested_end,
            missing_quantity: 0,
            alternative_assets: alternatives,
        }
    }
}

// ==========================================
// BulkAssignment - 批量指派结果
// ==========================================
// 全部成功或全部失败, 不存在部分提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAssignment {
    pub product_id: String,
    pub order_id: String,
    pub line_item_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reservations: Vec<Reservation>,
}

impl BulkAssignment {
    /// 实际提交的资产数量
    pub fn quantity(&self) -> usize {
        self.reservations.len()
    }
}

// ==========================================
// ResolutionContext - 冲突解决上下文
// ==========================================
// 一次 resolve 调用只处理一个冲突, 策略必须显式给出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionContext {
    pub operator: String,     // 操作人（审计必填）
    pub order_id: String,     // 目标订单
    pub line_item_id: String, // 目标订单行项目
    pub chosen_alternative_id: Option<String>, // 指定替代资产（缺省取排序首位）
    pub reason: Option<String>, // 操作理由（force 时写入审计日志）
}

// ==========================================
// ResolutionOutcome - 冲突解决结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub conflict_id: String,
    pub strategy: ResolutionStrategy,
    pub success: bool,
    pub new_reservations: Vec<Reservation>,
    pub message: Option<String>,
}
