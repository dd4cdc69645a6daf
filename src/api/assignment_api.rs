// ==========================================
// 租赁资产调度系统 - 指派 API
// ==========================================
// 职责: 批量指派入口, 过期可用性的冲突集刷新
// 红线3: 全部成功或全部失败
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::asset::Asset;
use crate::domain::availability::{AvailabilityRequest, BulkAssignment};
use crate::engine::assigner::BulkAssigner;
use crate::engine::availability::AvailabilityChecker;
use crate::engine::resolver::ConflictResolver;
use crate::repository::error::RepositoryError;

// ==========================================
// AssignmentApi - 指派 API
// ==========================================

/// 指派API
///
/// 职责：
/// 1. 批量指派（提交前复核在引擎/仓储层原子完成）
/// 2. 提交失败时基于最新状态刷新冲突集并登记
/// 3. 自动选择最优资产
pub struct AssignmentApi {
    assigner: Arc<BulkAssigner>,
    checker: Arc<AvailabilityChecker>,
    resolver: Arc<ConflictResolver>,
}

impl AssignmentApi {
    /// 创建新的AssignmentApi实例
    pub fn new(
        assigner: Arc<BulkAssigner>,
        checker: Arc<AvailabilityChecker>,
        resolver: Arc<ConflictResolver>,
    ) -> Self {
        Self {
            assigner,
            checker,
            resolver,
        }
    }

    // ==========================================
    // 指派接口
    // ==========================================

    /// 批量指派资产到订单行项目
    ///
    /// 可用性检查结果到操作员确认之间存在时间差, 提交路径会基于
    /// 实时预约状态复核; 复核失败返回 StaleAvailability 并携带
    /// 最新冲突集（已登记, 可直接进入 resolve 流程）。
    ///
    /// # 返回
    /// - Ok(BulkAssignment): N 条预约全部创建成功
    /// - Err(StaleAvailability): 可用性已过期, 零写入
    #[allow(clippy::too_many_arguments)]
    pub fn assign_bulk_assets(
        &self,
        product_id: &str,
        order_id: &str,
        line_item_id: &str,
        asset_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: &str,
    ) -> ApiResult<BulkAssignment> {
        for (value, label) in [
            (product_id, "产品ID"),
            (order_id, "订单ID"),
            (line_item_id, "行项目ID"),
            (actor, "操作人"),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!("{}不能为空", label)));
            }
        }
        if asset_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ApiError::InvalidInput("资产ID不能为空".to_string()));
        }

        match self.assigner.assign(
            product_id,
            order_id,
            line_item_id,
            asset_ids,
            start_date,
            end_date,
            actor,
        ) {
            Ok(assignment) => Ok(assignment),
            Err(err @ RepositoryError::ReservationConflict { .. }) => {
                warn!("提交时复核失败, 基于最新状态刷新冲突集");
                let conflicts = self.refresh_conflicts(product_id, asset_ids, start_date, end_date);
                Err(ApiError::from(err).with_conflicts(conflicts))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 自动选择最优 N 个空闲资产
    ///
    /// 排序取前 N; 空闲不足时返回全部 —— 缺口以冲突形式由
    /// check_availability 的输出承担, 本接口不报错。
    pub fn auto_select_assets(
        &self,
        product_id: &str,
        quantity: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<Vec<Asset>> {
        if product_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
        }
        if quantity <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "请求数量必须大于 0: {}",
                quantity
            )));
        }

        let request = AvailabilityRequest::new(product_id, quantity, start_date, end_date);
        let result = self.checker.check(&request)?;

        Ok(self
            .assigner
            .auto_select(&result.free_assets, quantity as usize))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 提交失败后基于最新状态重新生成冲突集并登记
    ///
    /// 刷新本身失败时退化为空冲突集（错误主体已是 StaleAvailability,
    /// 不再叠加次生错误）
    fn refresh_conflicts(
        &self,
        product_id: &str,
        asset_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<crate::domain::availability::Conflict> {
        let request = AvailabilityRequest::new(
            product_id,
            asset_ids.len() as i32,
            start_date,
            end_date,
        );

        match self.checker.check_preselected(&request, asset_ids) {
            Ok(result) => {
                if let Err(e) = self.resolver.register(&result.conflicts) {
                    warn!(error = %e, "冲突登记失败(忽略)");
                }
                result.conflicts
            }
            Err(e) => {
                warn!(error = %e, "冲突集刷新失败, 返回空列表");
                vec![]
            }
        }
    }
}
