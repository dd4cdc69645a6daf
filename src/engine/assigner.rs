// ==========================================
// 租赁资产调度系统 - 批量指派引擎
// ==========================================
// 职责: 将操作员选定的资产集原子提交为预约
// 红线2: 提交前必须基于实时预约状态复核 (检查结果可能已过期)
// 红线3: 全部成功或全部失败, 不存在部分提交
// 红线4: 强制覆盖路径必须记录审计日志
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::asset::Asset;
use crate::domain::availability::BulkAssignment;
use crate::engine::events::{AllocationEvent, AllocationEventType, OptionalEventPublisher};
use crate::engine::ranker::AssetRanker;
use crate::repository::asset_repo::AssetRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reservation_repo::ReservationRepository;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// BulkAssigner - 批量指派引擎
// ==========================================
pub struct BulkAssigner {
    asset_repo: Arc<AssetRepository>,
    reservation_repo: Arc<ReservationRepository>,
    ranker: Arc<AssetRanker>,
    event_publisher: OptionalEventPublisher,
}

impl BulkAssigner {
    /// 创建新的批量指派引擎实例
    pub fn new(
        asset_repo: Arc<AssetRepository>,
        reservation_repo: Arc<ReservationRepository>,
        ranker: Arc<AssetRanker>,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            asset_repo,
            reservation_repo,
            ranker,
            event_publisher,
        }
    }

    // ==========================================
    // 指派
    // ==========================================

    /// 批量指派资产到订单行项目
    ///
    /// # 前置条件
    /// - asset_ids 非空、去重后无重复、全部归属 product_id
    ///
    /// # 行为
    /// 提交前复核与写入在仓储层同一 IMMEDIATE 事务内完成;
    /// 任一资产在提交时已不可用 -> 整体失败, 返回 ReservationConflict,
    /// 调用方基于最新状态重新生成冲突集。
    ///
    /// # 返回
    /// - Ok(BulkAssignment): 创建的 N 条预约
    /// - Err(ReservationConflict): 可用性已过期, 零写入
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, asset_ids), fields(
        product_id = %product_id,
        order_id = %order_id,
        count = asset_ids.len()
    ))]
    pub fn assign(
        &self,
        product_id: &str,
        order_id: &str,
        line_item_id: &str,
        asset_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: &str,
    ) -> RepositoryResult<BulkAssignment> {
        self.validate_selection(product_id, asset_ids, start_date, end_date)?;

        // 审计日志与预约同事务落库
        let audit = ActionLog::new(ActionType::BulkAssign, actor)
            .with_order(order_id, line_item_id)
            .with_payload(&json!({
                "product_id": product_id,
                "asset_ids": asset_ids,
                "start_date": start_date,
                "end_date": end_date,
            }));

        let reservations = self.reservation_repo.create_batch(
            asset_ids,
            order_id,
            line_item_id,
            start_date,
            end_date,
            Some(actor),
            Some(&audit),
        )?;

        info!(
            reservations = reservations.len(),
            "批量指派提交成功"
        );

        self.event_publisher.publish(
            AllocationEvent::new(AllocationEventType::AssetsAssigned)
                .with_product(product_id)
                .with_order(order_id)
                .with_assets(asset_ids.to_vec())
                .with_date_range(start_date, end_date),
        );

        Ok(BulkAssignment {
            product_id: product_id.to_string(),
            order_id: order_id.to_string(),
            line_item_id: line_item_id.to_string(),
            start_date,
            end_date,
            reservations,
        })
    }

    /// 强制指派（豁免重叠检测, 有意打破独占性保证）
    ///
    /// 仅供冲突解决的 FORCE 策略调用, 授权门控在解决器层。
    /// 每次调用无条件写入 ForceOverride 审计日志 (红线4)。
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, asset_ids), fields(
        product_id = %product_id,
        order_id = %order_id
    ))]
    pub fn force_assign(
        &self,
        product_id: &str,
        order_id: &str,
        line_item_id: &str,
        asset_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: &str,
        reason: &str,
    ) -> RepositoryResult<BulkAssignment> {
        self.validate_selection(product_id, asset_ids, start_date, end_date)?;

        warn!(
            asset_ids = ?asset_ids,
            reason, "强制覆盖: 绕过重叠检测提交预约"
        );

        // 红线4: 强制覆盖必须留痕, 审计日志与预约同事务落库
        let audit = ActionLog::new(ActionType::ForceOverride, actor)
            .with_order(order_id, line_item_id)
            .with_payload(&json!({
                "product_id": product_id,
                "asset_ids": asset_ids,
                "start_date": start_date,
                "end_date": end_date,
                "reason": reason,
            }))
            .with_detail("有意打破既有预约的独占性保证");

        let reservations = self.reservation_repo.create_batch_unchecked(
            asset_ids,
            order_id,
            line_item_id,
            start_date,
            end_date,
            Some(actor),
            Some(&audit),
        )?;

        self.event_publisher.publish(
            AllocationEvent::new(AllocationEventType::AssetsAssigned)
                .with_product(product_id)
                .with_order(order_id)
                .with_assets(asset_ids.to_vec())
                .with_date_range(start_date, end_date)
                .with_detail("force"),
        );

        Ok(BulkAssignment {
            product_id: product_id.to_string(),
            order_id: order_id.to_string(),
            line_item_id: line_item_id.to_string(),
            start_date,
            end_date,
            reservations,
        })
    }

    // ==========================================
    // 自动选择
    // ==========================================

    /// 自动选择最优 N 个资产
    ///
    /// 排序后取前 required_quantity 个; 不足时返回全部 —— 缺口
    /// 由可用性检查的冲突输出承担, 本方法自身不报错。
    pub fn auto_select(&self, available_assets: &[Asset], required_quantity: usize) -> Vec<Asset> {
        self.ranker
            .top_n(available_assets.to_vec(), required_quantity)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 选择集校验: 非空、无重复、归属一致、日期合法
    fn validate_selection(
        &self,
        product_id: &str,
        asset_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<()> {
        if asset_ids.is_empty() {
            return Err(RepositoryError::ValidationError(
                "资产列表不能为空".to_string(),
            ));
        }

        let unique: HashSet<&str> = asset_ids.iter().map(|s| s.as_str()).collect();
        if unique.len() != asset_ids.len() {
            return Err(RepositoryError::ValidationError(
                "资产列表包含重复项".to_string(),
            ));
        }

        if start_date > end_date {
            return Err(RepositoryError::ValidationError(format!(
                "日期范围无效: {} > {}",
                start_date, end_date
            )));
        }

        for asset_id in asset_ids {
            let asset = self.asset_repo.find_by_id(asset_id)?.ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "Asset".to_string(),
                    id: asset_id.clone(),
                }
            })?;
            if asset.product_id != product_id {
                return Err(RepositoryError::ValidationError(format!(
                    "资产 {} 不属于产品 {}",
                    asset_id, product_id
                )));
            }
        }

        Ok(())
    }
}
