// ==========================================
// 租赁资产调度系统 - 冲突 API
// ==========================================
// 职责: 冲突查询与解决入口
// 红线4: FORCE 必须显式授权; 红线5: 可解释性
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::availability::{
    AvailabilityRequest, Conflict, ResolutionContext, ResolutionOutcome,
};
use crate::domain::types::ResolutionStrategy;
use crate::engine::availability::AvailabilityChecker;
use crate::engine::resolver::ConflictResolver;
use crate::repository::error::RepositoryError;

// ==========================================
// ConflictView - 冲突展示视图
// ==========================================
/// 用于前端展示的冲突条目
///
/// alternative_assets 按配置截断为预览条数;
/// 解决流程使用登记簿内的完整候选列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictView {
    pub conflict: Conflict,
    pub state: String,
    pub reason: Option<String>,
    pub total_alternatives: usize, // 截断前的候选总数
}

// ==========================================
// ConflictApi - 冲突 API
// ==========================================

/// 冲突API
///
/// 职责：
/// 1. 未解决冲突查询（替代候选预览截断）
/// 2. 冲突确认/放弃
/// 3. 应用解决策略（一次一个冲突, 策略显式给出）
pub struct ConflictApi {
    resolver: Arc<ConflictResolver>,
    checker: Arc<AvailabilityChecker>,
    config: Arc<ConfigManager>,
}

impl ConflictApi {
    /// 创建新的ConflictApi实例
    pub fn new(
        resolver: Arc<ConflictResolver>,
        checker: Arc<AvailabilityChecker>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            resolver,
            checker,
            config,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询全部未解决冲突（预览视图）
    pub fn list_open_conflicts(&self) -> ApiResult<Vec<ConflictView>> {
        let preview_count = self
            .config
            .alternative_preview_count()
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?
            .max(0) as usize;

        let open = self.resolver.list_open()?;
        Ok(open
            .into_iter()
            .map(|tracked| {
                let total = tracked.conflict.alternative_assets.len();
                let mut conflict = tracked.conflict;
                // 预览截断只作用于视图, 登记簿保留完整列表
                conflict.alternative_assets.truncate(preview_count);
                ConflictView {
                    conflict,
                    state: tracked.state.to_string(),
                    reason: tracked.reason,
                    total_alternatives: total,
                }
            })
            .collect())
    }

    /// 操作员确认冲突
    pub fn acknowledge_conflict(&self, conflict_id: &str) -> ApiResult<()> {
        self.resolver.acknowledge(conflict_id).map_err(Into::into)
    }

    /// 放弃处理（resolve 开始前无任何副作用）
    pub fn discard_conflict(&self, conflict_id: &str) -> ApiResult<()> {
        self.resolver.discard(conflict_id).map_err(Into::into)
    }

    // ==========================================
    // 解决接口
    // ==========================================

    /// 应用解决策略
    ///
    /// # 参数
    /// - conflict_id: 登记簿内的冲突标识
    /// - strategy: "force" / "alternative" / "cancel"
    /// - ctx: 操作人、目标订单/行项目、可选替代资产指定
    ///
    /// # 错误
    /// - InvalidInput: 未知策略 / 必填字段缺失
    /// - NotFound: conflict_id 未登记
    /// - ForceOverrideDenied: FORCE 未授权
    /// - ValidationError: 无替代资产可用
    /// - StaleAvailability: 替代资产已被占用（携带刷新后的冲突集）
    pub fn resolve_conflict(
        &self,
        conflict_id: &str,
        strategy: &str,
        ctx: &ResolutionContext,
    ) -> ApiResult<ResolutionOutcome> {
        if conflict_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("冲突ID不能为空".to_string()));
        }
        let strategy = ResolutionStrategy::from_str(strategy).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "未知的解决策略: {} (可选: force/alternative/cancel)",
                strategy
            ))
        })?;
        for (value, label) in [
            (ctx.operator.as_str(), "操作人"),
            (ctx.order_id.as_str(), "订单ID"),
            (ctx.line_item_id.as_str(), "行项目ID"),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!("{}不能为空", label)));
            }
        }

        match self.resolver.resolve(conflict_id, strategy, ctx) {
            Ok(outcome) => Ok(outcome),
            Err(err @ RepositoryError::ReservationConflict { .. }) => {
                // 替代资产在检出与解决之间被占用: 刷新冲突集供重新选择
                let conflicts = self.refresh_conflicts(conflict_id);
                Err(ApiError::from(err).with_conflicts(conflicts))
            }
            Err(err) => Err(err.into()),
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 解决失败后基于最新状态重新生成该产品的冲突集
    fn refresh_conflicts(&self, conflict_id: &str) -> Vec<Conflict> {
        let tracked = match self.resolver.get(conflict_id) {
            Ok(Some(t)) => t,
            _ => return vec![],
        };

        let request = AvailabilityRequest::new(
            &tracked.conflict.product_id,
            1,
            tracked.conflict.requested_start,
            tracked.conflict.requested_end,
        );

        match self.checker.check(&request) {
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
