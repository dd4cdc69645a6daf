// ==========================================
// 租赁资产调度系统 - 冲突解决引擎
// ==========================================
// 职责: 对单个冲突应用操作员选定的解决策略
// 状态机: DETECTED -> {ACKNOWLEDGED, RESOLVING} -> RESOLVED
//        失败回到 DETECTED 并更新原因
// 红线4: FORCE 必须显式授权 (配置门控) 并记录审计日志, 永远不是默认值
// 一次调用只处理一个冲突, 策略必须显式给出
// ==========================================
// 登记簿说明: Conflict 不落库, 每次可用性检查重新生成;
// 登记簿在内存中跟踪检出的冲突, 供 resolve 按 conflict_id 寻址。
// resolve 开始前放弃处理无任何副作用 (尚未创建预约)。
// ==========================================

use crate::config::config_manager::ConfigManager;
use crate::domain::availability::{Conflict, ResolutionContext, ResolutionOutcome};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{ConflictState, ResolutionStrategy};
use crate::engine::assigner::BulkAssigner;
use crate::engine::events::{AllocationEvent, AllocationEventType, OptionalEventPublisher};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

// ==========================================
// TrackedConflict - 登记簿内的冲突条目
// ==========================================
#[derive(Debug, Clone)]
pub struct TrackedConflict {
    pub conflict: Conflict,
    pub state: ConflictState,
    pub reason: Option<String>, // 最近一次处理失败原因
}

// ==========================================
// ConflictResolver - 冲突解决引擎
// ==========================================
pub struct ConflictResolver {
    registry: Mutex<HashMap<String, TrackedConflict>>,
    assigner: Arc<BulkAssigner>,
    config: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
    event_publisher: OptionalEventPublisher,
}

impl ConflictResolver {
    /// 创建新的冲突解决引擎实例
    pub fn new(
        assigner: Arc<BulkAssigner>,
        config: Arc<ConfigManager>,
        action_log_repo: Arc<ActionLogRepository>,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            assigner,
            config,
            action_log_repo,
            event_publisher,
        }
    }

    // ==========================================
    // 登记簿
    // ==========================================

    /// 登记检出的冲突 (状态 DETECTED)
    pub fn register(&self, conflicts: &[Conflict]) -> RepositoryResult<()> {
        {
            let mut registry = self.lock_registry()?;
            for conflict in conflicts {
                registry.insert(
                    conflict.conflict_id.clone(),
                    TrackedConflict {
                        conflict: conflict.clone(),
                        state: ConflictState::Detected,
                        reason: None,
                    },
                );
            }
        }

        for conflict in conflicts {
            self.event_publisher.publish(
                AllocationEvent::new(AllocationEventType::ConflictDetected)
                    .with_product(&conflict.product_id)
                    .with_date_range(conflict.conflict_start, conflict.conflict_end)
                    .with_detail(conflict.conflict_type.as_str()),
            );
        }
        Ok(())
    }

    /// 按 conflict_id 查询登记条目
    pub fn get(&self, conflict_id: &str) -> RepositoryResult<Option<TrackedConflict>> {
        let registry = self.lock_registry()?;
        Ok(registry.get(conflict_id).cloned())
    }

    /// 查询全部未解决冲突
    pub fn list_open(&self) -> RepositoryResult<Vec<TrackedConflict>> {
        let registry = self.lock_registry()?;
        let mut open: Vec<TrackedConflict> = registry
            .values()
            .filter(|t| t.state != ConflictState::Resolved)
            .cloned()
            .collect();
        open.sort_by(|a, b| a.conflict.conflict_id.cmp(&b.conflict.conflict_id));
        Ok(open)
    }

    /// 操作员确认冲突 (DETECTED -> ACKNOWLEDGED)
    pub fn acknowledge(&self, conflict_id: &str) -> RepositoryResult<()> {
        let mut registry = self.lock_registry()?;
        let tracked = registry
            .get_mut(conflict_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Conflict".to_string(),
                id: conflict_id.to_string(),
            })?;

        if tracked.state != ConflictState::Detected {
            return Err(RepositoryError::InvalidStateTransition {
                from: tracked.state.to_string(),
                to: ConflictState::Acknowledged.to_string(),
            });
        }
        tracked.state = ConflictState::Acknowledged;
        Ok(())
    }

    /// 放弃处理并移出登记簿 (resolve 开始前无任何副作用)
    pub fn discard(&self, conflict_id: &str) -> RepositoryResult<()> {
        let mut registry = self.lock_registry()?;
        registry
            .remove(conflict_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Conflict".to_string(),
                id: conflict_id.to_string(),
            })?;
        Ok(())
    }

    // ==========================================
    // 解决
    // ==========================================

    /// 应用解决策略
    ///
    /// # 状态机
    /// - 进入前必须处于 DETECTED/ACKNOWLEDGED
    /// - 应用期间为 RESOLVING; 成功 -> RESOLVED; 失败 -> DETECTED + 原因
    ///
    /// # 错误
    /// - NotFound: conflict_id 未登记
    /// - InvalidStateTransition: 冲突已在处理中或已解决
    /// - ValidationError: 策略前置条件不满足 (如无替代资产)
    /// - ReservationConflict: 替代资产在检出与解决之间已被占用
    #[instrument(skip(self, ctx), fields(conflict_id = %conflict_id, strategy = %strategy))]
    pub fn resolve(
        &self,
        conflict_id: &str,
        strategy: ResolutionStrategy,
        ctx: &ResolutionContext,
    ) -> RepositoryResult<ResolutionOutcome> {
        // 进入 RESOLVING (持锁窗口内完成状态检查与迁移)
        let conflict = {
            let mut registry = self.lock_registry()?;
            let tracked =
                registry
                    .get_mut(conflict_id)
                    .ok_or_else(|| RepositoryError::NotFound {
                        entity: "Conflict".to_string(),
                        id: conflict_id.to_string(),
                    })?;

            if !tracked.state.can_enter_resolving() {
                return Err(RepositoryError::InvalidStateTransition {
                    from: tracked.state.to_string(),
                    to: ConflictState::Resolving.to_string(),
                });
            }
            tracked.state = ConflictState::Resolving;
            tracked.conflict.clone()
        };

        match self.apply_strategy(&conflict, strategy, ctx) {
            Ok(outcome) => {
                self.set_state(conflict_id, ConflictState::Resolved, None)?;
                info!("冲突解决成功");
                self.event_publisher.publish(
                    AllocationEvent::new(AllocationEventType::ConflictResolved)
                        .with_product(&conflict.product_id)
                        .with_order(&ctx.order_id)
                        .with_detail(strategy.as_str()),
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "冲突解决失败, 回到 DETECTED");
                self.set_state(conflict_id, ConflictState::Detected, Some(e.to_string()))?;
                Err(e)
            }
        }
    }

    // ==========================================
    // 策略实现
    // ==========================================

    fn apply_strategy(
        &self,
        conflict: &Conflict,
        strategy: ResolutionStrategy,
        ctx: &ResolutionContext,
    ) -> RepositoryResult<ResolutionOutcome> {
        match strategy {
            ResolutionStrategy::Force => self.apply_force(conflict, ctx),
            ResolutionStrategy::Alternative => self.apply_alternative(conflict, ctx),
            ResolutionStrategy::Cancel => self.apply_cancel(conflict, ctx),
        }
    }

    /// FORCE: 照常提交原请求资产, 有意打破既有预约的独占性保证
    fn apply_force(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> RepositoryResult<ResolutionOutcome> {
        // 红线4: 配置门控, 默认关闭
        let allowed = self
            .config
            .allow_force_override()
            .map_err(|e| RepositoryError::InternalError(format!("读取配置失败: {}", e)))?;
        if !allowed {
            return Err(RepositoryError::BusinessRuleViolation(
                "强制覆盖未启用: 需要在配置中开启 allow_force_override".to_string(),
            ));
        }

        let asset_id = conflict.asset_id.clone().ok_or_else(|| {
            RepositoryError::ValidationError(
                "缺口冲突无特定资产, 无法强制覆盖".to_string(),
            )
        })?;

        let reason = ctx.reason.as_deref().unwrap_or("(未填写理由)");
        let assignment = self.assigner.force_assign(
            &conflict.product_id,
            &ctx.order_id,
            &ctx.line_item_id,
            &[asset_id],
            conflict.requested_start,
            conflict.requested_end,
            &ctx.operator,
            reason,
        )?;

        Ok(ResolutionOutcome {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::Force,
            success: true,
            new_reservations: assignment.reservations,
            message: Some("已强制提交, 既有预约的独占性保证被打破".to_string()),
        })
    }

    /// ALTERNATIVE: 改用替代资产, 原冲突预约保持不动
    fn apply_alternative(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> RepositoryResult<ResolutionOutcome> {
        if conflict.alternative_assets.is_empty() {
            return Err(RepositoryError::ValidationError(
                "无可用替代资产".to_string(),
            ));
        }

        let chosen = match &ctx.chosen_alternative_id {
            Some(id) => conflict
                .alternative_assets
                .iter()
                .find(|a| &a.asset_id == id)
                .ok_or_else(|| {
                    RepositoryError::ValidationError(format!(
                        "指定的替代资产 {} 不在候选列表中",
                        id
                    ))
                })?,
            // 缺省取排序首位 (可取性最高)
            None => &conflict.alternative_assets[0],
        };

        // 替代资产可能在检出与解决之间被占用: assign 的提交前复核兜底,
        // 过期以 ReservationConflict 上浮, 调用方需重跑可用性检查
        let assignment = self.assigner.assign(
            &conflict.product_id,
            &ctx.order_id,
            &ctx.line_item_id,
            &[chosen.asset_id.clone()],
            conflict.requested_start,
            conflict.requested_end,
            &ctx.operator,
        )?;

        // 预约本体的审计已随 assign 同事务落库; 本条为补充记录, 失败不回滚预约
        let log = ActionLog::new(ActionType::ResolveAlternative, &ctx.operator)
            .with_order(&ctx.order_id, &ctx.line_item_id)
            .with_payload(&json!({
                "conflict_id": conflict.conflict_id,
                "original_asset_id": conflict.asset_id,
                "alternative_asset_id": chosen.asset_id,
            }));
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, "ResolveAlternative 审计日志写入失败(预约已提交)");
        }

        Ok(ResolutionOutcome {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::Alternative,
            success: true,
            new_reservations: assignment.reservations,
            message: Some(format!("已改用替代资产 {}", chosen.asset_number)),
        })
    }

    /// CANCEL: 放弃该资产需求 (数量减一), 不创建预约
    fn apply_cancel(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> RepositoryResult<ResolutionOutcome> {
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ResolveCancel, &ctx.operator)
                .with_order(&ctx.order_id, &ctx.line_item_id)
                .with_payload(&json!({
                    "conflict_id": conflict.conflict_id,
                    "asset_id": conflict.asset_id,
                    "missing_quantity": conflict.missing_quantity,
                })),
        )?;

        Ok(ResolutionOutcome {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::Cancel,
            success: true,
            new_reservations: vec![],
            message: Some("行项目需求数量减一, 未创建预约".to_string()),
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn lock_registry(
        &self,
    ) -> RepositoryResult<std::sync::MutexGuard<'_, HashMap<String, TrackedConflict>>> {
        self.registry
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn set_state(
        &self,
        conflict_id: &str,
        state: ConflictState,
        reason: Option<String>,
    ) -> RepositoryResult<()> {
        let mut registry = self.lock_registry()?;
        if let Some(tracked) = registry.get_mut(conflict_id) {
            tracked.state = state;
            tracked.reason = reason;
        }
        Ok(())
    }
}
