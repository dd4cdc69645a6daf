// ==========================================
// 租赁资产调度系统 - 可用性检查引擎
// ==========================================
// 职责: 计算请求区间内的空闲资产集与冲突集
// 并发口径: 只读快照, 不加锁, 允许过期; 过期在提交路径复核兜底
// 红线1: 维修/报废资产永不返回为空闲
// 红线5: 冲突必须携带类型/窗口/替代候选 (可解释性)
// ==========================================

use crate::domain::asset::Asset;
use crate::domain::availability::{AvailabilityRequest, AvailabilityResult, Conflict};
use crate::engine::ranker::AssetRanker;
use crate::repository::asset_repo::AssetRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reservation_repo::ReservationRepository;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

// ==========================================
// AvailabilityChecker - 可用性检查引擎
// ==========================================
pub struct AvailabilityChecker {
    asset_repo: Arc<AssetRepository>,
    reservation_repo: Arc<ReservationRepository>,
    ranker: Arc<AssetRanker>,
}

impl AvailabilityChecker {
    /// 创建新的可用性检查引擎实例
    pub fn new(
        asset_repo: Arc<AssetRepository>,
        reservation_repo: Arc<ReservationRepository>,
        ranker: Arc<AssetRanker>,
    ) -> Self {
        Self {
            asset_repo,
            reservation_repo,
            ranker,
        }
    }

    // ==========================================
    // 单请求检查
    // ==========================================

    /// 可用性检查
    ///
    /// # 算法
    /// 1. 加载产品下可分配资产 (排除维修/报废)
    /// 2. 逐资产查重叠活动预约, 零重叠者为空闲
    /// 3. 空闲数 < 请求数时产生一条缺口冲突
    ///    (替代候选 = 排序后的完整空闲列表, 引擎不截断)
    ///
    /// # 错误
    /// - ValidationError: 日期范围无效或数量非正
    /// - NotFound: 产品不存在
    ///
    /// 只读, 幂等, 可安全重试
    #[instrument(skip(self, request), fields(
        product_id = %request.product_id,
        quantity = request.requested_quantity
    ))]
    pub fn check(&self, request: &AvailabilityRequest) -> RepositoryResult<AvailabilityResult> {
        Self::validate_request(request)?;
        self.ensure_product(&request.product_id)?;

        let free = self.free_assets(
            &request.product_id,
            request.start_date,
            request.end_date,
        )?;

        let mut conflicts = Vec::new();
        if (free.len() as i32) < request.requested_quantity {
            let missing = request.requested_quantity - free.len() as i32;
            debug!(
                free_count = free.len(),
                missing, "空闲资产不足, 产生缺口冲突"
            );
            conflicts.push(Conflict::shortfall(
                &request.product_id,
                request.start_date,
                request.end_date,
                missing,
                self.ranker.rank(free.clone()),
            ));
        }

        Ok(AvailabilityResult {
            product_id: request.product_id.clone(),
            requested_quantity: request.requested_quantity,
            start_date: request.start_date,
            end_date: request.end_date,
            free_assets: free,
            conflicts,
        })
    }

    /// 指定资产检查（操作员已显式选择资产时）
    ///
    /// 逐资产产生冲突:
    /// - OVERLAP: 与既有活动预约重叠 (窗口裁剪到交集, 携带阻塞订单)
    /// - MAINTENANCE: 资产处于维修/报废状态
    /// 替代候选 = 产品下空闲资产排除指定集后的排序列表
    ///
    /// free_assets 返回指定集中未被阻塞的资产
    #[instrument(skip(self, request, asset_ids), fields(
        product_id = %request.product_id,
        preselected = asset_ids.len()
    ))]
    pub fn check_preselected(
        &self,
        request: &AvailabilityRequest,
        asset_ids: &[String],
    ) -> RepositoryResult<AvailabilityResult> {
        Self::validate_request(request)?;
        self.ensure_product(&request.product_id)?;

        if asset_ids.is_empty() {
            return Err(RepositoryError::ValidationError(
                "指定资产列表不能为空".to_string(),
            ));
        }

        let preselected: HashSet<&str> = asset_ids.iter().map(|s| s.as_str()).collect();
        let free = self.free_assets(
            &request.product_id,
            request.start_date,
            request.end_date,
        )?;
        let alternatives = self.ranker.rank(
            free.into_iter()
                .filter(|a| !preselected.contains(a.asset_id.as_str()))
                .collect(),
        );

        let mut ok_assets = Vec::new();
        let mut conflicts = Vec::new();

        for asset_id in asset_ids {
            let asset = self.asset_repo.find_by_id(asset_id)?.ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "Asset".to_string(),
                    id: asset_id.clone(),
                }
            })?;

            if asset.product_id != request.product_id {
                return Err(RepositoryError::ValidationError(format!(
                    "资产 {} 不属于产品 {}",
                    asset_id, request.product_id
                )));
            }

            if !asset.is_allocatable() {
                conflicts.push(Conflict::asset_blocked_by_condition(
                    &request.product_id,
                    asset_id,
                    request.start_date,
                    request.end_date,
                    alternatives.clone(),
                ));
                continue;
            }

            let overlapping = self.reservation_repo.list_active_overlapping(
                asset_id,
                request.start_date,
                request.end_date,
            )?;

            match overlapping.first() {
                Some(blocking) => {
                    conflicts.push(Conflict::asset_overlap(
                        &request.product_id,
                        asset_id,
                        blocking,
                        request.start_date,
                        request.end_date,
                        alternatives.clone(),
                    ));
                }
                None => ok_assets.push(asset),
            }
        }

        Ok(AvailabilityResult {
            product_id: request.product_id.clone(),
            requested_quantity: request.requested_quantity,
            start_date: request.start_date,
            end_date: request.end_date,
            free_assets: ok_assets,
            conflicts,
        })
    }

    // ==========================================
    // 批量检查
    // ==========================================

    /// 批量可用性检查（多行项目一次提交）
    ///
    /// 批内暂占集: 每个行项目提名其排序前 requested_quantity 个空闲资产,
    /// 被提名资产不再作为后续行项目的空闲/替代候选出现。
    /// 暂占集仅作用于本次调用, 不构成跨请求锁 —— 跨操作员独占性
    /// 只在 BulkAssigner 提交时保证。
    ///
    /// 任一请求的产品不存在或参数无效时整体失败, 不产生部分结果。
    #[instrument(skip(self, requests), fields(batch_size = requests.len()))]
    pub fn check_bulk(
        &self,
        requests: &[AvailabilityRequest],
    ) -> RepositoryResult<Vec<AvailabilityResult>> {
        let mut claimed: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            Self::validate_request(request)?;
            self.ensure_product(&request.product_id)?;

            let free = self.free_assets(
                &request.product_id,
                request.start_date,
                request.end_date,
            )?;
            let available = self.ranker.rank(
                free.into_iter()
                    .filter(|a| !claimed.contains(&a.asset_id))
                    .collect(),
            );

            // 本行项目提名前 N 个, 进入批内暂占集
            let claim_count = available.len().min(request.requested_quantity as usize);
            for asset in available.iter().take(claim_count) {
                claimed.insert(asset.asset_id.clone());
            }

            let mut conflicts = Vec::new();
            if (available.len() as i32) < request.requested_quantity {
                let missing = request.requested_quantity - available.len() as i32;
                conflicts.push(Conflict::shortfall(
                    &request.product_id,
                    request.start_date,
                    request.end_date,
                    missing,
                    available.clone(),
                ));
            }

            results.push(AvailabilityResult {
                product_id: request.product_id.clone(),
                requested_quantity: request.requested_quantity,
                start_date: request.start_date,
                end_date: request.end_date,
                free_assets: available,
                conflicts,
            });
        }

        Ok(results)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 请求参数校验
    fn validate_request(request: &AvailabilityRequest) -> RepositoryResult<()> {
        if request.requested_quantity < 1 {
            return Err(RepositoryError::ValidationError(format!(
                "请求数量必须大于 0: {}",
                request.requested_quantity
            )));
        }
        if request.start_date > request.end_date {
            return Err(RepositoryError::ValidationError(format!(
                "日期范围无效: {} > {}",
                request.start_date, request.end_date
            )));
        }
        Ok(())
    }

    /// 产品存在性校验
    fn ensure_product(&self, product_id: &str) -> RepositoryResult<()> {
        if !self.asset_repo.product_exists(product_id)? {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }
        Ok(())
    }

    /// 请求区间内完全空闲的可分配资产
    fn free_assets(
        &self,
        product_id: &str,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    ) -> RepositoryResult<Vec<Asset>> {
        let assets = self.asset_repo.list_allocatable_by_product(product_id)?;

        let mut free = Vec::new();
        for asset in assets {
            let overlapping =
                self.reservation_repo
                    .list_active_overlapping(&asset.asset_id, start_date, end_date)?;
            if overlapping.is_empty() {
                free.push(asset);
            }
        }
        Ok(free)
    }
}
