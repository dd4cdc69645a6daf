// ==========================================
// 租赁资产调度系统 - 可用性 API
// ==========================================
// 职责: 可用性查询入口, 参数校验, 冲突登记
// 红线5: 可解释性 (冲突携带类型/窗口/替代候选)
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::availability::{AvailabilityRequest, AvailabilityResult};
use crate::engine::availability::AvailabilityChecker;
use crate::engine::resolver::ConflictResolver;

// ==========================================
// BulkAvailabilityLine - 批量查询行项目
// ==========================================
/// 批量查询的单个行项目（同一批共享日期范围）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAvailabilityLine {
    pub product_id: String,
    pub quantity: i32,
}

// ==========================================
// AvailabilityApi - 可用性 API
// ==========================================

/// 可用性API
///
/// 职责：
/// 1. 单产品/批量可用性查询
/// 2. 入参校验（含请求区间跨度上限）
/// 3. 将检出的冲突登记到冲突登记簿, 供后续 resolve 寻址
pub struct AvailabilityApi {
    checker: Arc<AvailabilityChecker>,
    resolver: Arc<ConflictResolver>,
    config: Arc<ConfigManager>,
}

impl AvailabilityApi {
    /// 创建新的AvailabilityApi实例
    pub fn new(
        checker: Arc<AvailabilityChecker>,
        resolver: Arc<ConflictResolver>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            checker,
            resolver,
            config,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 单产品可用性查询
    ///
    /// # 返回
    /// - Ok(AvailabilityResult): 空闲资产 + 冲突集（已登记）
    /// - Err(ApiError): 参数错误 / 产品不存在
    ///
    /// 只读, 无副作用（登记簿除外）, 幂等可重试
    pub fn check_availability(
        &self,
        product_id: &str,
        quantity: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<AvailabilityResult> {
        if product_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
        }
        if quantity <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "请求数量必须大于 0: {}",
                quantity
            )));
        }
        self.validate_window(start_date, end_date)?;

        let request = AvailabilityRequest::new(product_id, quantity, start_date, end_date);
        let result = self.checker.check(&request)?;

        if !result.conflicts.is_empty() {
            debug!(
                conflicts = result.conflicts.len(),
                "检出冲突, 登记到冲突登记簿"
            );
            self.resolver.register(&result.conflicts)?;
        }

        Ok(result)
    }

    /// 批量可用性查询（多行项目, 共享日期范围）
    ///
    /// 批内暂占保证同一资产不会被多个行项目同时提名;
    /// 跨操作员独占性只在提交时保证。
    pub fn check_bulk_availability(
        &self,
        lines: &[BulkAvailabilityLine],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<Vec<AvailabilityResult>> {
        if lines.is_empty() {
            return Err(ApiError::InvalidInput("行项目列表不能为空".to_string()));
        }
        for line in lines {
            if line.product_id.trim().is_empty() {
                return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
            }
            if line.quantity <= 0 {
                return Err(ApiError::InvalidInput(format!(
                    "请求数量必须大于 0: {}",
                    line.quantity
                )));
            }
        }
        self.validate_window(start_date, end_date)?;

        let requests: Vec<AvailabilityRequest> = lines
            .iter()
            .map(|line| {
                AvailabilityRequest::new(&line.product_id, line.quantity, start_date, end_date)
            })
            .collect();

        let results = self.checker.check_bulk(&requests)?;

        for result in &results {
            if !result.conflicts.is_empty() {
                self.resolver.register(&result.conflicts)?;
            }
        }

        Ok(results)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 请求区间校验（含最大跨度配置）
    fn validate_window(&self, start_date: NaiveDate, end_date: NaiveDate) -> ApiResult<()> {
        if start_date > end_date {
            return Err(ApiError::ValidationError(format!(
                "日期范围无效: {} > {}",
                start_date, end_date
            )));
        }

        let max_days = self
            .config
            .max_request_window_days()
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;
        let span_days = (end_date - start_date).num_days() + 1;
        if span_days > max_days {
            return Err(ApiError::ValidationError(format!(
                "请求区间跨度 {} 天超过上限 {} 天",
                span_days, max_days
            )));
        }
        Ok(())
    }
}
