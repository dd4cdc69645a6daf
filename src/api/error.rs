// ==========================================
// 租赁资产调度系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换Repository错误为用户友好的错误消息
// 红线5: 所有错误信息必须包含显式原因 (可解释性)
// ==========================================

use crate::domain::availability::Conflict;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 红线4: FORCE 策略需要显式授权
    #[error("强制覆盖被拒绝: {0}")]
    ForceOverrideDenied(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    /// 可用性已过期: 提交时复核发现状态变化, 携带最新冲突集
    /// 调用方应重新呈现冲突/替代候选, 而非静默重试
    #[error("可用性已过期: {message}")]
    StaleAvailability {
        message: String,
        conflicts: Vec<Conflict>,
    },

    /// 瞬时错误, 可从头安全重试 (重跑可用性检查)
    #[error("操作超时: {0}")]
    Timeout(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 为 StaleAvailability 填充最新冲突集（其余变体原样返回）
    pub fn with_conflicts(self, conflicts: Vec<Conflict>) -> Self {
        match self {
            ApiError::StaleAvailability { message, .. } => {
                ApiError::StaleAvailability { message, conflicts }
            }
            other => other,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::ReservationConflict { asset_ids } => ApiError::StaleAvailability {
                message: format!("提交时复核发现资产已不可用: {}", asset_ids.join(", ")),
                conflicts: vec![],
            },
            RepositoryError::Busy(msg) => {
                ApiError::Timeout(format!("数据库忙, 请重跑可用性检查后重试: {}", msg))
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => {
                // 强制覆盖门控相关错误单独归类
                if msg.contains("强制覆盖") {
                    ApiError::ForceOverrideDenied(msg)
                } else {
                    ApiError::BusinessRuleViolation(msg)
                }
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
