// ==========================================
// 租赁资产调度系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AssignmentApi, AvailabilityApi, ConflictApi};
use crate::config::config_manager::ConfigManager;
use crate::engine::{
    AllocationEventPublisher, AssetRanker, AvailabilityChecker, BulkAssigner, ConflictResolver,
    OptionalEventPublisher,
};
use crate::repository::{ActionLogRepository, AssetRepository, ReservationRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 可用性API
    pub availability_api: Arc<AvailabilityApi>,

    /// 指派API
    pub assignment_api: Arc<AssignmentApi>,

    /// 冲突API
    pub conflict_api: Arc<ConflictApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - event_publisher: 可选事件发布者（可观测性下游）
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并初始化 schema（幂等）
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn new(
        db_path: String,
        event_publisher: Option<Arc<dyn AllocationEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState, 数据库路径: {}", db_path);

        // 创建数据库连接（共享连接, 统一 PRAGMA）
        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let asset_repo = Arc::new(AssetRepository::from_connection(conn.clone()));
        let reservation_repo = Arc::new(ReservationRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法初始化配置管理器: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let ranker = Arc::new(AssetRanker::new());

        let checker = Arc::new(AvailabilityChecker::new(
            asset_repo.clone(),
            reservation_repo.clone(),
            ranker.clone(),
        ));

        let assigner_publisher = match &event_publisher {
            Some(publisher) => OptionalEventPublisher::with_publisher(publisher.clone()),
            None => OptionalEventPublisher::none(),
        };
        let assigner = Arc::new(BulkAssigner::new(
            asset_repo.clone(),
            reservation_repo.clone(),
            ranker.clone(),
            assigner_publisher,
        ));

        let resolver_publisher = match &event_publisher {
            Some(publisher) => OptionalEventPublisher::with_publisher(publisher.clone()),
            None => OptionalEventPublisher::none(),
        };
        let resolver = Arc::new(ConflictResolver::new(
            assigner.clone(),
            config_manager.clone(),
            action_log_repo.clone(),
            resolver_publisher,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let availability_api = Arc::new(AvailabilityApi::new(
            checker.clone(),
            resolver.clone(),
            config_manager.clone(),
        ));
        let assignment_api = Arc::new(AssignmentApi::new(
            assigner.clone(),
            checker.clone(),
            resolver.clone(),
        ));
        let conflict_api = Arc::new(ConflictApi::new(
            resolver,
            checker,
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化成功");

        Ok(Self {
            db_path,
            availability_api,
            assignment_api,
            conflict_api,
            action_log_repo,
            config_manager,
        })
    }
}
