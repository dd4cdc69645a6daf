// ==========================================
// 租赁资产调度系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 资产可用性与冲突解决引擎
// ==========================================

use rental_asset_engine::app::{get_default_db_path, AppState};

fn main() {
    // 初始化日志系统
    rental_asset_engine::logging::init();

    tracing::info!("==================================================");
    tracing::info!("租赁资产调度系统 - 资产可用性与冲突解决引擎");
    tracing::info!("系统版本: {}", rental_asset_engine::VERSION);
    tracing::info!("==================================================");

    // 数据库路径: 首个命令行参数, 缺省取系统数据目录
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    // 装配所有仓储/引擎/API
    let app_state = AppState::new(db_path, None).expect("无法初始化AppState");

    // 自检: 读取 schema 版本
    match rental_asset_engine::db::open_sqlite_connection(&app_state.db_path)
        .and_then(|conn| rental_asset_engine::db::read_schema_version(&conn))
    {
        Ok(Some(version)) => tracing::info!("schema_version = {}", version),
        Ok(None) => tracing::warn!("schema_version 表缺失"),
        Err(e) => tracing::error!("schema 自检失败: {}", e),
    }

    tracing::info!("引擎就绪 (库模式调用: rental_asset_engine::app::AppState)");
}
