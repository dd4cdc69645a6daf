// ==========================================
// 租赁资产调度系统 - 应用层
// ==========================================

pub mod state;

pub use state::AppState;

/// 获取默认数据库路径（系统数据目录下）
///
/// 目录不存在时尽力创建; 创建失败回退到当前目录
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("rental-asset-engine");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("数据目录创建失败, 回退到当前目录: {}", e);
        return "rental_assets.db".to_string();
    }
    dir.join("rental_assets.db").to_string_lossy().to_string()
}
