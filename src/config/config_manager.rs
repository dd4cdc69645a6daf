// ==========================================
// 租赁资产调度系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键全集
// ==========================================
pub mod config_keys {
    // ===== 冲突解决 =====
    /// 是否允许 FORCE 策略 (红线4: 默认关闭)
    pub const ALLOW_FORCE_OVERRIDE: &str = "allow_force_override";

    // ===== 可用性检查 =====
    /// 请求区间最大跨度（天）
    pub const MAX_REQUEST_WINDOW_DAYS: &str = "max_request_window_days";

    /// 替代候选预览条数（仅作用于展示层截断, 引擎返回完整列表）
    pub const ALTERNATIVE_PREVIEW_COUNT: &str = "alternative_preview_count";
}

/// 配置默认值
pub mod config_defaults {
    pub const ALLOW_FORCE_OVERRIDE: bool = false;
    pub const MAX_REQUEST_WINDOW_DAYS: i64 = 365;
    pub const ALTERNATIVE_PREVIEW_COUNT: i64 = 3;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = crate::db::open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT OR REPLACE INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))"#,
            params![key, value],
        )?;
        Ok(())
    }

    // ==========================================
    // 类型化读取
    // ==========================================

    /// 是否允许 FORCE 策略 (红线4: 默认关闭)
    pub fn allow_force_override(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            config_keys::ALLOW_FORCE_OVERRIDE,
            if config_defaults::ALLOW_FORCE_OVERRIDE {
                "true"
            } else {
                "false"
            },
        )?;
        Ok(raw.trim().eq_ignore_ascii_case("true"))
    }

    /// 请求区间最大跨度（天）
    pub fn max_request_window_days(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            config_keys::MAX_REQUEST_WINDOW_DAYS,
            &config_defaults::MAX_REQUEST_WINDOW_DAYS.to_string(),
        )?;
        Ok(raw
            .trim()
            .parse::<i64>()
            .unwrap_or(config_defaults::MAX_REQUEST_WINDOW_DAYS))
    }

    /// 替代候选预览条数（展示层截断用）
    pub fn alternative_preview_count(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            config_keys::ALTERNATIVE_PREVIEW_COUNT,
            &config_defaults::ALTERNATIVE_PREVIEW_COUNT.to_string(),
        )?;
        Ok(raw
            .trim()
            .parse::<i64>()
            .unwrap_or(config_defaults::ALTERNATIVE_PREVIEW_COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = setup();
        assert!(!config.allow_force_override().unwrap());
        assert_eq!(config.max_request_window_days().unwrap(), 365);
        assert_eq!(config.alternative_preview_count().unwrap(), 3);
    }

    #[test]
    fn test_override_and_read_back() {
        let config = setup();
        config
            .set_global_config_value(config_keys::ALLOW_FORCE_OVERRIDE, "true")
            .unwrap();
        config
            .set_global_config_value(config_keys::MAX_REQUEST_WINDOW_DAYS, "30")
            .unwrap();

        assert!(config.allow_force_override().unwrap());
        assert_eq!(config.max_request_window_days().unwrap(), 30);
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let config = setup();
        config
            .set_global_config_value(config_keys::ALTERNATIVE_PREVIEW_COUNT, "many")
            .unwrap();
        assert_eq!(config.alternative_preview_count().unwrap(), 3);
    }
}
