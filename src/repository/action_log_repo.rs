// ==========================================
// 租赁资产调度系统 - 操作日志仓储
// ==========================================
// 红线4: 所有写路径必须记录
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ACTION_LOG_COLUMNS: &str =
    "action_id, action_type, action_ts, actor, order_id, line_item_id, payload_json, detail";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================

/// 操作日志仓储
/// 职责: action_log 表的写入与查询
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一条操作日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, log)
    }

    /// 在给定连接/事务上写入操作日志
    ///
    /// 供预约仓储在提交事务内联动写入 (预约与审计同事务落库)
    pub(crate) fn insert_with(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO action_log (
                action_id, action_type, action_ts, actor,
                order_id, line_item_id, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.order_id,
                log.line_item_id,
                log.payload_json
                    .as_ref()
                    .map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(())
    }

    /// 查询最近的操作日志
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, action_id LIMIT ?1",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 按订单查询操作日志
    pub fn list_by_order(&self, order_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE order_id = ?1 ORDER BY action_ts DESC",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 按操作类型查询操作日志（审计: 如全部强制覆盖记录）
    pub fn list_by_action_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_type = ?1 ORDER BY action_ts DESC",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![action_type], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<ActionLog> {
        let ts_raw: String = row.get(2)?;
        let payload_raw: Option<String> = row.get(6)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts: NaiveDateTime::parse_from_str(&ts_raw, "%Y-%m-%d %H:%M:%S")
                .unwrap_or_else(|_| chrono::DateTime::<chrono::Utc>::default().naive_utc()),
            actor: row.get(3)?,
            order_id: row.get(4)?,
            line_item_id: row.get(5)?,
            payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
