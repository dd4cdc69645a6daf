// ==========================================
// 租赁资产调度系统 - 预约仓储
// ==========================================
// 红线2: 同一资产的活动预约时间段不得重叠
// 红线3: 提交路径必须原子 (复核 + 写入在同一 IMMEDIATE 事务内)
// ==========================================
// 并发口径:
// - 读路径不加锁, 允许读到过期快照
// - create_batch 在 BEGIN IMMEDIATE 事务内重跑重叠检测后写入,
//   SQLite 写独占保证两个并发提交不会同时通过复核
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::reservation::Reservation;
use crate::domain::types::{AssetCondition, ReservationStatus};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::asset_repo::parse_datetime;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction,
    TransactionBehavior,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const RESERVATION_COLUMNS: &str = "reservation_id, asset_id, order_id, line_item_id, \
     start_date, end_date, status, created_at, created_by";

/// 日期列存储格式
const DATE_FMT: &str = "%Y-%m-%d";

// ==========================================
// ReservationRepository - 预约仓储
// ==========================================

/// 预约仓储
/// 职责: reservation 表的查询与原子批量写入
pub struct ReservationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReservationRepository {
    /// 创建新的预约仓储实例
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

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按 reservation_id 查询预约
    pub fn find_by_id(&self, reservation_id: &str) -> RepositoryResult<Option<Reservation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM reservation WHERE reservation_id = ?1",
            RESERVATION_COLUMNS
        );
        let reservation = conn
            .query_row(&sql, params![reservation_id], Self::map_row)
            .optional()?;
        Ok(reservation)
    }

    /// 查询资产在给定闭区间内的活动预约
    ///
    /// 重叠口径: existing.start <= ?end AND existing.end >= ?start
    /// (与 domain::ranges_overlap 保持一致)
    pub fn list_active_overlapping(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<Reservation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM reservation
             WHERE asset_id = ?1
               AND status = 'ACTIVE'
               AND start_date <= ?3
               AND end_date >= ?2
             ORDER BY start_date",
            RESERVATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let reservations = stmt
            .query_map(
                params![
                    asset_id,
                    start_date.format(DATE_FMT).to_string(),
                    end_date.format(DATE_FMT).to_string(),
                ],
                Self::map_row,
            )?
            .collect::<SqliteResult<Vec<Reservation>>>()?;
        Ok(reservations)
    }

    /// 查询资产的全部活动预约
    pub fn list_active_by_asset(&self, asset_id: &str) -> RepositoryResult<Vec<Reservation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM reservation
             WHERE asset_id = ?1 AND status = 'ACTIVE'
             ORDER BY start_date",
            RESERVATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let reservations = stmt
            .query_map(params![asset_id], Self::map_row)?
            .collect::<SqliteResult<Vec<Reservation>>>()?;
        Ok(reservations)
    }

    /// 查询订单的全部活动预约
    pub fn list_active_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Reservation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM reservation
             WHERE order_id = ?1 AND status = 'ACTIVE'
             ORDER BY start_date, asset_id",
            RESERVATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let reservations = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<SqliteResult<Vec<Reservation>>>()?;
        Ok(reservations)
    }

    // ==========================================
    // 原子批量写入 (红线3)
    // ==========================================

    /// 原子批量创建预约（提交前复核）
    ///
    /// 在同一 BEGIN IMMEDIATE 事务内:
    /// 1. 逐资产复核成色与重叠 (可用性检查结果可能已过期)
    /// 2. 任一资产被阻塞 -> 整体回滚, 返回 ReservationConflict
    /// 3. 全部通过 -> 写入 N 条 ACTIVE 预约并递增 asset.reservation_rev,
    ///    随附审计日志同事务落库
    ///
    /// # 返回
    /// - Ok(Vec<Reservation>): 创建的预约（全部成功）
    /// - Err(ReservationConflict): 至少一个资产在提交时已不可用, 零写入
    #[allow(clippy::too_many_arguments)]
    pub fn create_batch(
        &self,
        asset_ids: &[String],
        order_id: &str,
        line_item_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_by: Option<&str>,
        audit: Option<&ActionLog>,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.create_batch_inner(
            asset_ids,
            order_id,
            line_item_id,
            start_date,
            end_date,
            created_by,
            audit,
            true,
        )
    }

    /// 原子批量创建预约（豁免重叠检测）
    ///
    /// 仅供强制覆盖策略使用: 有意打破既有预约的独占性保证。
    /// 维修/报废资产仍然不可提交 (红线1 不可豁免)。
    #[allow(clippy::too_many_arguments)]
    pub fn create_batch_unchecked(
        &self,
        asset_ids: &[String],
        order_id: &str,
        line_item_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_by: Option<&str>,
        audit: Option<&ActionLog>,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.create_batch_inner(
            asset_ids,
            order_id,
            line_item_id,
            start_date,
            end_date,
            created_by,
            audit,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn create_batch_inner(
        &self,
        asset_ids: &[String],
        order_id: &str,
        line_item_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_by: Option<&str>,
        audit: Option<&ActionLog>,
        enforce_exclusivity: bool,
    ) -> RepositoryResult<Vec<Reservation>> {
        if asset_ids.is_empty() {
            return Err(RepositoryError::ValidationError(
                "资产列表不能为空".to_string(),
            ));
        }

        let start_str = start_date.format(DATE_FMT).to_string();
        let end_str = end_date.format(DATE_FMT).to_string();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 提交前复核: 成色 + 重叠, 任一失败整体回滚
        let mut blocked: Vec<String> = Vec::new();
        for asset_id in asset_ids {
            let condition: Option<String> = tx
                .query_row(
                    "SELECT condition FROM asset WHERE asset_id = ?1",
                    params![asset_id],
                    |row| row.get(0),
                )
                .optional()?;

            let condition = match condition {
                Some(c) => c,
                None => {
                    return Err(RepositoryError::NotFound {
                        entity: "Asset".to_string(),
                        id: asset_id.clone(),
                    });
                }
            };

            let allocatable = AssetCondition::from_str(&condition)
                .map(|c| c.is_allocatable())
                .unwrap_or(false);
            if !allocatable {
                blocked.push(asset_id.clone());
                continue;
            }

            if enforce_exclusivity {
                let overlapping: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM reservation
                     WHERE asset_id = ?1
                       AND status = 'ACTIVE'
                       AND start_date <= ?3
                       AND end_date >= ?2",
                    params![asset_id, start_str, end_str],
                    |row| row.get(0),
                )?;
                if overlapping > 0 {
                    blocked.push(asset_id.clone());
                }
            }
        }

        if !blocked.is_empty() {
            // 事务随 drop 回滚, 零写入
            return Err(RepositoryError::ReservationConflict { asset_ids: blocked });
        }

        let created =
            Self::insert_batch_tx(&tx, asset_ids, order_id, line_item_id, start_date, end_date, created_by)?;

        // 审计日志与预约同事务落库: 要么都提交, 要么都回滚 (红线4)
        if let Some(log) = audit {
            ActionLogRepository::insert_with(&tx, log)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(created)
    }

    /// 事务内写入 N 条预约并递增 reservation_rev
    fn insert_batch_tx(
        tx: &Transaction<'_>,
        asset_ids: &[String],
        order_id: &str,
        line_item_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_by: Option<&str>,
    ) -> RepositoryResult<Vec<Reservation>> {
        let now = chrono::Utc::now();
        let now_str = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let start_str = start_date.format(DATE_FMT).to_string();
        let end_str = end_date.format(DATE_FMT).to_string();

        let mut created = Vec::with_capacity(asset_ids.len());
        for asset_id in asset_ids {
            let reservation_id = Uuid::new_v4().to_string();

            tx.execute(
                r#"INSERT INTO reservation (
                    reservation_id, asset_id, order_id, line_item_id,
                    start_date, end_date, status, created_at, created_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ACTIVE', ?7, ?8)"#,
                params![
                    reservation_id,
                    asset_id,
                    order_id,
                    line_item_id,
                    start_str,
                    end_str,
                    now_str,
                    created_by,
                ],
            )?;

            // 预约修订号: 每次预约写入递增, 供外部乐观读使用
            tx.execute(
                "UPDATE asset
                 SET reservation_rev = reservation_rev + 1,
                     updated_at = datetime('now')
                 WHERE asset_id = ?1",
                params![asset_id],
            )?;

            created.push(Reservation {
                reservation_id,
                asset_id: asset_id.clone(),
                order_id: order_id.to_string(),
                line_item_id: line_item_id.to_string(),
                start_date,
                end_date,
                status: ReservationStatus::Active,
                created_at: now,
                created_by: created_by.map(|s| s.to_string()),
            });
        }

        Ok(created)
    }

    // ==========================================
    // 取消
    // ==========================================

    /// 取消预约 (ACTIVE -> CANCELLED)
    ///
    /// # 参数
    /// - cancelled_by: 操作人（缺省记为 system）
    ///
    /// # 错误
    /// - NotFound: reservation_id 不存在
    /// - InvalidStateTransition: 预约已取消
    pub fn cancel(&self, reservation_id: &str, cancelled_by: Option<&str>) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows_affected = tx.execute(
            "UPDATE reservation SET status = 'CANCELLED'
             WHERE reservation_id = ?1 AND status = 'ACTIVE'",
            params![reservation_id],
        )?;

        if rows_affected == 0 {
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM reservation WHERE reservation_id = ?1",
                    params![reservation_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match current {
                None => Err(RepositoryError::NotFound {
                    entity: "Reservation".to_string(),
                    id: reservation_id.to_string(),
                }),
                Some(status) => Err(RepositoryError::InvalidStateTransition {
                    from: status,
                    to: "CANCELLED".to_string(),
                }),
            };
        }

        // 取消同样是预约写入, 递增修订号
        tx.execute(
            "UPDATE asset
             SET reservation_rev = reservation_rev + 1,
                 updated_at = datetime('now')
             WHERE asset_id = (SELECT asset_id FROM reservation WHERE reservation_id = ?1)",
            params![reservation_id],
        )?;

        let audit = ActionLog::new(
            crate::domain::action_log::ActionType::CancelReservation,
            cancelled_by.unwrap_or("system"),
        )
        .with_payload(&serde_json::json!({ "reservation_id": reservation_id }));
        ActionLogRepository::insert_with(&tx, &audit)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> SqliteResult<Reservation> {
        let start_raw: String = row.get(4)?;
        let end_raw: String = row.get(5)?;
        let status_raw: String = row.get(6)?;

        Ok(Reservation {
            reservation_id: row.get(0)?,
            asset_id: row.get(1)?,
            order_id: row.get(2)?,
            line_item_id: row.get(3)?,
            start_date: NaiveDate::parse_from_str(&start_raw, DATE_FMT)
                .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
            end_date: NaiveDate::parse_from_str(&end_raw, DATE_FMT)
                .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
            status: ReservationStatus::from_str(&status_raw)
                .unwrap_or(ReservationStatus::Cancelled),
            created_at: parse_datetime(&row.get::<_, String>(7)?),
            created_by: row.get(8)?,
        })
    }
}
