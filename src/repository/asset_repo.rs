// ==========================================
// 租赁资产调度系统 - 资产目录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 引擎对 product / asset 只读; 写入方为外部库存/维护流程
// ==========================================

use crate::domain::asset::{Asset, Product};
use crate::domain::types::AssetCondition;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use tracing::warn;

const ASSET_COLUMNS: &str = "asset_id, product_id, asset_number, serial_number, condition, \
     last_service_date, location, reservation_rev, created_at, updated_at";

// ==========================================
// AssetRepository - 资产目录仓储
// ==========================================

/// 资产目录仓储
/// 职责: product / asset 表的只读访问
pub struct AssetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssetRepository {
    /// 创建新的资产目录仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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
    // Product 查询
    // ==========================================

    /// 产品是否存在
    pub fn product_exists(&self, product_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: Option<bool> = conn
            .query_row(
                "SELECT 1 FROM product WHERE product_id = ?1 LIMIT 1",
                params![product_id],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(exists.unwrap_or(false))
    }

    /// 按 product_id 查询产品
    pub fn find_product(&self, product_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT product_id, name, created_at FROM product WHERE product_id = ?1",
                params![product_id],
                |row| {
                    Ok(Product {
                        product_id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                    })
                },
            )
            .optional()?;
        Ok(product)
    }

    // ==========================================
    // Asset 查询
    // ==========================================

    /// 按 asset_id 查询单个资产
    pub fn find_by_id(&self, asset_id: &str) -> RepositoryResult<Option<Asset>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM asset WHERE asset_id = ?1", ASSET_COLUMNS);
        let asset = conn
            .query_row(&sql, params![asset_id], Self::map_row)
            .optional()?;
        Ok(asset)
    }

    /// 查询产品下全部资产（含维修/报废）
    ///
    /// # 返回
    /// - Ok(Vec<Asset>): 按 asset_number 排序的资产列表
    pub fn list_by_product(&self, product_id: &str) -> RepositoryResult<Vec<Asset>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM asset WHERE product_id = ?1 ORDER BY asset_number",
            ASSET_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assets = stmt
            .query_map(params![product_id], Self::map_row)?
            .collect::<SqliteResult<Vec<Asset>>>()?;
        Ok(assets)
    }

    /// 查询产品下可参与分配的资产（红线1: 排除维修/报废）
    pub fn list_allocatable_by_product(&self, product_id: &str) -> RepositoryResult<Vec<Asset>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM asset
             WHERE product_id = ?1
               AND condition NOT IN ('MAINTENANCE', 'RETIRED')
             ORDER BY asset_number",
            ASSET_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assets = stmt
            .query_map(params![product_id], Self::map_row)?
            .collect::<SqliteResult<Vec<Asset>>>()?;
        Ok(assets)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> SqliteResult<Asset> {
        let condition_raw: String = row.get(4)?;
        // 未知成色按报废处理, 避免误配 (红线1 的保守侧)
        let condition = AssetCondition::from_str(&condition_raw).unwrap_or_else(|| {
            warn!(condition = %condition_raw, "未知资产成色, 按 RETIRED 处理");
            AssetCondition::Retired
        });

        let last_service_date: Option<String> = row.get(5)?;

        Ok(Asset {
            asset_id: row.get(0)?,
            product_id: row.get(1)?,
            asset_number: row.get(2)?,
            serial_number: row.get(3)?,
            condition,
            last_service_date: last_service_date
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            location: row.get(6)?,
            reservation_rev: row.get(7)?,
            created_at: parse_datetime(&row.get::<_, String>(8)?),
            updated_at: parse_datetime(&row.get::<_, String>(9)?),
        })
    }
}

/// 解析 datetime('now') 格式的时间戳 (UTC)
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default())
}
