// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    rental_asset_engine::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 日期简写（2026年3月）
pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

/// 写入产品
pub fn seed_product(conn: &Connection, product_id: &str, name: &str) {
    conn.execute(
        "INSERT INTO product (product_id, name) VALUES (?1, ?2)",
        params![product_id, name],
    )
    .unwrap();
}

/// 写入资产
///
/// # 参数
/// - condition: 成色（EXCELLENT/GOOD/FAIR/POOR/MAINTENANCE/RETIRED）
/// - last_service_date: 最近维护日期（"YYYY-MM-DD" 或 None）
pub fn seed_asset(
    conn: &Connection,
    asset_id: &str,
    product_id: &str,
    condition: &str,
    last_service_date: Option<&str>,
) {
    conn.execute(
        r#"INSERT INTO asset (
            asset_id, product_id, asset_number, serial_number,
            condition, last_service_date
        ) VALUES (?1, ?2, ?3, NULL, ?4, ?5)"#,
        params![asset_id, product_id, asset_id, condition, last_service_date],
    )
    .unwrap();
}

/// 写入活动预约
pub fn seed_reservation(
    conn: &Connection,
    reservation_id: &str,
    asset_id: &str,
    order_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) {
    conn.execute(
        r#"INSERT INTO reservation (
            reservation_id, asset_id, order_id, line_item_id,
            start_date, end_date, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ACTIVE')"#,
        params![
            reservation_id,
            asset_id,
            order_id,
            format!("{}-L1", order_id),
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        ],
    )
    .unwrap();
}

/// 统计资产的活动预约数
pub fn count_active_reservations(conn: &Connection, asset_id: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM reservation WHERE asset_id = ?1 AND status = 'ACTIVE'",
        params![asset_id],
        |row| row.get(0),
    )
    .unwrap()
}

/// 统计指定类型的操作日志条数
pub fn count_action_logs(conn: &Connection, action_type: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM action_log WHERE action_type = ?1",
        params![action_type],
        |row| row.get(0),
    )
    .unwrap()
}
