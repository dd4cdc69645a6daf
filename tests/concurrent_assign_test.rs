// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证提交路径对并发双重预订的防御 (核心正确性性质)
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_assign_test {
    use rental_asset_engine::api::ApiError;
    use rental_asset_engine::app::AppState;
    use rusqlite::Connection;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::test_helpers::{count_active_reservations, create_test_db, d, seed_asset, seed_product};

    // ==========================================
    // 测试1: 同资产并发指派, 恰好一个成功
    // ==========================================

    #[test]
    fn test_concurrent_assign_same_asset_exactly_one_wins() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        {
            let conn = Connection::open(&db_path).unwrap();
            seed_product(&conn, "P001", "高空作业平台");
            seed_asset(&conn, "A1", "P001", "GOOD", None);
        }

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();

        for operator in ["op01", "op02"] {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                // 每个线程独立连接 (跨操作员场景)
                let app = AppState::new(db_path, None).unwrap();
                barrier.wait();
                app.assignment_api.assign_bulk_assets(
                    "P001",
                    &format!("O-{}", operator),
                    "L001",
                    &["A1".to_string()],
                    d(1),
                    d(10),
                    operator,
                )
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(success_count, 1, "并发指派同一资产必须恰好一个成功");

        // 失败侧必须是可用性过期 (或写竞争超时), 且零写入
        for result in &results {
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        ApiError::StaleAvailability { .. } | ApiError::Timeout(_)
                    ),
                    "意外的失败类型: {:?}",
                    e
                );
            }
        }

        // 红线2: 任何时刻活动预约不重叠 (此处: 仅一条)
        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count_active_reservations(&conn, "A1"), 1);
    }

    // ==========================================
    // 测试2: 不同资产并发指派, 两个都成功
    // ==========================================

    #[test]
    fn test_concurrent_assign_distinct_assets_both_win() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        {
            let conn = Connection::open(&db_path).unwrap();
            seed_product(&conn, "P001", "高空作业平台");
            seed_asset(&conn, "A1", "P001", "GOOD", None);
            seed_asset(&conn, "A2", "P001", "GOOD", None);
        }

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();

        for (operator, asset_id) in [("op01", "A1"), ("op02", "A2")] {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            let asset_id = asset_id.to_string();
            handles.push(thread::spawn(move || {
                let app = AppState::new(db_path, None).unwrap();
                barrier.wait();
                app.assignment_api.assign_bulk_assets(
                    "P001",
                    &format!("O-{}", operator),
                    "L001",
                    &[asset_id],
                    d(1),
                    d(10),
                    operator,
                )
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        // busy_timeout 兜底写竞争, 两个不同资产的提交都应落库
        assert!(
            results.iter().all(|r| r.is_ok()),
            "不同资产的并发指派不应互斥: {:?}",
            results.iter().filter_map(|r| r.as_ref().err()).collect::<Vec<_>>()
        );

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count_active_reservations(&conn, "A1"), 1);
        assert_eq!(count_active_reservations(&conn, "A2"), 1);
    }

    // ==========================================
    // 测试3: 错开区间的并发指派互不阻塞
    // ==========================================

    #[test]
    fn test_concurrent_assign_disjoint_ranges_both_win() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        {
            let conn = Connection::open(&db_path).unwrap();
            seed_product(&conn, "P001", "高空作业平台");
            seed_asset(&conn, "A1", "P001", "GOOD", None);
        }

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();

        // 同一资产, 区间错开: [1,9] 与 [10,20]
        for (operator, start, end) in [("op01", 1u32, 9u32), ("op02", 10, 20)] {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                let app = AppState::new(db_path, None).unwrap();
                barrier.wait();
                app.assignment_api.assign_bulk_assets(
                    "P001",
                    &format!("O-{}", operator),
                    "L001",
                    &["A1".to_string()],
                    d(start),
                    d(end),
                    operator,
                )
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert!(results.iter().all(|r| r.is_ok()));

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count_active_reservations(&conn, "A1"), 2);
    }
}
