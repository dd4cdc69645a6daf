// ==========================================
// 批量指派引擎测试
// ==========================================
// 职责: 验证原子提交、提交前复核、审计日志
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod bulk_assign_test {
    use rental_asset_engine::api::ApiError;
    use rental_asset_engine::app::AppState;
    use rental_asset_engine::domain::types::ConflictType;
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    use crate::test_helpers::{
        count_action_logs, count_active_reservations, create_test_db, d, seed_asset, seed_product,
        seed_reservation,
    };

    fn setup() -> (NamedTempFile, String, AppState) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = Connection::open(&db_path).unwrap();
        seed_product(&conn, "P001", "移动空调 5kW");
        seed_asset(&conn, "A1", "P001", "EXCELLENT", Some("2026-02-01"));
        seed_asset(&conn, "A2", "P001", "GOOD", None);
        seed_asset(&conn, "A3", "P001", "FAIR", None);

        let app_state = AppState::new(db_path.clone(), None).unwrap();
        (temp_file, db_path, app_state)
    }

    // ==========================================
    // 测试1: 成功提交
    // ==========================================

    #[test]
    fn test_assign_creates_reservations_and_audit_log() {
        let (_temp_file, db_path, app) = setup();

        let assignment = app
            .assignment_api
            .assign_bulk_assets(
                "P001",
                "O001",
                "L001",
                &["A1".to_string(), "A2".to_string()],
                d(1),
                d(10),
                "op01",
            )
            .unwrap();

        assert_eq!(assignment.quantity(), 2);
        for reservation in &assignment.reservations {
            assert_eq!(reservation.order_id, "O001");
            assert_eq!(reservation.start_date, d(1));
            assert_eq!(reservation.end_date, d(10));
        }

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count_active_reservations(&conn, "A1"), 1);
        assert_eq!(count_active_reservations(&conn, "A2"), 1);
        assert_eq!(count_action_logs(&conn, "BulkAssign"), 1);

        // 审计日志可按订单追溯
        let logs = app.action_log_repo.list_by_order("O001").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].actor, "op01");

        // 预约修订号随写入递增
        let rev: i64 = conn
            .query_row(
                "SELECT reservation_rev FROM asset WHERE asset_id = 'A1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rev, 1);
    }

    #[test]
    fn test_assigned_asset_no_longer_free() {
        let (_temp_file, _db_path, app) = setup();

        app.assignment_api
            .assign_bulk_assets("P001", "O001", "L001", &["A1".to_string()], d(1), d(10), "op01")
            .unwrap();

        let result = app
            .availability_api
            .check_availability("P001", 3, d(5), d(8))
            .unwrap();
        assert!(!result.free_assets.iter().any(|a| a.asset_id == "A1"));
    }

    // ==========================================
    // 测试2: 前置条件校验
    // ==========================================

    #[test]
    fn test_assign_rejects_bad_selection() {
        let (_temp_file, _db_path, app) = setup();

        // 空列表
        assert!(matches!(
            app.assignment_api
                .assign_bulk_assets("P001", "O001", "L001", &[], d(1), d(10), "op01"),
            Err(ApiError::ValidationError(_))
        ));

        // 重复资产
        assert!(matches!(
            app.assignment_api.assign_bulk_assets(
                "P001",
                "O001",
                "L001",
                &["A1".to_string(), "A1".to_string()],
                d(1),
                d(10),
                "op01"
            ),
            Err(ApiError::ValidationError(_))
        ));

        // 未知资产
        assert!(matches!(
            app.assignment_api.assign_bulk_assets(
                "P001",
                "O001",
                "L001",
                &["A-MISSING".to_string()],
                d(1),
                d(10),
                "op01"
            ),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_assign_rejects_foreign_product_asset() {
        let (_temp_file, db_path, app) = setup();

        let conn = Connection::open(&db_path).unwrap();
        seed_product(&conn, "P002", "发电机 10kW");
        seed_asset(&conn, "X1", "P002", "GOOD", None);

        let result = app.assignment_api.assign_bulk_assets(
            "P001",
            "O001",
            "L001",
            &["X1".to_string()],
            d(1),
            d(10),
            "op01",
        );
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    // ==========================================
    // 测试3: 提交前复核（过期可用性）
    // ==========================================

    #[test]
    fn test_stale_availability_returns_updated_conflicts() {
        let (_temp_file, db_path, app) = setup();

        // 模拟其他操作员在检查与确认之间抢占 A1
        let conn = Connection::open(&db_path).unwrap();
        seed_reservation(&conn, "R-RACE", "A1", "O-OTHER", d(5), d(15));

        let result = app.assignment_api.assign_bulk_assets(
            "P001",
            "O001",
            "L001",
            &["A1".to_string()],
            d(1),
            d(10),
            "op01",
        );

        match result {
            Err(ApiError::StaleAvailability { conflicts, .. }) => {
                assert_eq!(conflicts.len(), 1);
                let conflict = &conflicts[0];
                assert_eq!(conflict.conflict_type, ConflictType::Overlap);
                assert_eq!(conflict.asset_id.as_deref(), Some("A1"));
                assert_eq!(conflict.conflicting_order_id.as_deref(), Some("O-OTHER"));
                // 冲突窗口裁剪到交集 [5,10]
                assert_eq!(conflict.conflict_start, d(5));
                assert_eq!(conflict.conflict_end, d(10));
                // 替代候选排除指定资产自身
                assert!(!conflict
                    .alternative_assets
                    .iter()
                    .any(|a| a.asset_id == "A1"));
                assert!(!conflict.alternative_assets.is_empty());
            }
            other => panic!("Expected StaleAvailability, got {:?}", other.err()),
        }

        // 零写入
        assert_eq!(count_active_reservations(&conn, "A1"), 1);
    }

    #[test]
    fn test_assign_is_all_or_nothing() {
        let (_temp_file, db_path, app) = setup();

        let conn = Connection::open(&db_path).unwrap();
        seed_reservation(&conn, "R-RACE", "A2", "O-OTHER", d(1), d(30));

        // A1 空闲, A2 被占: 整体失败, A1 也不能写入
        let result = app.assignment_api.assign_bulk_assets(
            "P001",
            "O001",
            "L001",
            &["A1".to_string(), "A2".to_string()],
            d(1),
            d(10),
            "op01",
        );
        assert!(matches!(result, Err(ApiError::StaleAvailability { .. })));

        assert_eq!(count_active_reservations(&conn, "A1"), 0);
        assert_eq!(count_active_reservations(&conn, "A2"), 1); // 仅既有预约
    }

    #[test]
    fn test_maintenance_asset_blocked_at_commit() {
        let (_temp_file, db_path, app) = setup();

        // 检查与确认之间资产转入维修
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "UPDATE asset SET condition = 'MAINTENANCE' WHERE asset_id = 'A1'",
            [],
        )
        .unwrap();

        let result = app.assignment_api.assign_bulk_assets(
            "P001",
            "O001",
            "L001",
            &["A1".to_string()],
            d(1),
            d(10),
            "op01",
        );

        match result {
            Err(ApiError::StaleAvailability { conflicts, .. }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].conflict_type, ConflictType::Maintenance);
            }
            other => panic!("Expected StaleAvailability, got {:?}", other.err()),
        }
        assert_eq!(count_active_reservations(&conn, "A1"), 0);
    }

    // ==========================================
    // 测试4: 取消后资产重新空闲
    // ==========================================

    #[test]
    fn test_cancel_then_reassign() {
        let (_temp_file, db_path, app) = setup();

        let assignment = app
            .assignment_api
            .assign_bulk_assets("P001", "O001", "L001", &["A1".to_string()], d(1), d(10), "op01")
            .unwrap();

        // 外部订单取消流程: 直接走仓储取消
        let reservation_repo =
            rental_asset_engine::repository::ReservationRepository::new(&db_path).unwrap();
        reservation_repo
            .cancel(&assignment.reservations[0].reservation_id, Some("op01"))
            .unwrap();

        assert!(reservation_repo.list_active_by_asset("A1").unwrap().is_empty());

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count_active_reservations(&conn, "A1"), 0);
        assert_eq!(count_action_logs(&conn, "CancelReservation"), 1);

        // 同区间可重新指派
        assert!(app
            .assignment_api
            .assign_bulk_assets("P001", "O002", "L001", &["A1".to_string()], d(1), d(10), "op02")
            .is_ok());
    }

    // ==========================================
    // 测试5: 自动选择
    // ==========================================

    #[test]
    fn test_auto_select_returns_all_when_short() {
        let (_temp_file, _db_path, app) = setup();

        // 池中仅 3 台, 请求 5 台: 返回全部, 不报错
        let selected = app
            .assignment_api
            .auto_select_assets("P001", 5, d(1), d(10))
            .unwrap();
        assert_eq!(selected.len(), 3);
        // 排序: EXCELLENT 在前
        assert_eq!(selected[0].asset_id, "A1");
    }
}
