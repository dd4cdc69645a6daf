// ==========================================
// API 集成测试 (端到端业务流)
// ==========================================
// 职责: 检查 -> 自动选择 -> 指派 -> 冲突解决 全链路验证
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod api_integration_e2e_test {
    use rental_asset_engine::app::AppState;
    use rental_asset_engine::domain::ResolutionContext;
    use rusqlite::Connection;

    use crate::test_helpers::{create_test_db, d, seed_asset, seed_product};

    // ==========================================
    // 测试1: 下单全流程
    // ==========================================

    #[test]
    fn test_order_wizard_happy_path() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = Connection::open(&db_path).unwrap();
        seed_product(&conn, "P001", "音响套装");
        seed_asset(&conn, "A1", "P001", "EXCELLENT", Some("2026-02-10"));
        seed_asset(&conn, "A2", "P001", "EXCELLENT", Some("2026-01-05"));
        seed_asset(&conn, "A3", "P001", "GOOD", None);
        seed_asset(&conn, "A4", "P001", "FAIR", None);
        seed_asset(&conn, "A5", "P001", "POOR", None);

        let app = AppState::new(db_path, None).unwrap();

        // 1. 可用性检查: 5 台全部空闲
        let check = app
            .availability_api
            .check_availability("P001", 3, d(1), d(7))
            .unwrap();
        assert_eq!(check.free_assets.len(), 5);
        assert!(check.is_satisfiable());

        // 2. 自动选择最优 3 台 (成色 + 维护新近度)
        let selected = app
            .assignment_api
            .auto_select_assets("P001", 3, d(1), d(7))
            .unwrap();
        let ids: Vec<&str> = selected.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2", "A3"]);

        // 3. 提交指派
        let asset_ids: Vec<String> = selected.iter().map(|a| a.asset_id.clone()).collect();
        let assignment = app
            .assignment_api
            .assign_bulk_assets("P001", "O100", "L1", &asset_ids, d(1), d(7), "op01")
            .unwrap();
        assert_eq!(assignment.quantity(), 3);

        // 指派落审计日志
        let recent = app.action_log_repo.list_recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action_type, "BulkAssign");

        // 4. 复查: 空闲池缩减到 2 台, 重叠区间请求 3 台出现缺口
        let recheck = app
            .availability_api
            .check_availability("P001", 3, d(5), d(9))
            .unwrap();
        assert_eq!(recheck.free_assets.len(), 2);
        assert_eq!(recheck.conflicts.len(), 1);
        assert_eq!(recheck.conflicts[0].missing_quantity, 1);

        // 5. 错开区间不受影响
        let disjoint = app
            .availability_api
            .check_availability("P001", 5, d(8), d(14))
            .unwrap();
        assert_eq!(disjoint.free_assets.len(), 5);
    }

    // ==========================================
    // 测试2: 替代候选预览截断（引擎不截断, 视图截断）
    // ==========================================

    #[test]
    fn test_alternative_preview_truncation_keeps_full_list_for_resolve() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = Connection::open(&db_path).unwrap();
        seed_product(&conn, "P002", "折叠桌");
        seed_asset(&conn, "C1", "P002", "EXCELLENT", Some("2026-02-10"));
        seed_asset(&conn, "C2", "P002", "EXCELLENT", Some("2026-01-01"));
        seed_asset(&conn, "C3", "P002", "GOOD", None);
        seed_asset(&conn, "C4", "P002", "FAIR", None);
        seed_asset(&conn, "C5", "P002", "POOR", None);

        let app = AppState::new(db_path, None).unwrap();

        // 5 台空闲, 请求 6 台 -> 缺口冲突, 完整候选 5 条
        let check = app
            .availability_api
            .check_availability("P002", 6, d(1), d(7))
            .unwrap();
        let conflict = &check.conflicts[0];
        assert_eq!(conflict.alternative_assets.len(), 5);
        let conflict_id = conflict.conflict_id.clone();

        // 视图按配置截断为 3 条预览, 并报告截断前总数
        let open = app.conflict_api.list_open_conflicts().unwrap();
        let view = open
            .iter()
            .find(|v| v.conflict.conflict_id == conflict_id)
            .unwrap();
        assert_eq!(view.conflict.alternative_assets.len(), 3);
        assert_eq!(view.total_alternatives, 5);

        // 解决流程仍使用完整候选列表: 指定预览之外的 C5 也有效
        let context = ResolutionContext {
            operator: "op01".to_string(),
            order_id: "O200".to_string(),
            line_item_id: "L1".to_string(),
            chosen_alternative_id: Some("C5".to_string()),
            reason: None,
        };
        let outcome = app
            .conflict_api
            .resolve_conflict(&conflict_id, "alternative", &context)
            .unwrap();
        assert_eq!(outcome.new_reservations[0].asset_id, "C5");
    }

    // ==========================================
    // 测试3: 多产品批量查询
    // ==========================================

    #[test]
    fn test_bulk_check_across_products() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = Connection::open(&db_path).unwrap();
        seed_product(&conn, "P001", "音响套装");
        seed_asset(&conn, "A1", "P001", "GOOD", None);
        seed_product(&conn, "P002", "折叠桌");
        seed_asset(&conn, "B1", "P002", "GOOD", None);
        seed_asset(&conn, "B2", "P002", "FAIR", None);

        let app = AppState::new(db_path, None).unwrap();

        let lines = vec![
            rental_asset_engine::api::BulkAvailabilityLine {
                product_id: "P001".to_string(),
                quantity: 1,
            },
            rental_asset_engine::api::BulkAvailabilityLine {
                product_id: "P002".to_string(),
                quantity: 2,
            },
        ];
        let results = app
            .availability_api
            .check_bulk_availability(&lines, d(1), d(7))
            .unwrap();

        assert_eq!(results.len(), 2);
        // 不同产品的池互不影响
        assert!(results[0].conflicts.is_empty());
        assert!(results[1].conflicts.is_empty());
        assert_eq!(results[0].free_assets.len(), 1);
        assert_eq!(results[1].free_assets.len(), 2);
    }
}
