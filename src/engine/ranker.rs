// ==========================================
// 租赁资产调度系统 - 资产排序引擎
// ==========================================
// 职责: 按可取性对候选资产排序 (自动选择与替代候选共用)
// 红线: 纯函数, 无副作用, 无 I/O
// ==========================================
// 排序口径:
// - 主键: 成色序数 (excellent=0, good=1, fair=2, poor=3, 其余=4)
// - 平局: 最近维护日期新者优先, 从未维护排在平局组末尾
// - 稳定排序: 同键保持输入顺序
// ==========================================

use crate::domain::asset::Asset;
use std::cmp::Ordering;

// ==========================================
// AssetRanker - 资产排序引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AssetRanker;

impl AssetRanker {
    pub fn new() -> Self {
        Self
    }

    /// 按可取性降序排序（稳定）
    pub fn rank(&self, mut assets: Vec<Asset>) -> Vec<Asset> {
        assets.sort_by(compare_desirability);
        assets
    }

    /// 取排序后前 N 个（不足 N 时返回全部, 缺口由可用性检查的冲突输出承担）
    pub fn top_n(&self, assets: Vec<Asset>, n: usize) -> Vec<Asset> {
        let mut ranked = self.rank(assets);
        ranked.truncate(n);
        ranked
    }
}

/// 可取性比较: 序数小者在前; 平局时最近维护在前, 未维护最后
fn compare_desirability(a: &Asset, b: &Asset) -> Ordering {
    a.condition
        .rank_ordinal()
        .cmp(&b.condition.rank_ordinal())
        .then_with(|| match (a.last_service_date, b.last_service_date) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AssetCondition;
    use chrono::{NaiveDate, Utc};

    fn asset(id: &str, condition: AssetCondition, last_service: Option<NaiveDate>) -> Asset {
        Asset {
            asset_id: id.to_string(),
            product_id: "P001".to_string(),
            asset_number: id.to_string(),
            serial_number: None,
            condition,
            last_service_date: last_service,
            location: None,
            reservation_rev: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn test_rank_by_condition() {
        let ranker = AssetRanker::new();
        let ranked = ranker.rank(vec![
            asset("A", AssetCondition::Poor, None),
            asset("B", AssetCondition::Excellent, None),
            asset("C", AssetCondition::Good, None),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_tie_broken_by_service_recency() {
        let ranker = AssetRanker::new();
        let ranked = ranker.rank(vec![
            asset("A", AssetCondition::Good, Some(d(1))),
            asset("B", AssetCondition::Good, Some(d(20))),
            asset("C", AssetCondition::Good, None),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|a| a.asset_id.as_str()).collect();
        // 最近维护优先, 未维护最后
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_stable_on_full_tie() {
        let ranker = AssetRanker::new();
        let ranked = ranker.rank(vec![
            asset("A", AssetCondition::Fair, Some(d(5))),
            asset("B", AssetCondition::Fair, Some(d(5))),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_maintenance_sorts_last() {
        let ranker = AssetRanker::new();
        let ranked = ranker.rank(vec![
            asset("A", AssetCondition::Maintenance, Some(d(25))),
            asset("B", AssetCondition::Poor, None),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_top_n_short_pool() {
        let ranker = AssetRanker::new();
        let picked = ranker.top_n(
            vec![
                asset("A", AssetCondition::Good, None),
                asset("B", AssetCondition::Excellent, None),
            ],
            5,
        );
        // 不足 N 时返回全部, 不报错
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].asset_id, "B");
    }
}
