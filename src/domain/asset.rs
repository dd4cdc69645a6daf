// ==========================================
// 租赁资产调度系统 - 资产领域模型
// ==========================================
// 红线: 资产由库存/维护流程维护, 对本引擎只读
// 对齐: db.rs product / asset 表
// ==========================================

use crate::domain::types::AssetCondition;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品目录条目
// ==========================================
// 用途: 资产目录的归属单位; 可用性检查以 product_id 为入口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String, // 产品唯一标识
    pub name: String,       // 产品名称
    pub created_at: DateTime<Utc>,
}

// ==========================================
// Asset - 物理资产单元
// ==========================================
// 一个 Asset 恰好归属一个 Product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    // ===== 主键与归属 =====
    pub asset_id: String,   // 资产唯一标识
    pub product_id: String, // 归属产品（FK）

    // ===== 标识信息 =====
    pub asset_number: String,          // 资产编号（人读）
    pub serial_number: Option<String>, // 序列号（可选）

    // ===== 静态属性 =====
    pub condition: AssetCondition,            // 成色档位
    pub last_service_date: Option<NaiveDate>, // 最近维护日期（排序平局裁决）
    pub location: Option<String>,             // 存放位置

    // ===== 并发控制 =====
    pub reservation_rev: i64, // 预约修订号（每次预约写入递增）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// 是否可参与分配 (红线1: 维修/报废资产永不可用)
    pub fn is_allocatable(&self) -> bool {
        self.condition.is_allocatable()
    }
}
