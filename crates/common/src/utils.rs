//! 通用工具函数

use uuid::Uuid;

/// 生成新的 UUID v7（时间有序）
///
/// 告警记录按创建顺序排列，v7 保证主键与插入顺序一致
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}
