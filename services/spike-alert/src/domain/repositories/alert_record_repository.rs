//! 告警记录仓储接口

use std::time::Duration;

use async_trait::async_trait;
use tellspike_common::{PagedResult, Pagination};
use tellspike_errors::AppResult;

use crate::domain::entities::{AlertFilter, AlertRecord};
use crate::domain::value_objects::DedupeKey;

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// 同一去重键已有 sent 记录（唯一约束冲突）
    Duplicate,
}

/// 告警记录仓储
///
/// 实现必须保证：同一去重键最多一条 `sent` 记录；同一时刻最多一个有效预留。
#[async_trait]
pub trait AlertRecordRepository: Send + Sync {
    /// 是否已有该键的 sent 记录
    async fn has_sent(&self, key: &DedupeKey) -> AppResult<bool>;

    /// 发送前预留去重键
    ///
    /// 已有 sent 记录或存在未过期预留时返回 false。过期预留可被接管。
    async fn try_reserve(&self, key: &DedupeKey, lease: Duration) -> AppResult<bool>;

    /// 释放预留
    async fn release(&self, key: &DedupeKey) -> AppResult<()>;

    /// 追加一条记录
    async fn insert(&self, record: &AlertRecord) -> AppResult<InsertOutcome>;

    /// 按 period 倒序分页查询
    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: Pagination,
    ) -> AppResult<PagedResult<AlertRecord>>;
}
