//! Alert history queries

use tellspike_common::Pagination;

use crate::domain::AlertFilter;

/// 分页查询告警历史
#[derive(Debug, Clone, Default)]
pub struct ListAlertsQuery {
    pub filter: AlertFilter,
    pub pagination: Pagination,
}
