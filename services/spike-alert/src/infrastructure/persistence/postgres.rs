//! PostgreSQL repository implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tellspike_adapter_postgres::is_unique_violation;
use tellspike_common::{PagedResult, Pagination};
use tellspike_errors::{AppError, AppResult};
use tracing::debug;

use super::converters::{alert_record_from_row, sample_from_row};
use super::rows::{AlertRecordRow, PartnerMetricRow};
use crate::domain::{
    AlertFilter, AlertRecord, AlertRecordRepository, DedupeKey, InsertOutcome, MetricName,
    MetricSample, NetworkId, SampleSource,
};

// ============================================================================
// SampleSource 实现
// ============================================================================

/// 从 partner_network_metrics 读取日度样本
pub struct PostgresSampleSource {
    pool: PgPool,
}

impl PostgresSampleSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleSource for PostgresSampleSource {
    async fn get_sample(
        &self,
        network: &NetworkId,
        metric_name: &MetricName,
        period: NaiveDate,
    ) -> AppResult<Option<MetricSample>> {
        // 同一天多次抓取时取最新一行
        let row = sqlx::query_as::<_, PartnerMetricRow>(
            r#"
            SELECT network, date, leads, revenue, currency, clicks, impressions
            FROM partner_network_metrics
            WHERE network = $1 AND date = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(network.as_str())
        .bind(period)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query partner metrics: {}", e)))?;

        match row {
            Some(row) => sample_from_row(row, metric_name),
            None => Ok(None),
        }
    }
}

// ============================================================================
// AlertRecordRepository 实现
// ============================================================================

pub struct PostgresAlertRecordRepository {
    pool: PgPool,
}

impl PostgresAlertRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRecordRepository for PostgresAlertRecordRepository {
    async fn has_sent(&self, key: &DedupeKey) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM alert_records
                WHERE network = $1 AND metric_name = $2 AND direction = $3 AND period = $4
                  AND dispatch_status = 'sent'
            )
            "#,
        )
        .bind(key.network.as_str())
        .bind(key.metric_name.as_str())
        .bind(key.direction.as_str())
        .bind(key.period)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query alert records: {}", e)))?;

        Ok(exists)
    }

    async fn try_reserve(&self, key: &DedupeKey, lease: Duration) -> AppResult<bool> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| AppError::internal(format!("Invalid reservation lease: {}", e)))?;

        // 已有 sent 记录时不插入；已有预留时只接管过期的
        let result = sqlx::query(
            r#"
            INSERT INTO alert_dispatch_reservations
                (network, metric_name, direction, period, reserved_at, expires_at)
            SELECT $1::varchar, $2::varchar, $3::varchar, $4::date, $5::timestamptz, $6::timestamptz
            WHERE NOT EXISTS (
                SELECT 1 FROM alert_records
                WHERE network = $1 AND metric_name = $2 AND direction = $3 AND period = $4
                  AND dispatch_status = 'sent'
            )
            ON CONFLICT (network, metric_name, direction, period) DO UPDATE
            SET reserved_at = EXCLUDED.reserved_at, expires_at = EXCLUDED.expires_at
            WHERE alert_dispatch_reservations.expires_at < EXCLUDED.reserved_at
            "#,
        )
        .bind(key.network.as_str())
        .bind(key.metric_name.as_str())
        .bind(key.direction.as_str())
        .bind(key.period)
        .bind(now)
        .bind(now + lease)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to reserve alert dispatch: {}", e)))?;

        let reserved = result.rows_affected() == 1;
        debug!(key = %key, reserved, "Dispatch reservation attempted");
        Ok(reserved)
    }

    async fn release(&self, key: &DedupeKey) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM alert_dispatch_reservations
            WHERE network = $1 AND metric_name = $2 AND direction = $3 AND period = $4
            "#,
        )
        .bind(key.network.as_str())
        .bind(key.metric_name.as_str())
        .bind(key.direction.as_str())
        .bind(key.period)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to release alert dispatch: {}", e)))?;
        Ok(())
    }

    async fn insert(&self, record: &AlertRecord) -> AppResult<InsertOutcome> {
        let change = record.change_percent();
        let result = sqlx::query(
            r#"
            INSERT INTO alert_records (
                id, network, metric_name, previous_value, current_value,
                change_percent, unbounded, direction, period,
                dispatch_status, dispatch_reference, failure_reason,
                detected_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(record.id().0)
        .bind(record.network().as_str())
        .bind(record.metric_name().as_str())
        .bind(record.previous_value())
        .bind(record.current_value())
        .bind(change.value())
        .bind(change.is_unbounded())
        .bind(record.direction().as_str())
        .bind(record.period())
        .bind(record.dispatch_status().as_str())
        .bind(record.dispatch_reference())
        .bind(record.failure_reason())
        .bind(record.detected_at())
        .bind(record.created_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(AppError::database(format!("Failed to insert alert record: {}", e))),
        }
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: Pagination,
    ) -> AppResult<PagedResult<AlertRecord>> {
        let network = filter.network.as_ref().map(|n| n.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM alert_records
            WHERE ($1::varchar IS NULL OR network = $1)
              AND ($2::date IS NULL OR period >= $2)
              AND ($3::date IS NULL OR period <= $3)
            "#,
        )
        .bind(network)
        .bind(filter.range.from)
        .bind(filter.range.to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count alert records: {}", e)))?;

        let rows = sqlx::query_as::<_, AlertRecordRow>(
            r#"
            SELECT id, network, metric_name, previous_value, current_value,
                   change_percent, unbounded, direction, period,
                   dispatch_status, dispatch_reference, failure_reason,
                   detected_at, created_at
            FROM alert_records
            WHERE ($1::varchar IS NULL OR network = $1)
              AND ($2::date IS NULL OR period >= $2)
              AND ($3::date IS NULL OR period <= $3)
            ORDER BY period DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(network)
        .bind(filter.range.from)
        .bind(filter.range.to)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list alert records: {}", e)))?;

        let items = rows
            .into_iter()
            .map(alert_record_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PagedResult::new(items, total.max(0) as u64, &pagination))
    }
}
