//! 内置数据库迁移

use tellspike_adapter_postgres::Migration;

const PARTNER_NETWORK_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS partner_network_metrics (
    id UUID PRIMARY KEY,
    network VARCHAR(50) NOT NULL,
    date DATE NOT NULL,
    leads INTEGER NOT NULL DEFAULT 0,
    revenue NUMERIC(15, 2) NOT NULL DEFAULT 0,
    currency VARCHAR(3) NOT NULL DEFAULT 'USD',
    clicks INTEGER,
    impressions INTEGER,
    raw_data JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS ix_partner_metrics_network_date
    ON partner_network_metrics (network, date);
"#;

const ALERT_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS alert_records (
    id UUID PRIMARY KEY,
    network VARCHAR(50) NOT NULL,
    metric_name VARCHAR(50) NOT NULL,
    previous_value NUMERIC NOT NULL,
    current_value NUMERIC NOT NULL,
    change_percent NUMERIC,
    unbounded BOOLEAN NOT NULL DEFAULT FALSE,
    direction VARCHAR(8) NOT NULL CHECK (direction IN ('up', 'down')),
    period DATE NOT NULL,
    dispatch_status VARCHAR(16) NOT NULL CHECK (dispatch_status IN ('sent', 'failed', 'skipped')),
    dispatch_reference VARCHAR(64),
    failure_reason TEXT,
    detected_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (unbounded = (change_percent IS NULL))
);

-- 同一去重键最多一条 sent 记录
CREATE UNIQUE INDEX IF NOT EXISTS ux_alert_records_sent_key
    ON alert_records (network, metric_name, direction, period)
    WHERE dispatch_status = 'sent';

CREATE INDEX IF NOT EXISTS ix_alert_records_period
    ON alert_records (period DESC, created_at DESC);

CREATE INDEX IF NOT EXISTS ix_alert_records_network_period
    ON alert_records (network, period DESC);
"#;

const ALERT_DISPATCH_RESERVATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS alert_dispatch_reservations (
    network VARCHAR(50) NOT NULL,
    metric_name VARCHAR(50) NOT NULL,
    direction VARCHAR(8) NOT NULL,
    period DATE NOT NULL,
    reserved_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (network, metric_name, direction, period)
);
"#;

/// 按版本排列的迁移
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_partner_network_metrics", PARTNER_NETWORK_METRICS),
        Migration::new(2, "create_alert_records", ALERT_RECORDS),
        Migration::new(3, "create_alert_dispatch_reservations", ALERT_DISPATCH_RESERVATIONS),
    ]
}
