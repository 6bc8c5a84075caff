//! spike-alert - 联盟网络指标突增检测与告警
//!
//! 对每个 (network, metric) 比较当天与前一天的日度数据，
//! 变化超过阈值时通过通知渠道发送一条告警，同一周期同一方向只发送一次。

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod wiring;
