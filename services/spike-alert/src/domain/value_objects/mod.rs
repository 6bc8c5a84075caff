//! 值对象

mod dedupe_key;
mod ids;
mod metric_name;
mod network_id;

pub use dedupe_key::DedupeKey;
pub use ids::AlertId;
pub use metric_name::MetricName;
pub use network_id::NetworkId;
