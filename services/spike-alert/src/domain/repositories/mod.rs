//! 仓储接口

mod alert_record_repository;
mod sample_source;

pub use alert_record_repository::{AlertRecordRepository, InsertOutcome};
pub use sample_source::SampleSource;
