//! 应用层
//!
//! 去重、消息格式化、发送、检测编排与定时触发

pub mod commands;
pub mod dedup_guard;
pub mod detector;
pub mod dispatcher;
pub mod formatter;
pub mod handler;
pub mod queries;
pub mod scheduler;

pub use dedup_guard::DeduplicationGuard;
pub use detector::{DetectorSettings, PairOutcome, PairStatus, RunSummary, SpikeDetector};
pub use dispatcher::AlertDispatcher;
pub use formatter::AlertMessageFormatter;
pub use handler::ServiceHandler;
pub use scheduler::DetectorScheduler;
