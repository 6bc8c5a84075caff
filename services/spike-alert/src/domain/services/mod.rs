//! 领域服务

mod change_computer;
mod threshold_policy;

pub use change_computer::ChangeComputer;
pub use threshold_policy::ThresholdPolicy;
