//! 枚举定义

mod direction;
mod dispatch_status;

pub use direction::Direction;
pub use dispatch_status::DispatchStatus;
