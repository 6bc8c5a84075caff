//! ports - 抽象 trait 层
//!
//! 定义外部基础设施的抽象接口，具体实现位于 adapters

mod notification;

pub use notification::*;
