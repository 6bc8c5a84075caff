//! 领域层
//!
//! 指标样本、变化计算、阈值策略、告警记录及仓储接口

pub mod entities;
pub mod enums;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use enums::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;
