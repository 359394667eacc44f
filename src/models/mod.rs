//! 业务数据模型
//!
//! 与 entity 模块的数据库实体分离，供路由层/服务层使用。

pub mod assessments;
pub mod auth;
pub mod common;
pub mod submissions;

pub use common::error_code::ErrorCode;
pub use common::pagination::{PaginationInfo, PaginationQuery};
pub use common::response::ApiResponse;

/// 应用启动时间，用于计算预处理耗时
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}
