//! 工具模块 - 日志、时钟与营业日时间换算

pub mod logger;
pub mod time;

pub use shared::error::{AppError, AppResult};
