use thiserror::Error;

use crate::floor::FloorError;
use crate::gateway::GatewayError;

/// 服务器启动/运行期错误
///
/// Request-level errors go through [`shared::error::AppError`] instead.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("存储错误: {0}")]
    Storage(#[from] GatewayError),

    #[error("楼面加载失败: {0}")]
    Floor(#[from] FloorError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
