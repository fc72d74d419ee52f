//! 统一错误体系
//!
//! [`ErrorCode`] 是终端识别错误的唯一依据; [`AppError`] 在其上附带消息和
//! 结构化细节, 并直接作为 axum 响应返回。
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::PartySizeOutOfRange, "Party of 9 exceeds max 6")
//!     .with_detail("party_size", 9);
//! assert_eq!(ApiResponse::error(&err).code, 7005);
//! ```

mod codes;
mod types;

pub use codes::{ErrorCategory, ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
