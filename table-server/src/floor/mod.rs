//! 楼面协调 - 桌台状态机、用餐会话、预订
//!
//! # 模块结构
//!
//! - [`FloorCoordinator`] - 所有终端操作的入口
//! - [`TableRegistry`] - 本终端的区域/桌台副本
//! - [`SessionLedger`] - 桌台 -> 活跃会话索引
//! - [`ReservationScheduler`] - 预订校验、冲突检测
//! - [`ChangeFanout`] - 变更通知 -> 副本刷新 + UI 事件
//! - [`ReservationSweeper`] - 过期预订定时扫描

pub mod coordinator;
pub mod error;
pub mod fanout;
pub mod ledger;
pub mod numbering;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod settings;
pub mod state_machine;
pub mod sweep;

pub use coordinator::FloorCoordinator;
pub use error::{FloorError, FloorResult};
pub use fanout::ChangeFanout;
pub use ledger::SessionLedger;
pub use registry::TableRegistry;
pub use retry::{RetryPolicy, with_retry};
pub use scheduler::ReservationScheduler;
pub use settings::{NumberingStyle, ReservationLookahead, StoreSettings};
pub use state_machine::Trigger;
pub use sweep::{ReservationSweeper, SweepReport};
