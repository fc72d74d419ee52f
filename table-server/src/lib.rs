//! Table Server - 堂食桌台与用餐会话协调服务
//!
//! Each terminal owns a replica of one store's floor (areas, tables, active
//! sessions) and coordinates through a shared persistence gateway: every
//! state change is a conditional commit, every commit is fanned out to the
//! other replicas.
//!
//! # 模块结构
//!
//! - [`gateway`] - 持久层契约 + redb 实现
//! - [`floor`] - 状态机、协调器、扇出、扫描
//! - [`api`] - HTTP 接口
//! - [`core`] - 配置、状态、后台任务、服务器

pub mod api;
pub mod core;
pub mod floor;
pub mod gateway;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use floor::{FloorCoordinator, FloorError, FloorResult};
pub use gateway::{PersistenceGateway, RedbGateway};
