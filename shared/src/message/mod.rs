//! 楼面变更消息
//!
//! 两层消息：
//! - [`ChangeNotice`]: 持久层提交后发出的原始通知（至少一次投递，不同 id 之间无序）
//! - [`FloorEvent`]: Change Fan-out 合并、刷新本地副本后再发布给 UI 的类型化事件

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Area, DiningSession, DiningTable, Reservation};

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Area,
    Table,
    Session,
    Reservation,
}

impl Entity {
    pub const ALL: [Entity; 4] = [
        Entity::Area,
        Entity::Table,
        Entity::Session,
        Entity::Reservation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Area => "area",
            Entity::Table => "table",
            Entity::Session => "session",
            Entity::Reservation => "reservation",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 变更操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOperation::Insert => write!(f, "insert"),
            ChangeOperation::Update => write!(f, "update"),
            ChangeOperation::Delete => write!(f, "delete"),
        }
    }
}

/// 持久层原始变更通知
///
/// 只携带标识，不携带记录内容；订阅者需自行回读。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub store_id: i64,
    pub entity: Entity,
    pub id: i64,
    /// 记录所属桌台（区域为 None）
    pub table_id: Option<i64>,
    pub operation: ChangeOperation,
}

/// UI 层事件
///
/// 记录为 None 表示已删除或回读失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FloorEvent {
    AreaChanged {
        area_id: i64,
        operation: ChangeOperation,
        area: Option<Area>,
    },
    TableChanged {
        table_id: i64,
        operation: ChangeOperation,
        table: Option<DiningTable>,
    },
    SessionChanged {
        session_id: i64,
        table_id: i64,
        operation: ChangeOperation,
        session: Option<DiningSession>,
    },
    ReservationChanged {
        reservation_id: i64,
        table_id: i64,
        operation: ChangeOperation,
        reservation: Option<Reservation>,
    },
    /// 通知流落后，本地副本已全量重载，UI 应整体刷新
    Resynced,
}

impl FloorEvent {
    /// 事件涉及的桌台
    pub fn table_id(&self) -> Option<i64> {
        match self {
            FloorEvent::AreaChanged { .. } | FloorEvent::Resynced => None,
            FloorEvent::TableChanged { table_id, .. }
            | FloorEvent::SessionChanged { table_id, .. }
            | FloorEvent::ReservationChanged { table_id, .. } => Some(*table_id),
        }
    }
}
