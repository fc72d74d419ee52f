//! Server State - 服务器共享状态
//!
//! Cheap to clone; every handler gets its own copy through axum `State`.

use std::sync::Arc;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::floor::{ChangeFanout, FloorCoordinator, ReservationSweeper, RetryPolicy};
use crate::gateway::{PersistenceGateway, RedbGateway};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub floor: Arc<FloorCoordinator>,
    pub retry: RetryPolicy,
}

impl ServerState {
    /// Open `<work_dir>/floor.redb` and load the floor replica
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let path = config.database_path();
        let gateway = RedbGateway::open(&path)?.with_channel_capacity(config.notify_channel_capacity);
        tracing::info!(path = %path.display(), "Floor database opened");

        Self::with_gateway(config.clone(), Arc::new(gateway), Arc::new(SystemClock)).await
    }

    /// Build on an existing gateway and clock (tests, embedded terminals)
    pub async fn with_gateway(
        config: Config,
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let floor = FloorCoordinator::new(config.store.clone(), gateway.clone(), clock)
            .with_event_capacity(config.notify_channel_capacity);
        floor.load().await?;

        Ok(Self {
            retry: config.retry_policy(),
            config,
            gateway,
            floor: Arc::new(floor),
        })
    }

    /// 启动后台任务: 变更扇出 + 过期预订扫描
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let fanout = ChangeFanout::new(
            self.floor.clone(),
            self.config.fanout_debounce(),
            tasks.shutdown_token(),
        );
        tasks.spawn("change_fanout", TaskKind::Listener, fanout.run());

        let sweeper = ReservationSweeper::new(
            self.floor.clone(),
            self.config.sweep_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("reservation_sweeper", TaskKind::Periodic, sweeper.run());

        tracing::info!(count = tasks.len(), "Background tasks started");
        tasks
    }

    pub fn floor(&self) -> &FloorCoordinator {
        &self.floor
    }
}
