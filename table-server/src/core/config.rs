use std::time::Duration;

use chrono_tz::Tz;

use crate::floor::{NumberingStyle, ReservationLookahead, RetryPolicy, StoreSettings};

/// 服务器配置 - 桌台协调服务的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/crab/tables | 工作目录 (redb 文件、日志) |
/// | HTTP_PORT | 3100 | HTTP 服务端口 |
/// | STORE_ID | 1 | 门店 ID |
/// | STORE_TIMEZONE | Europe/Madrid | 门店时区 |
/// | DEFAULT_RESERVATION_MINUTES | 90 | 预订默认时长 |
/// | RESERVATION_LOOKAHEAD | same_day | 预订占桌窗口 (same_day 或分钟数) |
/// | TABLE_NUMBERING | numeric | 桌号风格 (numeric / area_prefixed) |
/// | SWEEP_INTERVAL_SECS | 60 | 过期预订扫描间隔 |
/// | FANOUT_DEBOUNCE_MS | 200 | 变更通知合并窗口 |
/// | NOTIFY_CHANNEL_CAPACITY | 1024 | 通知通道容量 |
/// | RETRY_MAX_ATTEMPTS | 3 | StaleState 最大尝试次数 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tables STORE_ID=7 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    pub http_port: u16,
    /// 门店设置 (只读输入)
    pub store: StoreSettings,
    pub sweep_interval_secs: u64,
    pub fanout_debounce_ms: u64,
    pub notify_channel_capacity: usize,
    pub retry_max_attempts: u32,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let defaults = StoreSettings::default();
        let store = StoreSettings {
            store_id: env_parse("STORE_ID").unwrap_or(defaults.store_id),
            default_reservation_minutes: env_parse("DEFAULT_RESERVATION_MINUTES")
                .filter(|m: &i32| *m > 0)
                .unwrap_or(defaults.default_reservation_minutes),
            lookahead: env_parse::<ReservationLookahead>("RESERVATION_LOOKAHEAD")
                .unwrap_or(defaults.lookahead),
            numbering: env_parse::<NumberingStyle>("TABLE_NUMBERING").unwrap_or(defaults.numbering),
            timezone: env_parse::<Tz>("STORE_TIMEZONE").unwrap_or(defaults.timezone),
        };

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/crab/tables".into()),
            http_port: env_parse("HTTP_PORT").unwrap_or(3100),
            store,
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(60),
            fanout_debounce_ms: env_parse("FANOUT_DEBOUNCE_MS").unwrap_or(200),
            notify_channel_capacity: env_parse("NOTIFY_CHANNEL_CAPACITY")
                .filter(|c: &usize| *c > 0)
                .unwrap_or(1024),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS").unwrap_or(3),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16, store: StoreSettings) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.store = store;
        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn fanout_debounce(&self) -> Duration {
        Duration::from_millis(self.fanout_debounce_ms)
    }

    /// redb 数据库文件路径
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("floor.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
