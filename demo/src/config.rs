//! demo 配置（环境变量驱动）

use std::time::Duration;

use anyhow::{Context, Result};
use outbox_domain::eventing::CrawlerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// 日志级别（trace, debug, info, warn, error），`RUST_LOG` 优先
    pub log_level: String,

    /// 以 JSON 输出日志
    pub log_json: bool,

    pub crawler: CrawlerConfig,

    /// 暂停自动投递的主题名（逗号分隔）
    pub quarantined_topics: Vec<String>,

    /// 运行时长；缺省时运行到 Ctrl-C
    pub run_for: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("OUTBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = std::env::var("OUTBOX_LOG_JSON")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let defaults = CrawlerConfig::default();

        let new_events_interval = millis("OUTBOX_NEW_EVENTS_INTERVAL_MS")?
            .unwrap_or(defaults.new_events_interval);
        let failed_events_interval = millis("OUTBOX_FAILED_EVENTS_INTERVAL_MS")?
            .unwrap_or(defaults.failed_events_interval);

        let max_events_in_parallel: usize = std::env::var("OUTBOX_MAX_EVENTS_IN_PARALLEL")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .context("OUTBOX_MAX_EVENTS_IN_PARALLEL must be a positive integer.")?
            .unwrap_or(defaults.max_events_in_parallel)
            .max(1);

        let quarantined_topics = std::env::var("OUTBOX_QUARANTINED_TOPICS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let run_for = millis("OUTBOX_RUN_FOR_MS")?;

        Ok(Self {
            log_level,
            log_json,
            crawler: CrawlerConfig {
                new_events_interval,
                failed_events_interval,
                max_events_in_parallel,
            },
            quarantined_topics,
            run_for,
        })
    }
}

fn millis(var: &str) -> Result<Option<Duration>> {
    let ms: Option<u64> = std::env::var(var)
        .ok()
        .map(|v| v.parse())
        .transpose()
        .with_context(|| format!("{var} must be an integer (milliseconds)."))?;
    Ok(ms.map(|ms| Duration::from_millis(ms.max(10))))
}
