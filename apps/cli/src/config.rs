use std::time::Duration;

use anyhow::{anyhow, Context};
use deckmatch_connect::profile_poller::DEFAULT_POLL_INTERVAL_SECS;
use deckmatch_connect::DEFAULT_API_URL;
use deckmatch_core::constants::DEFAULT_VIEWPORT_WIDTH;

pub struct Config {
    pub api_url: String,
    pub access_token: String,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub viewport_width: f64,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = non_empty("DECKMATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let access_token = non_empty("DECKMATCH_ACCESS_TOKEN")
            .ok_or_else(|| anyhow!("DECKMATCH_ACCESS_TOKEN is not set"))?;

        let viewport_width = match non_empty("DECKMATCH_VIEWPORT_WIDTH") {
            Some(raw) => {
                let width: f64 = raw.parse().context("Invalid DECKMATCH_VIEWPORT_WIDTH")?;
                if !(width.is_finite() && width > 0.0) {
                    return Err(anyhow!("DECKMATCH_VIEWPORT_WIDTH must be positive"));
                }
                width
            }
            None => DEFAULT_VIEWPORT_WIDTH,
        };

        let poll_secs: u64 = non_empty("DECKMATCH_POLL_INTERVAL_SECS")
            .and_then(|raw| raw.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        Ok(Self {
            api_url,
            access_token,
            user_id: non_empty("DECKMATCH_USER_ID"),
            display_name: non_empty("DECKMATCH_DISPLAY_NAME"),
            viewport_width,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}
