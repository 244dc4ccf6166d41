//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMIT_THRESHOLD_RATIO, DEFAULT_VIEWPORT_WIDTH, FEED_CACHE_TTL_MS, INTERSTITIAL_DWELL_MS,
    PLACEHOLDER_IMAGE,
};

/// Tunables shared by the session components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum age of a cached primary feed, in milliseconds.
    pub cache_ttl_ms: i64,
    /// Release threshold as a fraction of `viewport_width`.
    pub commit_threshold_ratio: f64,
    /// Width of the card viewport in presentation units.
    pub viewport_width: f64,
    /// Non-dismissible dwell of the join interstitial, in milliseconds.
    pub interstitial_dwell_ms: i64,
    /// Reference substituted for unresolvable host images.
    pub placeholder_image: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: FEED_CACHE_TTL_MS,
            commit_threshold_ratio: COMMIT_THRESHOLD_RATIO,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            interstitial_dwell_ms: INTERSTITIAL_DWELL_MS,
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::milliseconds(self.cache_ttl_ms)
    }

    pub fn interstitial_dwell(&self) -> Duration {
        Duration::milliseconds(self.interstitial_dwell_ms)
    }

    /// Displacement a release must exceed to commit.
    pub fn commit_threshold(&self) -> f64 {
        self.commit_threshold_ratio * self.viewport_width
    }

    pub fn with_viewport_width(mut self, viewport_width: f64) -> Self {
        self.viewport_width = viewport_width;
        self
    }
}
