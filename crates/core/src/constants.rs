/// Maximum age of a cached feed snapshot, in milliseconds
pub const FEED_CACHE_TTL_MS: i64 = 300_000;

/// Fraction of the viewport width a release must travel to commit
pub const COMMIT_THRESHOLD_RATIO: f64 = 0.38;

/// Viewport width assumed until the presentation layer reports one
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 390.0;

/// Minimum time the join interstitial stays non-dismissible, in milliseconds
pub const INTERSTITIAL_DWELL_MS: i64 = 5_000;

/// Image reference used when a host image cannot be resolved
pub const PLACEHOLDER_IMAGE: &str = "asset://images/host-placeholder.png";
