//! Session configuration.
//!
//! Defaults mirror the coaching service's own: depth-15 search, a 1600
//! opponent, coaching explanations on. The backend address comes from the
//! `COACH_API_BASE` environment variable when set.

use std::time::Duration;

/// Default analysis service address.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default engine search depth in plies.
pub const DEFAULT_SEARCH_DEPTH: u32 = 15;

/// Default opponent skill rating.
pub const DEFAULT_SKILL: u32 = 1600;

/// Lowest selectable opponent skill rating.
pub const MIN_SKILL: u32 = 400;

/// Highest selectable opponent skill rating.
pub const MAX_SKILL: u32 = 3000;

/// How long a settled analysis result is reused without a new request.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5);

/// Tunable knobs for a [`crate::session::CoachSession`].
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Base URL of the analysis service.
    pub backend_url: String,

    /// Settled results younger than this are reused instead of refetched.
    pub freshness_window: Duration,

    /// Initial engine search depth.
    pub search_depth: u32,

    /// Initial opponent skill rating (raw and effective).
    pub skill: u32,

    /// Whether move recommendations include a coaching explanation.
    pub coaching_enabled: bool,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            search_depth: DEFAULT_SEARCH_DEPTH,
            skill: DEFAULT_SKILL,
            coaching_enabled: true,
        }
    }
}

impl CoachConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("COACH_API_BASE") {
            if !url.is_empty() {
                config.backend_url = url;
            }
        }
        config
    }
}
