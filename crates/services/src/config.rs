use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// What happens when a part fails to load for a transient reason
/// (network error, 5xx) after the attempt has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartFetchPolicy {
    /// Treat it like invalid content: notice, then back to the catalog.
    #[default]
    Redirect,
    /// Show a notice and keep the learner on the current part.
    StayAndRetry,
}

impl PartFetchPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "redirect" => Some(Self::Redirect),
            "retry" | "stay" => Some(Self::StayAndRetry),
            _ => None,
        }
    }
}

/// Timing constants of the exam controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamTimings {
    /// Delay before answer changes are copied into the answer cache.
    pub answer_sync_debounce: Duration,
    /// Visible countdown shown after listening audio ends.
    pub audio_countdown_secs: u32,
    /// Delay after listening audio ends before the group actually advances.
    /// Independent of the visible countdown.
    pub audio_advance_delay: Duration,
    /// Largest jump (seconds) accepted from a `seeking` event.
    pub seek_tolerance_secs: f64,
    /// How long seek enforcement ignores further seeking after a reset.
    pub seek_lock: Duration,
    /// Delay between a fatal notice and the redirect to the catalog.
    pub redirect_delay: Duration,
    /// How often the runtime polls deadlines.
    pub poll_interval: Duration,
}

impl Default for ExamTimings {
    fn default() -> Self {
        Self {
            answer_sync_debounce: Duration::from_millis(200),
            audio_countdown_secs: 3,
            audio_advance_delay: Duration::from_secs(5),
            seek_tolerance_secs: 0.5,
            seek_lock: Duration::from_millis(300),
            redirect_delay: Duration::from_millis(2_000),
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServicesConfig {
    pub api_base_url: Url,
    pub http_timeout: Duration,
    pub part_fetch_policy: PartFetchPolicy,
    pub timings: ExamTimings,
}

impl ServicesConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080/api/";

    /// # Errors
    ///
    /// Returns `ConfigError::BaseUrl` when `base_url` is not an absolute url.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(base_url)?,
            http_timeout: Duration::from_secs(30),
            part_fetch_policy: PartFetchPolicy::default(),
            timings: ExamTimings::default(),
        })
    }

    /// Read configuration from `TOEIC_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            env::var("TOEIC_API_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.into());
        let mut config = Self::new(&base_url)?;

        if let Ok(raw) = env::var("TOEIC_HTTP_TIMEOUT_SECS") {
            let secs = parse_u64("TOEIC_HTTP_TIMEOUT_SECS", &raw)?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = env::var("TOEIC_REDIRECT_DELAY_MS") {
            let millis = parse_u64("TOEIC_REDIRECT_DELAY_MS", &raw)?;
            config.timings.redirect_delay = Duration::from_millis(millis);
        }
        if let Ok(raw) = env::var("TOEIC_PART_FETCH_POLICY") {
            config.part_fetch_policy =
                PartFetchPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    var: "TOEIC_PART_FETCH_POLICY",
                    value: raw,
                })?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_part_fetch_policy(mut self, policy: PartFetchPolicy) -> Self {
        self.part_fetch_policy = policy;
        self
    }

    #[must_use]
    pub fn with_timings(mut self, timings: ExamTimings) -> Self {
        self.timings = timings;
        self
    }
}

// `Url::join` drops the last path segment unless the base ends with '/'.
fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    })
}
