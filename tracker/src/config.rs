//! Configuration for the landing page tracker.
//!
//! Options are supplied by the page at initialization ([`TrackerOptions`])
//! and merged over defaults into an immutable [`TrackerConfig`]. The binary
//! can also assemble the same configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LANDING_TRACKER_TOKEN` | Yes | - | Sink project token |
//! | `LANDING_TRACKER_PROJECT` | No | inferred from page | Project label used to prefix event names |
//! | `LANDING_TRACKER_NAMING` | No | `prefixed` | Event naming convention (`bare` or `prefixed`) |
//! | `LANDING_TRACKER_DEBUG` | No | `false` | Verbose tracking logs and sink debug mode |
//! | `LANDING_TRACKER_SCROLL` | No | `true` | Scroll milestone tracking |
//! | `LANDING_TRACKER_TIME` | No | `true` | Time-on-page milestone tracking |
//!
//! The token is not part of [`TrackerOptions`]; the binary reads
//! `LANDING_TRACKER_TOKEN` itself when neither the command line nor the
//! replay script supplies one.
//!
//! # Example
//!
//! ```no_run
//! use landing_tracker::config::TrackerOptions;
//!
//! let options = TrackerOptions::from_env().expect("Failed to load configuration");
//! println!("Naming: {:?}", options.naming);
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the sink token.
pub const ENV_TOKEN: &str = "LANDING_TRACKER_TOKEN";

/// Environment variable holding the project label.
pub const ENV_PROJECT: &str = "LANDING_TRACKER_PROJECT";

/// Environment variable selecting the naming convention.
pub const ENV_NAMING: &str = "LANDING_TRACKER_NAMING";

/// Environment variable toggling debug mode.
pub const ENV_DEBUG: &str = "LANDING_TRACKER_DEBUG";

/// Environment variable toggling scroll tracking.
pub const ENV_SCROLL: &str = "LANDING_TRACKER_SCROLL";

/// Environment variable toggling time tracking.
pub const ENV_TIME: &str = "LANDING_TRACKER_TIME";

/// Errors that can occur while building the tracker configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The sink token is empty or missing.
    #[error("sink token is required")]
    MissingToken,

    /// Required environment variable is missing.
    /// A value could not be parsed.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// How event names are written on the wire.
///
/// The two conventions produce different event names for the same
/// interaction, so a deployment must stick to one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventNaming {
    /// `page_viewed`
    Bare,

    /// `[metronome] page_viewed`
    #[default]
    #[serde(alias = "prefixed")]
    ProjectPrefixed,
}

impl FromStr for EventNaming {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(Self::Bare),
            "prefixed" | "project_prefixed" => Ok(Self::ProjectPrefixed),
            other => Err(ConfigError::InvalidValue {
                key: ENV_NAMING.to_string(),
                message: format!("expected 'bare' or 'prefixed', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for EventNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare => f.write_str("bare"),
            Self::ProjectPrefixed => f.write_str("prefixed"),
        }
    }
}

/// Options accepted by the initialization call.
///
/// Every field is optional; unset fields take the defaults listed on
/// [`TrackerConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerOptions {
    /// Project label for event-name prefixing. Inferred from the page if unset.
    pub project_name: Option<String>,

    pub debug: Option<bool>,

    /// Enables scroll milestone tracking.
    pub throttle_scroll: Option<bool>,

    /// Enables time-on-page milestone tracking.
    pub throttle_time: Option<bool>,

    pub naming: Option<EventNaming>,
}

impl TrackerOptions {
    #[must_use]
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: EventNaming) -> Self {
        self.naming = Some(naming);
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    #[must_use]
    pub fn with_scroll_tracking(mut self, enabled: bool) -> Self {
        self.throttle_scroll = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_time_tracking(mut self, enabled: bool) -> Self {
        self.throttle_time = Some(enabled);
        self
    }

    /// Reads options from `LANDING_TRACKER_*` variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a boolean or naming variable is
    /// set to something unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_name = env::var(ENV_PROJECT)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let naming = env::var(ENV_NAMING)
            .ok()
            .map(|val| val.parse::<EventNaming>())
            .transpose()?;

        Ok(Self {
            project_name,
            debug: env_bool(ENV_DEBUG)?,
            throttle_scroll: env_bool(ENV_SCROLL)?,
            throttle_time: env_bool(ENV_TIME)?,
            naming,
        })
    }
}

/// Immutable tracker configuration.
///
/// Only [`TrackerConfig::new`] builds one, so a project label is present
/// exactly when the naming convention is project-prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    sink_token: String,
    project_label: Option<String>,
    naming: EventNaming,
    debug: bool,
    enable_scroll_tracking: bool,
    enable_time_tracking: bool,
}

impl TrackerConfig {
    /// Merges `options` over the defaults.
    ///
    /// `inferred_label` supplies the project label when `options` carries
    /// none; it is only consulted under project-prefixed naming.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` if `token` is blank.
    pub fn new<F>(token: &str, options: TrackerOptions, inferred_label: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> String,
    {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        let naming = options.naming.unwrap_or_default();
        let project_label = match naming {
            EventNaming::Bare => None,
            EventNaming::ProjectPrefixed => Some(
                options
                    .project_name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(inferred_label),
            ),
        };

        Ok(Self {
            sink_token: token.to_string(),
            project_label,
            naming,
            debug: options.debug.unwrap_or(false),
            enable_scroll_tracking: options.throttle_scroll.unwrap_or(true),
            enable_time_tracking: options.throttle_time.unwrap_or(true),
        })
    }

    /// Sink project token.
    #[must_use]
    pub fn sink_token(&self) -> &str {
        &self.sink_token
    }

    /// Label used to prefix event names. `None` under bare naming.
    #[must_use]
    pub fn project_label(&self) -> Option<&str> {
        self.project_label.as_deref()
    }

    /// Event naming convention. Default: project-prefixed.
    #[must_use]
    pub fn naming(&self) -> EventNaming {
        self.naming
    }

    /// Default: `false`.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Default: `true`.
    #[must_use]
    pub fn scroll_tracking(&self) -> bool {
        self.enable_scroll_tracking
    }

    /// Default: `true`.
    #[must_use]
    pub fn time_tracking(&self) -> bool {
        self.enable_time_tracking
    }

    /// Renders a bare event name under this configuration's convention.
    ///
    /// # Examples
    ///
    /// ```
    /// use landing_tracker::config::{EventNaming, TrackerConfig, TrackerOptions};
    ///
    /// let options = TrackerOptions::default().with_project_name("metronome");
    /// let prefixed = TrackerConfig::new("tok", options.clone(), String::new).unwrap();
    /// assert_eq!(prefixed.event_name("page_viewed"), "[metronome] page_viewed");
    ///
    /// let bare = TrackerConfig::new("tok", options.with_naming(EventNaming::Bare), String::new).unwrap();
    /// assert_eq!(bare.event_name("page_viewed"), "page_viewed");
    /// ```
    #[must_use]
    pub fn event_name(&self, bare: &str) -> String {
        match &self.project_label {
            Some(label) => format!("[{label}] {bare}"),
            None => bare.to_string(),
        }
    }
}

/// Parses an optional boolean environment variable.
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(val) => parse_bool(&val)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected boolean, got '{val}'"),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
