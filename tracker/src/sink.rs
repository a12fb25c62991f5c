//! Analytics sink capability.
//!
//! The sink is the hosted analytics SDK that actually stores and ships
//! events. The tracker depends only on the [`Sink`] trait: it checks the sink
//! is present, configures it once, registers persistent user properties and
//! then calls [`Sink::track`] for each event. Transport, batching, retry and
//! storage all belong to the sink.
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingSink`]: records every call for assertions; clones share the
//!   same log.
//! - [`JsonLinesSink`]: writes one JSON object per call to any writer, merging
//!   registered properties into each tracked event the way hosted SDKs attach
//!   super properties.
//!
//! # Example
//!
//! ```
//! use landing_tracker::sink::{RecordingSink, Sink};
//! use landing_tracker::types::Attributes;
//!
//! let mut sink = RecordingSink::new();
//! let log = sink.clone();
//!
//! sink.track("page_viewed", &Attributes::new()).unwrap();
//! assert_eq!(log.tracked_names(), vec!["page_viewed"]);
//! ```

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AnalyticsEvent, Attributes};

/// Errors reported by a sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink refused the call.
    #[error("sink rejected call: {0}")]
    Rejected(String),

    /// Writing the event failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the event failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the sink keeps its distinct id and registered properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Persistence {
    #[default]
    LocalStorage,
}

/// Settings passed to the sink when the tracker configures it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SinkSettings {
    pub debug: bool,

    /// Automatic page-view tracking; always off because the tracker emits
    /// its own `page_viewed`.
    pub track_pageview: bool,

    pub persistence: Persistence,
}

impl SinkSettings {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            track_pageview: false,
            persistence: Persistence::LocalStorage,
        }
    }
}

/// The analytics backend the tracker emits into.
pub trait Sink {
    /// Whether the sink is loaded and callable.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether the sink already has a project token configured.
    fn is_configured(&self) -> bool;

    /// Configures the sink with a project token.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the sink rejects the configuration.
    fn configure(&mut self, token: &str, settings: &SinkSettings) -> Result<(), SinkError>;

    /// Registers properties attached to every subsequent event.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the properties could not be stored.
    fn register(&mut self, properties: &Attributes) -> Result<(), SinkError>;

    /// Emits a one-off event.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the event could not be accepted.
    fn track(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    fn configure(&mut self, token: &str, settings: &SinkSettings) -> Result<(), SinkError> {
        (**self).configure(token, settings)
    }

    fn register(&mut self, properties: &Attributes) -> Result<(), SinkError> {
        (**self).register(properties)
    }

    fn track(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
        (**self).track(name, attributes)
    }
}

/// A call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Configure { token: String, settings: SinkSettings },
    Register(Attributes),
    Track(AnalyticsEvent),
}

#[derive(Debug, Default)]
struct RecordingState {
    available: bool,
    configured: bool,
    fail_configure: bool,
    fail_tracks: bool,
    calls: Vec<SinkCall>,
}

/// Sink test double that records every call.
///
/// Clones share one call log, so a test can hand one clone to the tracker and
/// inspect another.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    /// Creates an available, unconfigured sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordingState {
                available: true,
                ..RecordingState::default()
            })),
        }
    }

    /// Creates a sink that reports itself as not loaded.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordingState::default())),
        }
    }

    /// Creates a sink that was configured before the tracker started.
    #[must_use]
    pub fn preconfigured() -> Self {
        let sink = Self::new();
        sink.with_state(|state| state.configured = true);
        sink
    }

    /// Makes every subsequent `configure` call fail after being recorded.
    pub fn fail_configure(&self) {
        self.with_state(|state| state.fail_configure = true);
    }

    /// Makes every subsequent `track` call fail after being recorded.
    pub fn fail_tracks(&self) {
        self.with_state(|state| state.fail_tracks = true);
    }

    /// All calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SinkCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Number of calls of any kind.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.with_state(|state| state.calls.len())
    }

    /// Tracked events in order.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Track(event) => Some(event.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    /// Names of tracked events in order.
    #[must_use]
    pub fn tracked_names(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.name).collect()
    }

    /// Tracked events with the given name.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<AnalyticsEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name == name)
            .collect()
    }

    /// Properties passed to `register`, in call order.
    #[must_use]
    pub fn registrations(&self) -> Vec<Attributes> {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Register(props) => Some(props.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RecordingState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl Sink for RecordingSink {
    fn is_available(&self) -> bool {
        self.with_state(|state| state.available)
    }

    fn is_configured(&self) -> bool {
        self.with_state(|state| state.configured)
    }

    fn configure(&mut self, token: &str, settings: &SinkSettings) -> Result<(), SinkError> {
        self.with_state(|state| {
            state.calls.push(SinkCall::Configure {
                token: token.to_string(),
                settings: settings.clone(),
            });
            if state.fail_configure {
                return Err(SinkError::Rejected("invalid project token".to_string()));
            }
            state.configured = true;
            Ok(())
        })
    }

    fn register(&mut self, properties: &Attributes) -> Result<(), SinkError> {
        self.with_state(|state| state.calls.push(SinkCall::Register(properties.clone())));
        Ok(())
    }

    fn track(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
        self.with_state(|state| {
            state
                .calls
                .push(SinkCall::Track(AnalyticsEvent::new(name, attributes.clone())));
            if state.fail_tracks {
                Err(SinkError::Rejected("tracking disabled".to_string()))
            } else {
                Ok(())
            }
        })
    }
}

/// One line of [`JsonLinesSink`] output.
#[derive(Debug, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
enum JsonLine<'a> {
    Configure {
        settings: &'a SinkSettings,
    },
    Register {
        properties: &'a Attributes,
    },
    Track {
        event: &'a str,
        properties: &'a Attributes,
    },
}

/// Sink that writes each call as a JSON line.
///
/// Registered properties are merged into every later `track` line, with the
/// event's own attributes taking precedence. The token is never written.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    token: Option<String>,
    super_properties: Attributes,
}

impl<W: Write> JsonLinesSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            token: None,
            super_properties: Attributes::new(),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &JsonLine<'_>) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    fn configure(&mut self, token: &str, settings: &SinkSettings) -> Result<(), SinkError> {
        self.token = Some(token.to_string());
        self.write_line(&JsonLine::Configure { settings })
    }

    fn register(&mut self, properties: &Attributes) -> Result<(), SinkError> {
        self.super_properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write_line(&JsonLine::Register { properties })
    }

    fn track(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
        let mut merged = self.super_properties.clone();
        merged.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write_line(&JsonLine::Track {
            event: name,
            properties: &merged,
        })
    }
}
