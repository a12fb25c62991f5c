//! Scripted page session replay.
//!
//! A replay script describes one visit: the page snapshot, the tracker
//! options and a timeline of page events. Replaying it runs a real tracker
//! inside a [`PageHost`], feeding each step at its offset. This is how the
//! event mapping is exercised end to end without a browser.
//!
//! # Script Format
//!
//! ```json
//! {
//!   "token": "project-token",
//!   "options": { "projectName": "metronome" },
//!   "page": {
//!     "path": "/metronome/",
//!     "query": "utm_source=newsletter",
//!     "userAgent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X)",
//!     "viewportWidth": 390, "viewportHeight": 844, "documentHeight": 3000,
//!     "elements": [["logo_link", 1], ["screenshots_grid", 1], ["screenshot_image", 5]]
//!   },
//!   "steps": [
//!     { "atMs": 1500, "type": "scroll", "top": 1100 },
//!     { "atMs": 4000, "type": "section_visible", "section": "screenshots", "ratio": 0.6 },
//!     { "atMs": 9000, "type": "click", "path": [
//!         { "tag": "a", "classes": ["btn-app-store"], "href": "https://apps.apple.com/app/id1" },
//!         { "tag": "section", "classes": ["app-hero"] }
//!     ] }
//!   ],
//!   "durationMs": 35000
//! }
//! ```
//!
//! Without `durationMs` the page stays open until every timer has fired.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::config::TrackerOptions;
use crate::error::Result;
use crate::host::{PageEvent, PageHost};
use crate::page::StaticPage;
use crate::sink::Sink;
use crate::tracker::Tracker;

/// Capacity of the channel between the script driver and the host.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One timed page event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
    /// Offset from page load, in milliseconds.
    pub at_ms: u64,

    #[serde(flatten)]
    pub event: PageEvent,
}

/// A scripted page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    /// Sink token. May be omitted and supplied by the caller instead.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub options: TrackerOptions,

    pub page: StaticPage,

    #[serde(default)]
    pub steps: Vec<ReplayStep>,

    /// When the page unloads, in milliseconds after load.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl ReplayScript {
    /// Loads a script from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Io` if the file cannot be read and
    /// `TrackerError::Json` if it is not a valid script.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses a script from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Json` if the text is not a valid script.
    pub fn from_json(json: &str) -> Result<Self> {
        let script = serde_json::from_str(json)?;
        Ok(script)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Whether the tracker initialized.
    pub active: bool,

    /// Store links opened, in order.
    pub navigations: Vec<String>,

    /// Scroll depth when the page unloaded.
    pub final_scroll_depth: u8,
}

/// Replays `script` against `sink` and reports what happened.
///
/// Steps are delivered in `atMs` order regardless of their order in the
/// file. Under a paused tokio clock the whole session completes instantly.
pub async fn replay<S: Sink>(script: ReplayScript, sink: S) -> (ReplayReport, S) {
    let ReplayScript {
        token,
        options,
        page,
        mut steps,
        duration_ms,
    } = script;

    let tracker = Tracker::init(token.as_deref().unwrap_or_default(), options, sink, page);
    let active = tracker.is_active();
    let start = tracker
        .state()
        .map_or_else(Instant::now, |state| state.page_start());

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    steps.sort_by_key(|step| step.at_ms);
    let step_count = steps.len();

    let driver = async move {
        for step in steps {
            sleep_until(start + Duration::from_millis(step.at_ms)).await;
            if tx.send(step.event).await.is_err() {
                return;
            }
        }
        if let Some(ms) = duration_ms {
            sleep_until(start + Duration::from_millis(ms)).await;
            // The host may already have stopped on an explicit unload step.
            let _ = tx.send(PageEvent::Unload).await;
        }
    };

    debug!(steps = step_count, ?duration_ms, "Replaying page session");
    let (tracker, ()) = tokio::join!(PageHost::new(tracker).run(rx), driver);

    let report = ReplayReport {
        active,
        final_scroll_depth: tracker.scroll_depth(),
        navigations: tracker.page().opened.clone(),
    };
    info!(
        active = report.active,
        navigations = report.navigations.len(),
        final_scroll_depth = report.final_scroll_depth,
        "Replay finished"
    );

    let (sink, _page) = tracker.into_parts();
    (report, sink)
}
