//! The landing page event tracker.
//!
//! A [`Tracker`] is created once per page load. Initialization validates the
//! token, checks the sink is present, configures it, registers the visitor's
//! user properties, emits `page_viewed` and decides which listeners to
//! install. From then on the host forwards page events (clicks, scrolls,
//! animation frames, timer expiries, section visibility) to the handler
//! methods here, and the tracker maps them onto named analytics events.
//!
//! # De-duplication
//!
//! Scroll milestones, time milestones and section views fire at most once
//! per page session. Each has a set in [`TrackerState`]; a handler checks
//! membership, records the entry and only then emits. Entries are never
//! removed.
//!
//! # Inert trackers
//!
//! If initialization fails the tracker is inert: every handler is a no-op
//! and the sink is never called. [`Tracker::init`] never fails; it logs the
//! reason at error level instead.
//!
//! # Example
//!
//! ```
//! use landing_tracker::config::TrackerOptions;
//! use landing_tracker::page::StaticPage;
//! use landing_tracker::sink::RecordingSink;
//! use landing_tracker::tracker::Tracker;
//!
//! let sink = RecordingSink::new();
//! let page = StaticPage::new("/metronome/");
//! let tracker = Tracker::init(
//!     "project-token",
//!     TrackerOptions::default().with_project_name("metronome"),
//!     sink.clone(),
//!     page,
//! );
//!
//! assert!(tracker.is_active());
//! assert_eq!(sink.tracked_names(), vec!["[metronome] page_viewed"]);
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConfigError, TrackerConfig, TrackerOptions};
use crate::context;
use crate::error::{Result, TrackerError};
use crate::page::{ClickTarget, Element, Page, PageElement};
use crate::sink::{Sink, SinkSettings};
use crate::types::{AttributeValue, Attributes, EventKind, Section};

/// Scroll depths (percent) reported once each.
pub const SCROLL_MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Seconds after initialization at which engagement is reported.
pub const TIME_MILESTONES_SECS: [u64; 4] = [10, 30, 60, 120];

/// Delay between tracking a download click and opening the store link.
pub const NAVIGATION_DELAY: Duration = Duration::from_millis(100);

/// Fraction of a section that must be visible to count as viewed.
pub const SECTION_VISIBILITY_THRESHOLD: f64 = 0.5;

/// Page names with a known project label.
const KNOWN_PROJECTS: &[(&str, &str)] = &[
    ("home", "home"),
    ("metronome", "metronome"),
    ("soundboard", "soundboard"),
    ("decibel-meter", "decibel-meter"),
    ("beatmaker", "beatmaker"),
];

/// Label used when the page is not in the project table.
pub const UNKNOWN_PROJECT: &str = "unknown";

/// Source page reported on `learn_more_clicked`.
const LISTING_SOURCE_PAGE: &str = "home";

/// De-duplication state for one page session.
///
/// Monotonic: entries are only ever added.
#[derive(Debug, Clone)]
pub struct TrackerState {
    page_start: Instant,
    fired_scroll_milestones: BTreeSet<u8>,
    fired_time_milestones: BTreeSet<u64>,
    fired_sections: BTreeSet<Section>,
}

impl TrackerState {
    fn new(page_start: Instant) -> Self {
        Self {
            page_start,
            fired_scroll_milestones: BTreeSet::new(),
            fired_time_milestones: BTreeSet::new(),
            fired_sections: BTreeSet::new(),
        }
    }

    /// When the tracker was initialized.
    #[must_use]
    pub fn page_start(&self) -> Instant {
        self.page_start
    }

    /// Whole seconds since initialization, rounded down.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.page_start.elapsed().as_secs()
    }

    #[must_use]
    pub fn has_fired_scroll(&self, milestone: u8) -> bool {
        self.fired_scroll_milestones.contains(&milestone)
    }

    #[must_use]
    pub fn has_fired_time(&self, secs: u64) -> bool {
        self.fired_time_milestones.contains(&secs)
    }

    #[must_use]
    pub fn has_fired_section(&self, section: Section) -> bool {
        self.fired_sections.contains(&section)
    }
}

/// Listeners the tracker installed on the current page.
///
/// Decided once at initialization from the configuration and from which
/// landmark elements exist. A missing element simply means no listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerPlan {
    /// Delegated click listener for download controls. Always installed.
    pub download_clicks: bool,
    pub logo_link: bool,
    pub app_cards: bool,
    pub scroll: bool,
    pub screenshots_observer: bool,
    pub features_observer: bool,
    /// One-shot timers, as delays from initialization.
    pub time_milestones: Vec<Duration>,
}

impl ListenerPlan {
    fn for_page<P: Page>(config: &TrackerConfig, page: &P) -> Self {
        let time_milestones = if config.time_tracking() {
            TIME_MILESTONES_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            download_clicks: true,
            logo_link: page.has_element(PageElement::LogoLink),
            app_cards: page.has_element(PageElement::AppCard),
            scroll: config.scroll_tracking(),
            screenshots_observer: page.has_element(PageElement::ScreenshotsGrid),
            features_observer: page.has_element(PageElement::FeaturesGrid),
            time_milestones,
        }
    }

    /// Whether a visibility observer is installed for `section`.
    #[must_use]
    pub fn observes(&self, section: Section) -> bool {
        match section {
            Section::Screenshots => self.screenshots_observer,
            Section::Features => self.features_observer,
        }
    }
}

/// A navigation the host should perform after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub url: String,
    pub delay: Duration,
}

/// Live state of an initialized tracker.
#[derive(Debug)]
struct Session {
    config: TrackerConfig,
    state: TrackerState,
    listeners: ListenerPlan,
    /// Set while an animation frame is scheduled for scroll processing.
    frame_scheduled: bool,
}

/// Landing page event tracker.
pub struct Tracker<S: Sink, P: Page> {
    sink: S,
    page: P,
    session: Option<Session>,
}

impl<S: Sink, P: Page> Tracker<S, P> {
    /// Initializes tracking for one page session.
    ///
    /// Never fails. If the token is blank or the sink is unavailable the
    /// error is logged and an inert tracker is returned; no sink calls are
    /// made in that case.
    pub fn init(token: &str, options: TrackerOptions, mut sink: S, page: P) -> Self {
        let session = match Self::start(token, options, &mut sink, &page) {
            Ok(session) => Some(session),
            Err(e) => {
                error!(error = %e, "Tracker initialization failed, tracking disabled");
                None
            }
        };

        Self {
            sink,
            page,
            session,
        }
    }

    /// Initializes tracking, returning the failure instead of logging it.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Configuration` for a blank token and
    /// `TrackerError::DependencyUnavailable` if the sink is not loaded. A
    /// sink that rejects its configuration is logged, not fatal.
    pub fn try_init(token: &str, options: TrackerOptions, mut sink: S, page: P) -> Result<Self> {
        let session = Self::start(token, options, &mut sink, &page)?;
        Ok(Self {
            sink,
            page,
            session: Some(session),
        })
    }

    fn start(token: &str, options: TrackerOptions, sink: &mut S, page: &P) -> Result<Session> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken.into());
        }

        if !sink.is_available() {
            return Err(TrackerError::DependencyUnavailable(
                "analytics sink is not loaded".to_string(),
            ));
        }

        let config = TrackerConfig::new(token, options, || {
            infer_project_label(&context::page_name(page.path()))
        })?;

        if !sink.is_configured() {
            let settings = SinkSettings::new(config.debug());
            if let Err(e) = sink.configure(config.sink_token(), &settings) {
                warn!(error = %e, "Sink rejected configuration, tracking anyway");
            }
        }

        let listeners = ListenerPlan::for_page(&config, page);
        let session = Session {
            config,
            state: TrackerState::new(Instant::now()),
            listeners,
            frame_scheduled: false,
        };

        register_user_properties(sink, page);
        emit(sink, &session.config, EventKind::PageViewed, page_view_attributes(page));

        if session.config.debug() {
            info!(
                project = ?session.config.project_label(),
                naming = %session.config.naming(),
                listeners = ?session.listeners,
                "Tracker initialized"
            );
        } else {
            debug!(project = ?session.config.project_label(), "Tracker initialized");
        }

        Ok(session)
    }

    /// Returns true unless initialization failed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Effective configuration, if active.
    #[must_use]
    pub fn config(&self) -> Option<&TrackerConfig> {
        self.session.as_ref().map(|s| &s.config)
    }

    /// De-duplication state, if active.
    #[must_use]
    pub fn state(&self) -> Option<&TrackerState> {
        self.session.as_ref().map(|s| &s.state)
    }

    /// Installed listeners, if active.
    #[must_use]
    pub fn listeners(&self) -> Option<&ListenerPlan> {
        self.session.as_ref().map(|s| &s.listeners)
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Consumes the tracker, returning the sink and page.
    pub fn into_parts(self) -> (S, P) {
        (self.sink, self.page)
    }

    /// Current scroll depth of the page, in percent.
    #[must_use]
    pub fn scroll_depth(&self) -> u8 {
        context::scroll_depth(
            self.page.scroll_top(),
            self.page.document_height(),
            self.page.viewport_height(),
        )
    }

    /// Handles a click anywhere on the page.
    ///
    /// Logo and app-card listeners run before the delegated download
    /// listener, matching bubbling order. Returns the store navigation to
    /// perform once the download event has had time to flush.
    pub fn on_click(&mut self, click: &ClickTarget) -> Option<PendingNavigation> {
        let listeners = self.session.as_ref()?.listeners.clone();

        if listeners.logo_link && click.is_inside_logo_link() {
            self.track_logo_click();
        }

        if listeners.app_cards {
            if let Some(card) = click.closest(|el| el.has_class("app-card")) {
                let card = card.clone();
                self.track_learn_more_click(&card);
            }
        }

        if !listeners.download_clicks {
            return None;
        }
        let control = click.closest(Element::is_download_control)?.clone();
        self.track_download_click(click);

        match control.href {
            Some(url) => Some(PendingNavigation {
                url,
                delay: NAVIGATION_DELAY,
            }),
            None => {
                debug!("Download control has no href, nothing to open");
                None
            }
        }
    }

    /// Handles a scroll event.
    ///
    /// Returns true when the host should schedule an animation frame. At most
    /// one frame is outstanding at a time; scrolls in between are coalesced.
    pub fn on_scroll(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.listeners.scroll || session.frame_scheduled {
            return false;
        }
        session.frame_scheduled = true;
        true
    }

    /// Handles the animation frame scheduled by [`Tracker::on_scroll`].
    pub fn on_animation_frame(&mut self) {
        let depth = self.scroll_depth();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.frame_scheduled = false;

        trace!(depth, "Scroll frame");
        for milestone in SCROLL_MILESTONES {
            if depth >= milestone {
                self.track_scroll_milestone(milestone);
            }
        }
    }

    /// Handles visibility changes reported by a section observer.
    pub fn on_section_visible(&mut self, section: Section, visible_ratio: f64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !session.listeners.observes(section) || visible_ratio < SECTION_VISIBILITY_THRESHOLD {
            return;
        }
        self.track_section_view(section);
    }

    /// Handles a time-milestone timer firing.
    pub fn on_time_milestone(&mut self, secs: u64) {
        self.track_page_engagement(secs);
    }

    /// Emits `scroll_milestone` for `milestone` unless it already fired.
    pub fn track_scroll_milestone(&mut self, milestone: u8) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.state.fired_scroll_milestones.insert(milestone) {
            return;
        }

        let attributes = attrs([
            ("page_name", context::page_name(self.page.path()).into()),
            ("scroll_depth", milestone.into()),
            ("time_to_scroll", session.state.elapsed_secs().into()),
        ]);
        emit(&mut self.sink, &session.config, EventKind::ScrollMilestone, attributes);
    }

    /// Emits `page_engagement` for `secs` unless it already fired.
    pub fn track_page_engagement(&mut self, secs: u64) {
        let depth = self.scroll_depth();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.state.fired_time_milestones.insert(secs) {
            return;
        }

        let attributes = attrs([
            ("page_name", context::page_name(self.page.path()).into()),
            ("time_on_page", secs.into()),
            ("scroll_depth", depth.into()),
        ]);
        emit(&mut self.sink, &session.config, EventKind::PageEngagement, attributes);
    }

    /// Emits the first-view event for `section` unless it already fired.
    pub fn track_section_view(&mut self, section: Section) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.state.fired_sections.insert(section) {
            return;
        }

        let page = &self.page;
        let page_name = context::page_name(page.path());
        let attributes = match section {
            Section::Screenshots => attrs([
                ("page_name", page_name.into()),
                (
                    "screenshot_count",
                    page.element_count(PageElement::ScreenshotImage).into(),
                ),
                (
                    "device_type",
                    context::device_type(page.viewport_width()).as_str().into(),
                ),
            ]),
            Section::Features => attrs([
                ("page_name", page_name.into()),
                (
                    "feature_count",
                    page.element_count(PageElement::FeatureCard).into(),
                ),
            ]),
        };
        emit(&mut self.sink, &session.config, section.event_kind(), attributes);
    }

    fn track_download_click(&mut self, click: &ClickTarget) {
        let depth = self.scroll_depth();
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let page = &self.page;
        let app_name = context::page_name(page.path());
        let attributes = attrs([
            ("app_name", app_name.clone().into()),
            ("button_location", context::button_location(click).as_str().into()),
            ("page_name", app_name.into()),
            (
                "device_type",
                context::device_type(page.viewport_width()).as_str().into(),
            ),
            ("time_on_page", session.state.elapsed_secs().into()),
            ("scroll_depth", depth.into()),
            ("referrer", context::referrer_or_direct(page.referrer()).into()),
            ("utm_source", context::utm_param(page.query(), "utm_source").into()),
        ]);
        emit(
            &mut self.sink,
            &session.config,
            EventKind::DownloadButtonClicked,
            attributes,
        );
    }

    fn track_logo_click(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let page = &self.page;
        let app_name = context::page_name(page.path());
        let attributes = attrs([
            ("app_name", app_name.clone().into()),
            ("page_name", app_name.into()),
            (
                "device_type",
                context::device_type(page.viewport_width()).as_str().into(),
            ),
        ]);
        emit(&mut self.sink, &session.config, EventKind::LogoClicked, attributes);
    }

    fn track_learn_more_click(&mut self, card: &Element) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(app_name) = card.app_name.as_deref().and_then(context::app_slug) else {
            debug!("App card without a name, skipping learn_more_clicked");
            return;
        };

        let attributes = attrs([
            ("app_name", app_name.into()),
            ("source_page", LISTING_SOURCE_PAGE.into()),
        ]);
        emit(&mut self.sink, &session.config, EventKind::LearnMoreClicked, attributes);
    }
}

/// Looks up the project label for a page name.
///
/// Pages outside the table get [`UNKNOWN_PROJECT`] and a warning.
#[must_use]
pub fn infer_project_label(page_name: &str) -> String {
    match KNOWN_PROJECTS.iter().find(|(page, _)| *page == page_name) {
        Some((_, label)) => (*label).to_string(),
        None => {
            warn!(page = page_name, "Could not infer project label, using 'unknown'");
            UNKNOWN_PROJECT.to_string()
        }
    }
}

/// Attributes registered with the sink as persistent user properties.
fn user_properties<P: Page>(page: &P) -> Attributes {
    let ua = page.user_agent();
    let query = page.query();
    attrs([
        (
            "device_type",
            context::device_type(page.viewport_width()).as_str().into(),
        ),
        ("browser", context::browser(ua).as_str().into()),
        ("os", context::os(ua).as_str().into()),
        ("country", context::country().into()),
        ("referrer", context::referrer_or_direct(page.referrer()).into()),
        ("utm_source", context::utm_param(query, "utm_source").into()),
        ("utm_campaign", context::utm_param(query, "utm_campaign").into()),
        ("utm_medium", context::utm_param(query, "utm_medium").into()),
        (
            "first_seen",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        ),
    ])
}

fn register_user_properties<S: Sink, P: Page>(sink: &mut S, page: &P) {
    if let Err(e) = sink.register(&user_properties(page)) {
        warn!(error = %e, "Failed to register user properties");
    }
}

fn page_view_attributes<P: Page>(page: &P) -> Attributes {
    let ua = page.user_agent();
    let query = page.query();
    attrs([
        ("page_name", context::page_name(page.path()).into()),
        ("page_path", page.path().into()),
        ("referrer", context::referrer_or_direct(page.referrer()).into()),
        ("utm_source", context::utm_param(query, "utm_source").into()),
        ("utm_campaign", context::utm_param(query, "utm_campaign").into()),
        ("utm_medium", context::utm_param(query, "utm_medium").into()),
        (
            "device_type",
            context::device_type(page.viewport_width()).as_str().into(),
        ),
        ("browser", context::browser(ua).as_str().into()),
        ("os", context::os(ua).as_str().into()),
        ("country", context::country().into()),
    ])
}

/// Hands one event to the sink. Failures are logged and dropped.
fn emit<S: Sink>(sink: &mut S, config: &TrackerConfig, kind: EventKind, attributes: Attributes) {
    let name = config.event_name(kind.as_str());
    match sink.track(&name, &attributes) {
        Ok(()) if config.debug() => debug!(event = %name, ?attributes, "Tracked"),
        Ok(()) => trace!(event = %name, "Tracked"),
        Err(e) => warn!(event = %name, error = %e, "Sink rejected event"),
    }
}

fn attrs<const N: usize>(pairs: [(&str, AttributeValue); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
