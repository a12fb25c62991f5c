//! Landing Tracker - analytics instrumentation for static landing pages.
//!
//! This crate maps visitor interactions on marketing landing pages (page
//! views, store-button clicks, logo and app-card clicks, scroll depth,
//! section visibility, time on page) onto named analytics events and hands
//! them to an analytics sink.
//!
//! # Overview
//!
//! A [`Tracker`] is created once per page load with a sink token, options,
//! a [`Sink`] and a [`Page`]. It derives visitor context (device, browser,
//! OS, UTM parameters, referrer), registers it with the sink, emits
//! `page_viewed`, and then turns page events into further events. Milestones
//! and section views are de-duplicated so each fires at most once per
//! session.
//!
//! Transport, batching, retry and storage belong to the sink.
//!
//! # Modules
//!
//! - [`types`]: Event, attribute and classification types
//! - [`context`]: Pure derivation of visitor and page context
//! - [`config`]: Tracker options and environment configuration
//! - [`error`]: Error types for tracker operations
//! - [`sink`]: The analytics sink capability and bundled sinks
//! - [`page`]: The browser page capability and an in-memory page
//! - [`tracker`]: The event tracker
//! - [`host`]: Single-threaded event loop driving a tracker
//! - [`replay`]: Scripted page sessions

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod page;
pub mod replay;
pub mod sink;
pub mod tracker;
pub mod types;

pub use config::{ConfigError, EventNaming, TrackerConfig, TrackerOptions};
pub use error::{Result, TrackerError};
pub use host::{PageEvent, PageHost, Scrollable};
pub use page::{ClickTarget, Element, Page, PageElement, StaticPage};
pub use replay::{replay, ReplayReport, ReplayScript, ReplayStep};
pub use sink::{JsonLinesSink, RecordingSink, Sink, SinkCall, SinkError, SinkSettings};
pub use tracker::{ListenerPlan, PendingNavigation, Tracker, TrackerState};
pub use types::{
    AnalyticsEvent, AttributeValue, Attributes, Browser, ButtonLocation, DeviceType, EventKind,
    Os, Section,
};
