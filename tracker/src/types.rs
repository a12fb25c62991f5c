//! Event types for landing page analytics.
//!
//! This module defines the event schema handed to the analytics sink: the
//! catalogue of event names, the attribute payload, and the classification
//! enums derived from the browser context. Attribute values serialize as
//! plain JSON primitives.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute payload attached to an event or registered as user properties.
///
/// A `BTreeMap` keeps serialization order stable, which the JSON-lines sink
/// and snapshot-style assertions rely on.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A primitive attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Absent value, serialized as JSON `null`.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Returns the string content, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for [`AttributeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Catalogue of events the tracker emits.
///
/// The wire name of each kind is part of the contract with the analytics
/// backend; dashboards query on these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PageViewed,
    DownloadButtonClicked,
    LogoClicked,
    LearnMoreClicked,
    ScrollMilestone,
    PageEngagement,
    ScreenshotViewed,
    FeaturesSectionViewed,
}

impl EventKind {
    /// Returns the bare wire name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageViewed => "page_viewed",
            Self::DownloadButtonClicked => "download_button_clicked",
            Self::LogoClicked => "logo_clicked",
            Self::LearnMoreClicked => "learn_more_clicked",
            Self::ScrollMilestone => "scroll_milestone",
            Self::PageEngagement => "page_engagement",
            Self::ScreenshotViewed => "screenshot_viewed",
            Self::FeaturesSectionViewed => "features_section_viewed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named analytics event with its attribute payload.
///
/// Events are ephemeral: built by the tracker and immediately handed to the
/// sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Wire name, possibly prefixed with a bracketed project label.
    pub name: String,

    /// Attribute payload.
    pub attributes: Attributes,
}

impl AnalyticsEvent {
    /// Creates a new event.
    ///
    /// # Examples
    ///
    /// ```
    /// use landing_tracker::types::{AnalyticsEvent, Attributes};
    ///
    /// let event = AnalyticsEvent::new("page_viewed", Attributes::new());
    /// assert_eq!(event.name, "page_viewed");
    /// assert!(event.attributes.is_empty());
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Looks up a single attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Device class derived from viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// Browser family derived from the user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Browser {
    Chrome,
    Safari,
    Firefox,
    Edge,
    Unknown,
}

impl Browser {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chrome => "Chrome",
            Self::Safari => "Safari",
            Self::Firefox => "Firefox",
            Self::Edge => "Edge",
            Self::Unknown => "Unknown",
        }
    }
}

/// Operating system family derived from the user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Os {
    #[serde(rename = "iOS")]
    Ios,
    Android,
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Linux,
    Unknown,
}

impl Os {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Android => "Android",
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Unknown => "Unknown",
        }
    }
}

/// Page region a download control was clicked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonLocation {
    Hero,
    CtaSection,
    Footer,
    Unknown,
}

impl ButtonLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::CtaSection => "cta_section",
            Self::Footer => "footer",
            Self::Unknown => "unknown",
        }
    }
}

/// Page sections whose first view is reported once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Screenshots,
    Features,
}

impl Section {
    /// Event emitted the first time this section becomes visible.
    #[must_use]
    pub fn event_kind(self) -> EventKind {
        match self {
            Self::Screenshots => EventKind::ScreenshotViewed,
            Self::Features => EventKind::FeaturesSectionViewed,
        }
    }
}
