//! Browser page surface used by the tracker.
//!
//! The tracker never touches a real DOM. Everything it reads about the page
//! (location, viewport, user agent, which landmark elements exist) comes
//! through the [`Page`] trait, and the single write it performs is opening an
//! external store link in a new tab.
//!
//! Clicks are described by a [`ClickTarget`]: the clicked element followed by
//! its ancestors, innermost first. This is enough to answer the `closest(...)`
//! style questions the click handlers ask.
//!
//! # Example
//!
//! ```
//! use landing_tracker::page::{ClickTarget, Element};
//!
//! let target = ClickTarget::new(vec![
//!     Element::new("a")
//!         .with_class("btn-app-store")
//!         .with_href("https://apps.apple.com/app/id1"),
//!     Element::new("section").with_class("app-hero"),
//! ]);
//!
//! assert!(target.closest(|el| el.has_class("app-hero")).is_some());
//! assert!(target.closest(|el| el.tag == "footer").is_none());
//! ```

use serde::{Deserialize, Serialize};

/// Landmark elements the tracker looks for when installing listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageElement {
    /// Link wrapping the large app icon (`.app-icon-large a`).
    LogoLink,
    /// Card linking to an app page on the listing page (`.app-card`).
    AppCard,
    /// Screenshot gallery container (`.screenshots-grid`).
    ScreenshotsGrid,
    /// Individual screenshot images (`.screenshot-item img`).
    ScreenshotImage,
    /// Feature list container (`.features-grid`).
    FeaturesGrid,
    /// Individual feature cards (`.feature-card`).
    FeatureCard,
}

/// Read access to the page plus one navigation action.
pub trait Page {
    /// Location pathname, e.g. `/metronome/`.
    fn path(&self) -> &str;

    /// Raw query string without the leading `?`.
    fn query(&self) -> &str;

    /// `document.referrer`; empty when the visit was direct.
    fn referrer(&self) -> &str;

    fn user_agent(&self) -> &str;

    /// Inner viewport width in CSS pixels.
    fn viewport_width(&self) -> f64;

    /// Inner viewport height in CSS pixels.
    fn viewport_height(&self) -> f64;

    /// Full scrollable document height in CSS pixels.
    fn document_height(&self) -> f64;

    /// Current vertical scroll offset in CSS pixels.
    fn scroll_top(&self) -> f64;

    /// Number of elements of the given kind currently on the page.
    fn element_count(&self, element: PageElement) -> usize;

    /// Returns true if at least one element of the given kind exists.
    fn has_element(&self, element: PageElement) -> bool {
        self.element_count(element) > 0
    }

    /// Opens `url` in a new tab with `noopener,noreferrer`.
    fn open_in_new_tab(&mut self, url: &str);
}

/// One element in a click path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,

    #[serde(default)]
    pub classes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Text of the `.app-name` child, present on app cards.
    #[serde(default, rename = "appName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Matches `.btn-app-store, a[href*="apps.apple.com"]`.
    #[must_use]
    pub fn is_download_control(&self) -> bool {
        if self.has_class("btn-app-store") {
            return true;
        }
        self.tag == "a"
            && self
                .href
                .as_deref()
                .is_some_and(|href| href.contains("apps.apple.com"))
    }
}

/// The clicked element followed by its ancestors, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickTarget {
    path: Vec<Element>,
}

impl ClickTarget {
    #[must_use]
    pub fn new(path: Vec<Element>) -> Self {
        Self { path }
    }

    /// The element that received the click.
    #[must_use]
    pub fn target(&self) -> Option<&Element> {
        self.path.first()
    }

    /// Finds the innermost element (the target itself included) matching `pred`.
    pub fn closest<P>(&self, pred: P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.path.iter().find(|el| pred(el))
    }

    /// Returns true if the click landed inside the logo link.
    #[must_use]
    pub fn is_inside_logo_link(&self) -> bool {
        // `.app-icon-large a`: an anchor with an `.app-icon-large` ancestor.
        self.path.iter().enumerate().any(|(idx, el)| {
            el.tag == "a"
                && self.path[idx + 1..]
                    .iter()
                    .any(|ancestor| ancestor.has_class("app-icon-large"))
        })
    }
}

/// An in-memory page snapshot.
///
/// Used by the replay driver and by tests. Scroll position is mutable so a
/// session can move through the document; navigations are recorded instead
/// of performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticPage {
    pub path: String,

    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub referrer: String,

    #[serde(default)]
    pub user_agent: String,

    pub viewport_width: f64,

    pub viewport_height: f64,

    pub document_height: f64,

    #[serde(default)]
    pub scroll_top: f64,

    #[serde(default)]
    pub elements: Vec<(PageElement, usize)>,

    /// URLs passed to [`Page::open_in_new_tab`], in order.
    #[serde(default, skip_deserializing)]
    pub opened: Vec<String>,
}

impl StaticPage {
    /// Creates a desktop-sized page at `path` with no landmarks.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: String::new(),
            referrer: String::new(),
            user_agent: String::new(),
            viewport_width: 1280.0,
            viewport_height: 800.0,
            document_height: 800.0,
            scroll_top: 0.0,
            elements: Vec::new(),
            opened: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    #[must_use]
    pub fn with_document_height(mut self, height: f64) -> Self {
        self.document_height = height;
        self
    }

    #[must_use]
    pub fn with_element(mut self, element: PageElement, count: usize) -> Self {
        self.set_element_count(element, count);
        self
    }

    pub fn set_element_count(&mut self, element: PageElement, count: usize) {
        match self.elements.iter_mut().find(|(el, _)| *el == element) {
            Some(entry) => entry.1 = count,
            None => self.elements.push((element, count)),
        }
    }

    pub fn scroll_to(&mut self, top: f64) {
        self.scroll_top = top;
    }
}

impl Page for StaticPage {
    fn path(&self) -> &str {
        &self.path
    }

    fn query(&self) -> &str {
        &self.query
    }

    fn referrer(&self) -> &str {
        &self.referrer
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn document_height(&self) -> f64 {
        self.document_height
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn element_count(&self, element: PageElement) -> usize {
        self.elements
            .iter()
            .find(|(el, _)| *el == element)
            .map_or(0, |(_, count)| *count)
    }

    fn open_in_new_tab(&mut self, url: &str) {
        self.opened.push(url.to_string());
    }
}
