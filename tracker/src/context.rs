//! Context derivation for analytics events.
//!
//! Every function here is pure: it looks only at its arguments and is
//! recomputed for each event rather than cached. The classification order
//! for browsers and operating systems is fixed and intentionally naive;
//! downstream dashboards are built on exactly these categories, so a user
//! agent that claims several platforms resolves to whichever marker is
//! checked first.
//!
//! # Example
//!
//! ```
//! use landing_tracker::context::{device_type, os, scroll_depth};
//! use landing_tracker::types::{DeviceType, Os};
//!
//! assert_eq!(device_type(767.0), DeviceType::Mobile);
//! assert_eq!(os("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"), Os::Ios);
//! assert_eq!(scroll_depth(500.0, 2000.0, 1000.0), 50);
//! ```

use crate::page::ClickTarget;
use crate::types::{Browser, ButtonLocation, DeviceType, Os};

/// Viewports narrower than this are classified as mobile.
pub const MOBILE_MAX_WIDTH: f64 = 768.0;

/// Viewports narrower than this (and not mobile) are classified as tablet.
pub const TABLET_MAX_WIDTH: f64 = 1024.0;

/// Referrer reported when the visit has none.
pub const DIRECT_REFERRER: &str = "direct";

/// Placeholder until a geolocation source exists.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Page name used when the path cannot be resolved.
pub const UNKNOWN_PAGE: &str = "unknown";

/// Page name of the listing page.
pub const HOME_PAGE: &str = "home";

/// Browser markers in match priority order.
const BROWSER_MARKERS: &[(&str, Browser)] = &[
    ("Chrome", Browser::Chrome),
    ("Safari", Browser::Safari),
    ("Firefox", Browser::Firefox),
    ("Edge", Browser::Edge),
];

/// OS markers in match priority order. iOS devices also advertise
/// "Mac OS X", so their markers come before the generic "Mac" check.
const OS_MARKERS: &[(&str, Os)] = &[
    ("iPhone", Os::Ios),
    ("iPad", Os::Ios),
    ("Android", Os::Android),
    ("Windows", Os::Windows),
    ("Mac", Os::MacOs),
    ("Linux", Os::Linux),
];

/// Card labels whose app slug differs from the hyphenated label.
const APP_SLUGS: &[(&str, &str)] = &[
    ("metronome", "metronome"),
    ("sound board", "soundboard"),
    ("decibel meter", "decibel-meter"),
    ("beat maker", "beatmaker"),
];

/// Classifies the device from the viewport width.
#[must_use]
pub fn device_type(viewport_width: f64) -> DeviceType {
    if viewport_width < MOBILE_MAX_WIDTH {
        DeviceType::Mobile
    } else if viewport_width < TABLET_MAX_WIDTH {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

/// Classifies the browser by the first matching user-agent marker.
///
/// Chrome is checked first, so Chromium-based Edge (whose UA also contains
/// "Chrome") reports as Chrome.
#[must_use]
pub fn browser(user_agent: &str) -> Browser {
    BROWSER_MARKERS
        .iter()
        .find(|(marker, _)| user_agent.contains(marker))
        .map_or(Browser::Unknown, |(_, browser)| *browser)
}

/// Classifies the operating system by the first matching user-agent marker.
#[must_use]
pub fn os(user_agent: &str) -> Os {
    OS_MARKERS
        .iter()
        .find(|(marker, _)| user_agent.contains(marker))
        .map_or(Os::Unknown, |(_, os)| *os)
}

/// Reads a query-string parameter.
///
/// Values are form-decoded the way `URLSearchParams` does. A missing or empty
/// parameter yields `None`. If the key repeats, the first occurrence wins.
#[must_use]
pub fn utm_param(query: &str, key: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Returns the referrer, or `"direct"` when there is none.
#[must_use]
pub fn referrer_or_direct(referrer: &str) -> &str {
    if referrer.is_empty() {
        DIRECT_REFERRER
    } else {
        referrer
    }
}

/// Computes scroll depth as a whole percentage in `[0, 100]`.
///
/// When the document is no taller than the viewport there is nothing to
/// scroll and the depth is 0. Milestones only ever fire from real scrolling.
///
/// # Examples
///
/// ```
/// use landing_tracker::context::scroll_depth;
///
/// assert_eq!(scroll_depth(0.0, 3000.0, 1000.0), 0);
/// assert_eq!(scroll_depth(2000.0, 3000.0, 1000.0), 100);
/// assert_eq!(scroll_depth(250.0, 1000.0, 1000.0), 0); // nothing to scroll
/// ```
#[must_use]
pub fn scroll_depth(scroll_top: f64, document_height: f64, viewport_height: f64) -> u8 {
    let scrollable = document_height - viewport_height;
    if scrollable.is_nan() || scrollable <= 0.0 || !scroll_top.is_finite() {
        return 0;
    }

    let depth = (scroll_top / scrollable * 100.0).round();
    // Clamped, so the cast cannot truncate.
    depth.clamp(0.0, 100.0) as u8
}

/// Derives the page name from the location path.
///
/// `/` and `/index.html` are the home page; anything else is named after its
/// first path segment.
///
/// # Examples
///
/// ```
/// use landing_tracker::context::page_name;
///
/// assert_eq!(page_name("/"), "home");
/// assert_eq!(page_name("/metronome/index.html"), "metronome");
/// assert_eq!(page_name(""), "unknown");
/// ```
#[must_use]
pub fn page_name(path: &str) -> String {
    if path == "/" || path == "/index.html" {
        return HOME_PAGE.to_string();
    }

    // First non-empty segment that follows a slash; repeated slashes are skipped.
    path.split('/')
        .skip(1)
        .find(|segment| !segment.is_empty())
        .map_or_else(|| UNKNOWN_PAGE.to_string(), str::to_string)
}

/// Resolves the app slug from an app card's visible name.
///
/// Known names map through a fixed table; anything else is lowercased with
/// whitespace runs collapsed to single hyphens. Returns `None` for a blank
/// label.
///
/// # Examples
///
/// ```
/// use landing_tracker::context::app_slug;
///
/// assert_eq!(app_slug("Sound Board").as_deref(), Some("soundboard"));
/// assert_eq!(app_slug("Unknown App").as_deref(), Some("unknown-app"));
/// assert_eq!(app_slug("   "), None);
/// ```
#[must_use]
pub fn app_slug(card_label: &str) -> Option<String> {
    let name = card_label.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }

    let slug = APP_SLUGS
        .iter()
        .find(|(label, _)| *label == name)
        .map_or_else(
            || name.split_whitespace().collect::<Vec<_>>().join("-"),
            |(_, slug)| (*slug).to_string(),
        );

    Some(slug)
}

/// Locates a download control within the page layout.
///
/// Regions are checked in order hero, CTA section, footer; the innermost
/// matching ancestor of a given kind is enough.
#[must_use]
pub fn button_location(click: &ClickTarget) -> ButtonLocation {
    if click.closest(|el| el.has_class("app-hero")).is_some() {
        ButtonLocation::Hero
    } else if click.closest(|el| el.has_class("cta-section")).is_some() {
        ButtonLocation::CtaSection
    } else if click.closest(|el| el.tag == "footer").is_some() {
        ButtonLocation::Footer
    } else {
        ButtonLocation::Unknown
    }
}

/// Visitor country. Always [`UNKNOWN_COUNTRY`] for now.
#[must_use]
pub fn country() -> &'static str {
    UNKNOWN_COUNTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Element;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const LEGACY_EDGE_WINDOWS: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Edge/18.19045";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

    #[test]
    fn device_thresholds() {
        assert_eq!(device_type(320.0), DeviceType::Mobile);
        assert_eq!(device_type(767.0), DeviceType::Mobile);
        assert_eq!(device_type(768.0), DeviceType::Tablet);
        assert_eq!(device_type(1023.0), DeviceType::Tablet);
        assert_eq!(device_type(1024.0), DeviceType::Desktop);
        assert_eq!(device_type(2560.0), DeviceType::Desktop);
    }

    #[test]
    fn browser_priority_order() {
        assert_eq!(browser(CHROME_MAC), Browser::Chrome);
        assert_eq!(browser(SAFARI_IPHONE), Browser::Safari);
        assert_eq!(browser(FIREFOX_LINUX), Browser::Firefox);
        assert_eq!(browser(LEGACY_EDGE_WINDOWS), Browser::Edge);
        assert_eq!(browser("curl/8.4.0"), Browser::Unknown);
        assert_eq!(browser(""), Browser::Unknown);
    }

    #[test]
    fn os_priority_order() {
        assert_eq!(os(SAFARI_IPHONE), Os::Ios);
        assert_eq!(os("Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X)"), Os::Ios);
        assert_eq!(os(CHROME_ANDROID), Os::Android);
        assert_eq!(os(LEGACY_EDGE_WINDOWS), Os::Windows);
        assert_eq!(os(CHROME_MAC), Os::MacOs);
        assert_eq!(os(FIREFOX_LINUX), Os::Linux);
        assert_eq!(os("curl/8.4.0"), Os::Unknown);
    }

    #[test]
    fn iphone_with_mac_marker_is_ios() {
        let ua = "iPhone something Mac";
        assert!(ua.contains("Mac"));
        assert_eq!(os(ua), Os::Ios);
    }

    #[test]
    fn utm_params_read_verbatim() {
        let query = "?utm_source=newsletter&utm_campaign=spring%20launch&utm_medium=email";
        assert_eq!(utm_param(query, "utm_source").as_deref(), Some("newsletter"));
        assert_eq!(
            utm_param(query, "utm_campaign").as_deref(),
            Some("spring launch")
        );
        assert_eq!(utm_param(query, "utm_medium").as_deref(), Some("email"));
    }

    #[test]
    fn utm_params_absent_or_empty_are_none() {
        assert_eq!(utm_param("", "utm_source"), None);
        assert_eq!(utm_param("utm_source=", "utm_source"), None);
        assert_eq!(utm_param("ref=abc", "utm_source"), None);
    }

    #[test]
    fn utm_plus_decodes_to_space() {
        assert_eq!(
            utm_param("utm_campaign=black+friday", "utm_campaign").as_deref(),
            Some("black friday")
        );
    }

    #[test]
    fn referrer_defaults_to_direct() {
        assert_eq!(referrer_or_direct(""), "direct");
        assert_eq!(
            referrer_or_direct("https://news.ycombinator.com/"),
            "https://news.ycombinator.com/"
        );
    }

    #[test]
    fn scroll_depth_rounds() {
        assert_eq!(scroll_depth(0.0, 3000.0, 1000.0), 0);
        assert_eq!(scroll_depth(499.0, 3000.0, 1000.0), 25);
        assert_eq!(scroll_depth(1000.0, 3000.0, 1000.0), 50);
        assert_eq!(scroll_depth(1500.0, 3000.0, 1000.0), 75);
        assert_eq!(scroll_depth(2000.0, 3000.0, 1000.0), 100);
    }

    #[test]
    fn scroll_depth_clamped() {
        // Overscroll (rubber-banding) past the bottom and above the top.
        assert_eq!(scroll_depth(2600.0, 3000.0, 1000.0), 100);
        assert_eq!(scroll_depth(-80.0, 3000.0, 1000.0), 0);
    }

    #[test]
    fn scroll_depth_without_scrollable_content_is_zero() {
        assert_eq!(scroll_depth(0.0, 900.0, 900.0), 0);
        assert_eq!(scroll_depth(40.0, 900.0, 900.0), 0);
        assert_eq!(scroll_depth(40.0, 600.0, 900.0), 0);
    }

    #[test]
    fn scroll_depth_ignores_non_finite_offsets() {
        assert_eq!(scroll_depth(f64::NAN, 3000.0, 1000.0), 0);
        assert_eq!(scroll_depth(f64::INFINITY, 3000.0, 1000.0), 0);
    }

    #[test]
    fn page_names() {
        assert_eq!(page_name("/"), "home");
        assert_eq!(page_name("/index.html"), "home");
        assert_eq!(page_name("/metronome"), "metronome");
        assert_eq!(page_name("/metronome/"), "metronome");
        assert_eq!(page_name("/decibel-meter/index.html"), "decibel-meter");
        assert_eq!(page_name("//"), "unknown");
        assert_eq!(page_name("//metronome/"), "metronome");
        assert_eq!(page_name("metronome"), "unknown");
        assert_eq!(page_name(""), "unknown");
    }

    #[test]
    fn app_slugs_from_table() {
        assert_eq!(app_slug("Metronome").as_deref(), Some("metronome"));
        assert_eq!(app_slug("Sound Board").as_deref(), Some("soundboard"));
        assert_eq!(app_slug("  Decibel Meter ").as_deref(), Some("decibel-meter"));
        assert_eq!(app_slug("Beat Maker").as_deref(), Some("beatmaker"));
    }

    #[test]
    fn app_slugs_fallback() {
        assert_eq!(app_slug("Unknown App").as_deref(), Some("unknown-app"));
        assert_eq!(app_slug("Guitar   Tuner").as_deref(), Some("guitar-tuner"));
        assert_eq!(app_slug(""), None);
    }

    #[test]
    fn button_locations() {
        let hero = ClickTarget::new(vec![
            Element::new("a").with_class("btn-app-store"),
            Element::new("section").with_class("app-hero"),
        ]);
        assert_eq!(button_location(&hero), ButtonLocation::Hero);

        let cta = ClickTarget::new(vec![
            Element::new("a").with_class("btn-app-store"),
            Element::new("section").with_class("cta-section"),
            Element::new("main"),
        ]);
        assert_eq!(button_location(&cta), ButtonLocation::CtaSection);

        let footer = ClickTarget::new(vec![
            Element::new("a").with_class("btn-app-store"),
            Element::new("footer"),
        ]);
        assert_eq!(button_location(&footer), ButtonLocation::Footer);

        let loose = ClickTarget::new(vec![Element::new("a").with_class("btn-app-store")]);
        assert_eq!(button_location(&loose), ButtonLocation::Unknown);
    }

    #[test]
    fn hero_wins_over_footer() {
        let nested = ClickTarget::new(vec![
            Element::new("a").with_class("btn-app-store"),
            Element::new("footer"),
            Element::new("div").with_class("app-hero"),
        ]);
        assert_eq!(button_location(&nested), ButtonLocation::Hero);
    }

    #[test]
    fn country_is_placeholder() {
        assert_eq!(country(), "Unknown");
    }
}
