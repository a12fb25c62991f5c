//! Behavioural guarantees of the landing page tracker.
//!
//! These tests pin down the event-emission contract the analytics dashboards
//! depend on:
//!
//! 1. Milestones and section views fire at most once per session
//! 2. Scroll depth stays within [0, 100]
//! 3. Device, browser and OS classification are deterministic
//! 4. App-card slugs resolve through the table or the hyphenated fallback
//! 5. A missing token or sink leaves the tracker silent
//! 6. Event names follow the configured naming convention exactly

use landing_tracker::config::{EventNaming, TrackerOptions};
use landing_tracker::context::{browser, device_type, os, scroll_depth};
use landing_tracker::page::{ClickTarget, Element, PageElement, StaticPage};
use landing_tracker::sink::RecordingSink;
use landing_tracker::tracker::{Tracker, SCROLL_MILESTONES};
use landing_tracker::types::{Browser, DeviceType, Os, Section};

// =============================================================================
// Test Helpers
// =============================================================================

/// An app page with every landmark present and 2000px of scrollable content.
fn app_page() -> StaticPage {
    StaticPage::new("/soundboard/")
        .with_viewport(1280.0, 800.0)
        .with_document_height(2800.0)
        .with_element(PageElement::LogoLink, 1)
        .with_element(PageElement::ScreenshotsGrid, 1)
        .with_element(PageElement::ScreenshotImage, 3)
        .with_element(PageElement::FeaturesGrid, 1)
        .with_element(PageElement::FeatureCard, 6)
}

/// The listing page with four app cards.
fn home_page() -> StaticPage {
    StaticPage::new("/").with_element(PageElement::AppCard, 4)
}

fn bare_tracker(page: StaticPage) -> (Tracker<RecordingSink, StaticPage>, RecordingSink) {
    let sink = RecordingSink::new();
    let options = TrackerOptions::default().with_naming(EventNaming::Bare);
    let tracker = Tracker::init("token", options, sink.clone(), page);
    (tracker, sink)
}

fn scroll_and_frame(tracker: &mut Tracker<RecordingSink, StaticPage>, top: f64) {
    tracker.page_mut().scroll_to(top);
    if tracker.on_scroll() {
        tracker.on_animation_frame();
    }
}

fn card(label: &str) -> ClickTarget {
    ClickTarget::new(vec![
        Element::new("span").with_class("app-name"),
        Element::new("a")
            .with_class("app-card")
            .with_href("/x/")
            .with_app_name(label),
    ])
}

// =============================================================================
// De-duplication
// =============================================================================

#[test]
fn each_scroll_milestone_fires_exactly_once() {
    let (mut tracker, sink) = bare_tracker(app_page());

    // Reach 100% and keep scrolling around the bottom of the page.
    for top in [2000.0, 1990.0, 2000.0, 2100.0, 2000.0, 1950.0, 2000.0] {
        scroll_and_frame(&mut tracker, top);
    }

    let events = sink.events_named("scroll_milestone");
    assert_eq!(events.len(), SCROLL_MILESTONES.len());
    for (event, milestone) in events.iter().zip(SCROLL_MILESTONES) {
        assert_eq!(
            event.attribute("scroll_depth").unwrap().as_i64(),
            Some(i64::from(milestone))
        );
    }
}

#[test]
fn milestone_reached_gradually_fires_once() {
    let (mut tracker, sink) = bare_tracker(app_page());

    for step in 0..=40 {
        scroll_and_frame(&mut tracker, f64::from(step) * 50.0);
    }

    assert_eq!(sink.events_named("scroll_milestone").len(), 4);
}

#[test]
fn reinvoking_fired_trackers_makes_no_sink_calls() {
    let (mut tracker, sink) = bare_tracker(app_page());

    tracker.track_scroll_milestone(50);
    tracker.track_section_view(Section::Features);
    tracker.on_time_milestone(30);
    let baseline = sink.call_count();

    for _ in 0..5 {
        tracker.track_scroll_milestone(50);
        tracker.track_section_view(Section::Features);
        tracker.on_section_visible(Section::Features, 1.0);
        tracker.on_time_milestone(30);
    }

    assert_eq!(sink.call_count(), baseline);
}

// =============================================================================
// Context derivation
// =============================================================================

#[test]
fn scroll_depth_always_within_bounds() {
    let cases = [
        (0.0, 2000.0, 800.0),
        (-500.0, 2000.0, 800.0),
        (5000.0, 2000.0, 800.0),
        (100.0, 800.0, 800.0),
        (0.0, 800.0, 800.0),
        (100.0, 400.0, 800.0),
        (f64::MAX, 2000.0, 800.0),
    ];

    for (top, doc, viewport) in cases {
        let depth = scroll_depth(top, doc, viewport);
        assert!(depth <= 100, "depth {depth} out of range for {top}/{doc}/{viewport}");
    }
    assert_eq!(scroll_depth(100.0, 800.0, 800.0), 0);
}

#[test]
fn device_classification_boundaries() {
    assert_eq!(device_type(767.0), DeviceType::Mobile);
    assert_eq!(device_type(768.0), DeviceType::Tablet);
    assert_eq!(device_type(1023.0), DeviceType::Tablet);
    assert_eq!(device_type(1024.0), DeviceType::Desktop);
}

#[test]
fn iphone_user_agent_claiming_mac_is_ios() {
    let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 Version/17.1 Mobile Safari/604.1";
    assert_eq!(os(ua), Os::Ios);
    assert_eq!(browser(ua), Browser::Safari);
}

#[test]
fn chromium_edge_reports_chrome() {
    let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    assert_eq!(browser(ua), Browser::Chrome);
    assert_eq!(os(ua), Os::Windows);
}

// =============================================================================
// Click mapping
// =============================================================================

#[test]
fn learn_more_slugs() {
    let (mut tracker, sink) = bare_tracker(home_page());

    tracker.on_click(&card("Sound Board"));
    tracker.on_click(&card("Unknown App"));

    let slugs: Vec<String> = sink
        .events_named("learn_more_clicked")
        .iter()
        .filter_map(|e| e.attribute("app_name")?.as_str().map(str::to_string))
        .collect();
    assert_eq!(slugs, vec!["soundboard", "unknown-app"]);
}

#[test]
fn store_link_inside_card_tracks_both() {
    let (mut tracker, sink) = bare_tracker(home_page());
    let click = ClickTarget::new(vec![
        Element::new("a").with_href("https://apps.apple.com/app/id9"),
        Element::new("div")
            .with_class("app-card")
            .with_app_name("Beat Maker"),
    ]);

    let nav = tracker.on_click(&click);

    assert!(nav.is_some());
    assert_eq!(
        sink.tracked_names(),
        vec!["page_viewed", "learn_more_clicked", "download_button_clicked"]
    );
}

// =============================================================================
// Initialization failures
// =============================================================================

#[test]
fn empty_token_produces_no_sink_calls() {
    let sink = RecordingSink::new();
    let mut tracker = Tracker::init("", TrackerOptions::default(), sink.clone(), app_page());

    scroll_and_frame(&mut tracker, 2000.0);
    tracker.on_section_visible(Section::Screenshots, 1.0);
    tracker.on_click(&card("Metronome"));

    assert!(!tracker.is_active());
    assert!(tracker.config().is_none());
    assert_eq!(sink.call_count(), 0);
}

#[test]
fn unavailable_sink_produces_no_sink_calls() {
    let sink = RecordingSink::unavailable();
    let tracker = Tracker::init("token", TrackerOptions::default(), sink.clone(), app_page());

    assert!(!tracker.is_active());
    assert_eq!(sink.call_count(), 0);
}

// =============================================================================
// Naming convention
// =============================================================================

#[test]
fn project_name_prefixes_page_view_exactly() {
    let sink = RecordingSink::new();
    let options = TrackerOptions::default().with_project_name("metronome");
    let _tracker = Tracker::init("token", options, sink.clone(), app_page());

    assert_eq!(sink.tracked_names(), vec!["[metronome] page_viewed"]);
}

#[test]
fn bare_naming_ignores_project_name() {
    let sink = RecordingSink::new();
    let options = TrackerOptions::default()
        .with_project_name("metronome")
        .with_naming(EventNaming::Bare);
    let _tracker = Tracker::init("token", options, sink.clone(), app_page());

    assert_eq!(sink.tracked_names(), vec!["page_viewed"]);
}

#[test]
fn inferred_label_prefixes_every_event() {
    let sink = RecordingSink::new();
    let mut tracker = Tracker::init("token", TrackerOptions::default(), sink.clone(), app_page());

    scroll_and_frame(&mut tracker, 500.0);
    tracker.on_section_visible(Section::Screenshots, 0.75);

    assert!(sink
        .tracked_names()
        .iter()
        .all(|name| name.starts_with("[soundboard] ")));
    assert_eq!(sink.events().len(), 3);
}
