//! Single-threaded page host.
//!
//! The host plays the part of the browser's event loop. It owns the tracker,
//! receives page events over a channel and runs the tracker's deferred
//! callbacks:
//!
//! - an animation frame after a coalesced scroll (one outstanding at a time)
//! - one-shot time-milestone timers measured from tracker initialization
//! - the delayed store navigation after a download click
//!
//! Everything runs on one task; deferred callbacks live in a
//! [`FuturesUnordered`] polled in the same `select!` loop as the channel, so
//! the tracker's state is never shared and needs no locking. Timers are never
//! cancelled. They simply stop being polled when the page unloads.
//!
//! # Example
//!
//! ```
//! use landing_tracker::config::TrackerOptions;
//! use landing_tracker::host::{PageEvent, PageHost};
//! use landing_tracker::page::StaticPage;
//! use landing_tracker::sink::RecordingSink;
//! use landing_tracker::tracker::Tracker;
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = RecordingSink::new();
//! let page = StaticPage::new("/").with_document_height(1800.0);
//! let tracker = Tracker::init("token", TrackerOptions::default(), sink.clone(), page);
//!
//! let (tx, rx) = mpsc::channel(16);
//! tx.send(PageEvent::Scroll { top: 1000.0 }).await.unwrap();
//! tx.send(PageEvent::Unload).await.unwrap();
//!
//! let _tracker = PageHost::new(tracker).run(rx).await;
//! # }
//! ```

use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::page::{ClickTarget, Page, StaticPage};
use crate::sink::Sink;
use crate::tracker::Tracker;
use crate::types::Section;

/// Delay before a scheduled animation frame runs (one frame at 60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Pages whose scroll position the host can move.
///
/// Browsers update the scroll offset themselves; in-memory pages need the
/// host to do it before the scroll event is dispatched.
pub trait Scrollable {
    fn scroll_to(&mut self, top: f64);
}

impl Scrollable for StaticPage {
    fn scroll_to(&mut self, top: f64) {
        StaticPage::scroll_to(self, top);
    }
}

/// Events delivered to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// A click; `path` is the target followed by its ancestors.
    Click { path: ClickTarget },

    /// The page scrolled to `top`.
    Scroll { top: f64 },

    /// An observed section's visible fraction changed.
    SectionVisible { section: Section, ratio: f64 },

    /// The page is navigating away. Pending callbacks are dropped.
    Unload,
}

/// Callbacks scheduled to run later on the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    AnimationFrame,
    TimeMilestone(u64),
    Navigate(String),
}

type DeferredFuture = Pin<Box<dyn Future<Output = Deferred>>>;

fn defer_until(deadline: Instant, callback: Deferred) -> DeferredFuture {
    Box::pin(async move {
        sleep_until(deadline).await;
        callback
    })
}

/// Cooperative event loop around a [`Tracker`].
pub struct PageHost<S: Sink, P: Page + Scrollable> {
    tracker: Tracker<S, P>,
    frame_interval: Duration,
}

impl<S: Sink, P: Page + Scrollable> PageHost<S, P> {
    #[must_use]
    pub fn new(tracker: Tracker<S, P>) -> Self {
        Self {
            tracker,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Overrides the animation frame delay.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    #[must_use]
    pub fn tracker(&self) -> &Tracker<S, P> {
        &self.tracker
    }

    /// Runs until the page unloads, or until the channel is closed and no
    /// callbacks remain. Returns the tracker for inspection.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> Tracker<S, P> {
        let mut deferred: FuturesUnordered<DeferredFuture> = FuturesUnordered::new();
        self.schedule_time_milestones(&mut deferred);

        let mut channel_open = true;
        loop {
            tokio::select! {
                event = events.recv(), if channel_open => match event {
                    Some(event) => {
                        if self.dispatch(event, &mut deferred).is_break() {
                            debug!(pending = deferred.len(), "Page unloaded");
                            break;
                        }
                    }
                    None => {
                        trace!("Event channel closed");
                        channel_open = false;
                    }
                },
                Some(callback) = deferred.next(), if !deferred.is_empty() => {
                    self.run_deferred(callback);
                }
                else => break,
            }
        }

        self.tracker
    }

    fn schedule_time_milestones(&self, deferred: &mut FuturesUnordered<DeferredFuture>) {
        let (Some(plan), Some(state)) = (self.tracker.listeners(), self.tracker.state()) else {
            return;
        };

        for delay in &plan.time_milestones {
            deferred.push(defer_until(
                state.page_start() + *delay,
                Deferred::TimeMilestone(delay.as_secs()),
            ));
        }
    }

    fn dispatch(
        &mut self,
        event: PageEvent,
        deferred: &mut FuturesUnordered<DeferredFuture>,
    ) -> ControlFlow<()> {
        match event {
            PageEvent::Click { path } => {
                if let Some(nav) = self.tracker.on_click(&path) {
                    deferred.push(defer_until(
                        Instant::now() + nav.delay,
                        Deferred::Navigate(nav.url),
                    ));
                }
            }
            PageEvent::Scroll { top } => {
                self.tracker.page_mut().scroll_to(top);
                if self.tracker.on_scroll() {
                    deferred.push(defer_until(
                        Instant::now() + self.frame_interval,
                        Deferred::AnimationFrame,
                    ));
                }
            }
            PageEvent::SectionVisible { section, ratio } => {
                self.tracker.on_section_visible(section, ratio);
            }
            PageEvent::Unload => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn run_deferred(&mut self, callback: Deferred) {
        match callback {
            Deferred::AnimationFrame => self.tracker.on_animation_frame(),
            Deferred::TimeMilestone(secs) => self.tracker.on_time_milestone(secs),
            Deferred::Navigate(url) => {
                info!(url = %url, "Opening store link");
                self.tracker.page_mut().open_in_new_tab(&url);
            }
        }
    }
}
