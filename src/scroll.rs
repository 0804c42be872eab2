//! Scroll driven loading and view lifetimes.
//!
//! A view that shows a paginated list mounts a [ScrollSubscription]. The
//! subscription loads the first page straight away and then loads another
//! page whenever the viewport reports that it is close to the bottom of the
//! content. Dropping the subscription stops it, so a closed view never
//! triggers loads.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{sync::watch, task::JoinHandle};

use crate::pagination::{PageSource, Paginator};

/// The scroll position reported by a view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Height of the visible area.
    pub height: f64,
    /// How far the content has been scrolled.
    pub scroll_offset: f64,
    /// Total height of the content.
    pub content_height: f64,
}

impl Viewport {
    /// Whether the bottom of the visible area is within `threshold` of the
    /// bottom of the content.
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.height + self.scroll_offset >= self.content_height - threshold
    }
}

/// Marks a view as open. Dropping it marks the view as closed.
#[derive(Debug)]
pub struct ViewLifetime {
    alive: Arc<AtomicBool>,
}

impl ViewLifetime {
    /// Open a view.
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A guard that reports whether this view is still open.
    pub fn guard(&self) -> LivenessGuard {
        LivenessGuard {
            alive: self.alive.clone(),
        }
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewLifetime {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Checks whether the view that handed it out is still open.
#[derive(Debug, Clone)]
pub struct LivenessGuard {
    alive: Arc<AtomicBool>,
}

impl LivenessGuard {
    /// Whether the view is still open.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Loads pages as the viewport nears the bottom of the content.
///
/// The background task is aborted when the subscription is dropped.
#[derive(Debug)]
pub struct ScrollSubscription {
    task: JoinHandle<()>,
}

impl ScrollSubscription {
    /// Whether the subscription has stopped, either because the viewport
    /// sender was dropped or because it was cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<S: PageSource> Paginator<S> {
    /// Load the first page and keep loading pages while `viewport` reports
    /// positions within `threshold` of the bottom.
    ///
    /// Must be called from within a tokio runtime. Failed loads are logged
    /// (and shown, if the paginator has notifications) and the next scroll
    /// event retries.
    pub fn mount(&self, mut viewport: watch::Receiver<Viewport>, threshold: f64) -> ScrollSubscription {
        let paginator = self.clone();

        let task = tokio::spawn(async move {
            // Errors are already logged and reported by `load`.
            let _ = paginator.load().await;

            while viewport.changed().await.is_ok() {
                let position = *viewport.borrow_and_update();

                if position.is_near_bottom(threshold) {
                    let _ = paginator.load().await;
                }
            }

            tracing::debug!("viewport closed, stopping scroll loading");
        });

        ScrollSubscription { task }
    }
}

#[cfg(test)]
mod scroll_tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::sync::{Notify, watch};

    use crate::{
        Error,
        pagination::{LoadOutcome, Page, PageSource, Paginator},
        scroll::{ViewLifetime, Viewport},
    };

    /// Serves endless pages of three items and counts requests.
    ///
    /// If `first_page_gate` is set the first fetch waits for it.
    struct EndlessSource {
        requests: Arc<AtomicUsize>,
        first_page_gate: Option<Arc<Notify>>,
    }

    impl PageSource for EndlessSource {
        type Item = usize;

        async fn fetch_page(&self, _cursor: Option<String>) -> Result<Page<usize>, Error> {
            let n = self.requests.fetch_add(1, Ordering::SeqCst);

            if let (0, Some(gate)) = (n, &self.first_page_gate) {
                gate.notified().await;
            }

            Ok(Page {
                items: vec![n; 3],
                next_cursor: Some(format!("c{}", n + 1)),
            })
        }
    }

    fn endless_paginator() -> (Paginator<EndlessSource>, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        let source = EndlessSource {
            requests: requests.clone(),
            first_page_gate: None,
        };

        (Paginator::new(source), requests)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn at(scroll_offset: f64) -> Viewport {
        Viewport {
            height: 800.0,
            scroll_offset,
            content_height: 2_000.0,
        }
    }

    #[test]
    fn near_bottom_uses_threshold() {
        assert!(!at(999.0).is_near_bottom(200.0));
        assert!(at(1_000.0).is_near_bottom(200.0));
        assert!(at(1_200.0).is_near_bottom(200.0));
    }

    #[tokio::test]
    async fn mount_loads_first_page() {
        let (paginator, requests) = endless_paginator();
        let (_viewport, receiver) = watch::channel(at(0.0));

        let _subscription = paginator.mount(receiver, 200.0);
        settle().await;

        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(paginator.len(), 3);
    }

    #[tokio::test]
    async fn scrolling_near_bottom_loads_next_page() {
        let (paginator, requests) = endless_paginator();
        let (viewport, receiver) = watch::channel(at(0.0));
        let _subscription = paginator.mount(receiver, 200.0);
        settle().await;

        viewport.send(at(500.0)).unwrap();
        settle().await;
        assert_eq!(requests.load(Ordering::SeqCst), 1, "far from the bottom");

        viewport.send(at(1_100.0)).unwrap();
        settle().await;
        assert_eq!(requests.load(Ordering::SeqCst), 2);
        assert_eq!(paginator.len(), 6);
    }

    #[tokio::test]
    async fn dropped_subscription_stops_loading() {
        let (paginator, requests) = endless_paginator();
        let (viewport, receiver) = watch::channel(at(0.0));
        let subscription = paginator.mount(receiver, 200.0);
        settle().await;

        drop(subscription);
        settle().await;
        let _ = viewport.send(at(1_200.0));
        settle().await;

        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_subscription_mid_fetch_does_not_block_later_loads() {
        let requests = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let paginator = Paginator::new(EndlessSource {
            requests: requests.clone(),
            first_page_gate: Some(gate.clone()),
        });
        let (_viewport, receiver) = watch::channel(at(0.0));
        let subscription = paginator.mount(receiver, 200.0);
        settle().await;
        assert!(paginator.is_loading());

        drop(subscription);
        settle().await;
        gate.notify_one();

        assert!(!paginator.is_loading());
        assert_eq!(paginator.load().await, Ok(LoadOutcome::Loaded(3)));
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closed_viewport_ends_subscription() {
        let (paginator, _requests) = endless_paginator();
        let (viewport, receiver) = watch::channel(at(0.0));
        let subscription = paginator.mount(receiver, 200.0);
        settle().await;

        drop(viewport);
        settle().await;

        assert!(subscription.is_finished());
    }

    #[test]
    fn guard_tracks_view_lifetime() {
        let view = ViewLifetime::new();
        let guard = view.guard();
        assert!(guard.is_alive());

        drop(view);

        assert!(!guard.is_alive());
    }
}
