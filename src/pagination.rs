//! This module defines the common functionality for loading cursor paged data.
//!
//! A [Paginator] accumulates the pages of a list (the feed, the trips) as the
//! user scrolls. The backend hands out an opaque cursor with every page and a
//! missing or empty cursor means the list has been read to the end.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, api::ApiClient, notification::NotificationQueue, optimistic::LocalState, post::Post,
    trip::Trip,
};

/// One page of a cursor paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The records on this page, in backend order.
    pub items: Vec<T>,
    /// The cursor of the next page, `None` or empty on the last page.
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// Fetches pages of a list from the backend.
pub trait PageSource: Send + Sync + 'static {
    /// The records in the list.
    type Item: Send + 'static;

    /// Fetch the page that starts at `cursor`, or the first page if `None`.
    fn fetch_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<Self::Item>, Error>> + Send;
}

/// The pages of the post feed.
#[derive(Debug, Clone)]
pub struct FeedSource {
    api: ApiClient,
}

impl FeedSource {
    /// Read the feed from `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl PageSource for FeedSource {
    type Item = Post;

    async fn fetch_page(&self, cursor: Option<String>) -> Result<Page<Post>, Error> {
        self.api.feed_page(cursor.as_deref()).await
    }
}

/// The pages of the trip listing.
#[derive(Debug, Clone)]
pub struct TripSource {
    api: ApiClient,
}

impl TripSource {
    /// Read the trip listing from `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl PageSource for TripSource {
    type Item = Trip;

    async fn fetch_page(&self, cursor: Option<String>) -> Result<Page<Trip>, Error> {
        self.api.trips_page(cursor.as_deref()).await
    }
}

/// What a call to [Paginator::load] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many records were appended.
    Loaded(usize),
    /// Another load was already in flight, nothing was requested.
    InFlight,
    /// The last page was already loaded, nothing was requested.
    Exhausted,
}

/// The records loaded so far and where to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    /// Every record loaded so far, in backend order.
    pub items: Vec<T>,
    /// The cursor for the next page, `None` before the first page and after
    /// the last one.
    pub cursor: Option<String>,
    /// Whether the last page has been loaded. Once set, it stays set.
    pub exhausted: bool,
    /// Whether a page is being fetched.
    pub loading: bool,
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            exhausted: false,
            loading: false,
        }
    }
}

/// Clears the loading flag if a load is cancelled while its fetch is pending,
/// e.g. when the task running it is aborted.
struct LoadingGuard<'a, T> {
    state: &'a Mutex<PageState<T>>,
    armed: bool,
}

impl<T> LoadingGuard<'_, T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("page load cancelled before the fetch finished");
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .loading = false;
        }
    }
}

/// Loads a cursor paginated list one page at a time.
///
/// At most one page is fetched at a time. Cloning the paginator shares the
/// loaded records, so a clone can be handed to a scroll subscription.
pub struct Paginator<S: PageSource> {
    source: Arc<S>,
    state: Arc<Mutex<PageState<S::Item>>>,
    notifications: Option<NotificationQueue>,
    label: &'static str,
}

impl<S: PageSource> Clone for Paginator<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: self.state.clone(),
            notifications: self.notifications.clone(),
            label: self.label,
        }
    }
}

impl<S: PageSource> Paginator<S> {
    /// Create an empty paginator over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            state: Arc::new(Mutex::new(PageState::default())),
            notifications: None,
            label: "items",
        }
    }

    /// Report failed loads to `notifications`, naming the records `label`,
    /// e.g. "Could not load more posts".
    pub fn with_notifications(mut self, notifications: NotificationQueue, label: &'static str) -> Self {
        self.notifications = Some(notifications);
        self.label = label;
        self
    }

    /// Fetch the next page and append it.
    ///
    /// Does nothing if a page is already being fetched or the last page has
    /// been loaded. The first call fetches without a cursor.
    ///
    /// On failure the loaded records and cursor are kept, the paginator stops
    /// loading so a later call retries, and the error is returned. The same
    /// holds if the returned future is dropped before it completes.
    pub async fn load(&self) -> Result<LoadOutcome, Error> {
        let cursor = {
            let mut state = self.lock()?;

            if state.loading {
                return Ok(LoadOutcome::InFlight);
            }
            if state.exhausted {
                return Ok(LoadOutcome::Exhausted);
            }

            state.loading = true;
            state.cursor.clone()
        };
        let mut loading = LoadingGuard {
            state: &self.state,
            armed: true,
        };

        tracing::debug!("loading {} after cursor {cursor:?}", self.label);
        let result = self.source.fetch_page(cursor).await;

        let mut state = self.lock()?;
        state.loading = false;
        loading.disarm();

        match result {
            Ok(page) => {
                let loaded = page.items.len();
                let next_cursor = page.next_cursor.filter(|cursor| !cursor.is_empty());
                state.items.extend(page.items);
                state.exhausted = next_cursor.is_none();
                state.cursor = next_cursor;

                if state.exhausted {
                    tracing::debug!("loaded the last page of {}", self.label);
                }

                Ok(LoadOutcome::Loaded(loaded))
            }
            Err(error) => {
                drop(state);
                tracing::error!("could not load {}: {error}", self.label);

                if let Some(notifications) = &self.notifications {
                    notifications.push(error.user_message(&format!("load more {}", self.label)));
                }

                Err(error)
            }
        }
    }

    /// Whether a page is being fetched.
    pub fn is_loading(&self) -> bool {
        self.lock().map(|state| state.loading).unwrap_or(false)
    }

    /// Whether the last page has been loaded.
    pub fn is_exhausted(&self) -> bool {
        self.lock().map(|state| state.exhausted).unwrap_or(false)
    }

    /// The number of records loaded so far.
    pub fn len(&self) -> usize {
        self.lock().map(|state| state.items.len()).unwrap_or(0)
    }

    /// Whether no records have been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, PageState<S::Item>>, Error> {
        self.state.lock().map_err(|error| {
            tracing::error!("could not acquire the {} lock: {error}", self.label);
            Error::LockError
        })
    }
}

impl<S> Paginator<S>
where
    S: PageSource,
    S::Item: Clone,
{
    /// A copy of the current state.
    pub fn state(&self) -> Result<PageState<S::Item>, Error> {
        Ok(self.lock()?.clone())
    }

    /// A copy of the records loaded so far.
    pub fn items(&self) -> Result<Vec<S::Item>, Error> {
        Ok(self.lock()?.items.clone())
    }
}

impl<S: PageSource> LocalState<Vec<S::Item>> for Paginator<S> {
    fn update<R>(&self, f: impl FnOnce(&mut Vec<S::Item>) -> R) -> Result<R, Error> {
        Ok(f(&mut self.lock()?.items))
    }
}
