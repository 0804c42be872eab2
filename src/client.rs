//! The client that ties the local stores to the backend.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    Error,
    api::ApiClient,
    config::ClientConfig,
    id::TEMPORARY_ID_PREFIX,
    notification::NotificationQueue,
    pagination::{FeedSource, Paginator, TripSource},
    profile::UserSummary,
    session::SessionStore,
    storage::LocalStorage,
};

/// The Soon client.
///
/// Holds the session, the notification queue and the backend connection.
/// Cloning the client is cheap and clones share all state.
///
/// The user actions (liking, joining, following, commenting, posting, hosting)
/// are defined next to the records they act on.
#[derive(Debug, Clone)]
pub struct SoonClient {
    pub(crate) config: ClientConfig,
    pub(crate) api: ApiClient,
    pub(crate) session: SessionStore,
    pub(crate) notifications: NotificationQueue,
    temp_ids: Arc<AtomicU64>,
}

impl SoonClient {
    /// Create a client for the backend in `config`, restoring any session
    /// persisted in `storage`.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig, storage: LocalStorage) -> Result<Self, Error> {
        let api = ApiClient::new(&config)?;
        let session = SessionStore::initialize(storage)?;
        let notifications = NotificationQueue::new(config.toast_duration);

        tracing::debug!("created client for {}", config.backend_url);

        Ok(Self {
            config,
            api,
            session,
            notifications,
            temp_ids: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The settings the client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Direct access to the backend.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The log-in session.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The notifications waiting to be shown.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// A fresh, empty view of the post feed.
    pub fn feed(&self) -> Paginator<FeedSource> {
        Paginator::new(FeedSource::new(self.api.clone()))
            .with_notifications(self.notifications.clone(), "posts")
    }

    /// A fresh, empty view of the trip listing.
    pub fn trips(&self) -> Paginator<TripSource> {
        Paginator::new(TripSource::new(self.api.clone()))
            .with_notifications(self.notifications.clone(), "trips")
    }

    /// Show a notification if `result` failed to `action`, then pass it on.
    pub(crate) fn report<T>(&self, result: Result<T, Error>, action: &str) -> Result<T, Error> {
        result.map_err(|error| {
            tracing::warn!("could not {action}: {error}");
            self.notifications.push(error.user_message(action));
            error
        })
    }

    /// A client side ID for a record the backend has not confirmed yet.
    pub(crate) fn next_temporary_id(&self) -> String {
        let n = self.temp_ids.fetch_add(1, Ordering::Relaxed);
        format!("{TEMPORARY_ID_PREFIX}{n}")
    }

    /// The logged in user as the author of a new record.
    pub(crate) fn session_author(&self) -> Result<Option<UserSummary>, Error> {
        Ok(self.session.user()?.map(|user| UserSummary {
            id: Some(user.id),
            username: user.username,
            avatar_url: None,
        }))
    }
}
