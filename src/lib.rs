//! Soon is a social travel-sharing app: an infinite feed of travel posts,
//! community hosted trips, follows and comments.
//!
//! This library is the client side of Soon. It owns the local state the
//! backend does not: the persisted log-in session, short lived notifications,
//! cursor paginated lists and optimistic updates that are rolled back when
//! the backend rejects them. All business rules live in the backend, which is
//! reached through [ApiClient].

#![warn(missing_docs)]

mod api;
mod auth;
mod client;
mod comment;
mod config;
mod endpoints;
mod id;
mod logging;
mod notification;
mod optimistic;
mod pagination;
mod post;
mod profile;
mod scroll;
mod session;
mod storage;
mod trip;

#[cfg(test)]
mod test_utils;

pub use api::ApiClient;
pub use auth::{LogInForm, SignUpForm};
pub use client::SoonClient;
pub use comment::{Comment, NewComment};
pub use config::{
    BACKEND_URL_ENV, ClientConfig, DEFAULT_BACKEND_URL, DEFAULT_SCROLL_THRESHOLD,
    DEFAULT_TOAST_DURATION,
};
pub use id::{CommentId, PostId, TripId, UserId};
pub use logging::setup_logging;
pub use notification::{NotificationQueue, Toast, ToastId};
pub use optimistic::{LocalState, Optimistic};
pub use pagination::{FeedSource, LoadOutcome, Page, PageSource, PageState, Paginator, TripSource};
pub use post::{LikeResponse, NewPost, Post};
pub use profile::{Profile, ProfileUser, UserSummary};
pub use scroll::{LivenessGuard, ScrollSubscription, ViewLifetime, Viewport};
pub use session::{AuthResponse, Session, SessionStore, SessionUser};
pub use storage::LocalStorage;
pub use trip::{JoinResponse, JoinStatus, NewTrip, Trip, TripDraft, UserTrips};

/// The errors that may occur in the client.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user tried an action that needs a session without logging in.
    ///
    /// The string describes the action, e.g. "like posts", and is used to
    /// build the "Sign in to ..." notification.
    #[error("sign in to {0}")]
    Unauthenticated(&'static str),

    /// The backend rejected the bearer token.
    ///
    /// The session is left untouched, it is up to the caller to ask the user
    /// to log in again.
    #[error("the backend rejected the session token")]
    Unauthorized,

    /// The backend could not find the requested resource.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The backend answered with a non-success status not covered above.
    #[error("the backend responded with status {0}")]
    HttpStatus(u16),

    /// The request never got a response, e.g. the backend is unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not have the expected shape.
    #[error("invalid response from the backend: {0}")]
    InvalidResponse(String),

    /// An unhandled/unexpected SQL error from the local storage.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing or deserializing local state.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire a lock on shared client state.
    #[error("could not acquire the state lock")]
    LockError,

    /// An optimistic update targeted a record that is not in local state.
    #[error("the record is not in the local state")]
    MissingLocalRecord,

    /// The host-a-trip form has an invalid field.
    #[error("invalid trip: {0}")]
    InvalidDraft(String),

    /// The configured backend URL is not an http(s) URL paths can be added to.
    #[error("invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    /// Tried to post a comment with no text.
    #[error("comment cannot be empty")]
    EmptyComment,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Error::InvalidResponse(value.to_string())
        } else {
            Error::Network(value.to_string())
        }
    }
}

impl Error {
    /// The message to show the user when `action` failed with this error.
    ///
    /// `action` reads as the object of "Could not ...", e.g. "like the post".
    pub fn user_message(&self, action: &str) -> String {
        match self {
            Error::Unauthenticated(what) => format!("Sign in to {what}"),
            Error::Unauthorized => "Your session has expired, please sign in again".to_owned(),
            Error::NotFound => format!("Could not {action}: it no longer exists"),
            Error::Network(_) => format!("Could not {action}: check your connection"),
            Error::InvalidDraft(reason) => format!("Could not {action}: {reason}"),
            Error::EmptyComment => "Comment cannot be empty".to_owned(),
            _ => format!("Could not {action}, please try again"),
        }
    }
}
