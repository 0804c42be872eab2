//! The log-in session: who the user is and the bearer token for the backend.
//!
//! The session is persisted to [LocalStorage] under two entries, `token` and
//! `user`, so it survives restarts. Both entries are written and removed
//! together.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::{Error, id::UserId, storage::LocalStorage};

/// Storage key for the raw bearer token.
pub(crate) const TOKEN_KEY: &str = "token";
/// Storage key for the JSON serialized [SessionUser].
pub(crate) const USER_KEY: &str = "user";

/// The identity of the logged in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// The user's id in the backend.
    pub id: UserId,
    /// The user's handle.
    pub username: String,
}

/// The body the backend returns for a successful log in or sign up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The bearer token for authenticated requests.
    pub token: String,
    /// The id of the user that logged in.
    pub user_id: UserId,
    /// The handle of the user that logged in.
    pub username: String,
}

/// The in-memory session.
///
/// `token` is non-empty if and only if `user` is set. Use
/// [Session::unauthenticated] and [Session::from_auth_response] to build
/// sessions that hold this invariant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    token: String,
    user: Option<SessionUser>,
}

impl Session {
    /// The session of a user that has not logged in.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// The session described by a successful log in.
    ///
    /// An empty token yields an unauthenticated session.
    pub fn from_auth_response(response: AuthResponse) -> Self {
        if response.token.is_empty() {
            return Self::unauthenticated();
        }

        Self {
            token: response.token,
            user: Some(SessionUser {
                id: response.user_id,
                username: response.username,
            }),
        }
    }

    /// The bearer token, or `None` when unauthenticated.
    pub fn token(&self) -> Option<&str> {
        self.user.as_ref().map(|_| self.token.as_str())
    }

    /// The logged in user, or `None` when unauthenticated.
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the session and its persisted copy.
///
/// Cloning the store shares the same session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    session: Arc<Mutex<Session>>,
}

impl SessionStore {
    /// Rehydrate the session from `storage`.
    ///
    /// If neither entry is stored the session is unauthenticated. If only one
    /// of the two entries is stored, or the user entry is not valid JSON, the
    /// session is unauthenticated and the leftover entries are removed.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read or cleaned up.
    pub fn initialize(storage: LocalStorage) -> Result<Self, Error> {
        let session = load_session(&storage)?;

        if session.is_authenticated() {
            tracing::info!("restored session from local storage");
        }

        Ok(Self {
            storage,
            session: Arc::new(Mutex::new(session)),
        })
    }

    /// Start a session from a successful log in or sign up response.
    ///
    /// Both storage entries are written in one transaction before the
    /// in-memory session changes, so a storage failure leaves both unchanged.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn login(&self, response: AuthResponse) -> Result<(), Error> {
        let session = Session::from_auth_response(response);
        let Some(user) = session.user() else {
            tracing::warn!("ignoring log in response with an empty token");
            return Err(Error::InvalidResponse("empty session token".to_owned()));
        };
        let user_json = serde_json::to_string(user)?;

        self.storage
            .set_all(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user_json.as_str())])?;

        tracing::info!("logged in as {}", user.username);
        *self.lock()? = session;

        Ok(())
    }

    /// End the session and remove its persisted entries.
    ///
    /// # Errors
    /// Returns an error if the persisted entries cannot be removed, in which
    /// case the in-memory session is left unchanged.
    pub fn logout(&self) -> Result<(), Error> {
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])?;
        *self.lock()? = Session::unauthenticated();

        tracing::info!("logged out");

        Ok(())
    }

    /// A copy of the current session.
    pub fn session(&self) -> Result<Session, Error> {
        Ok(self.lock()?.clone())
    }

    /// The bearer token, or `None` when unauthenticated.
    pub fn token(&self) -> Result<Option<String>, Error> {
        Ok(self.lock()?.token().map(str::to_owned))
    }

    /// The logged in user, or `None` when unauthenticated.
    pub fn user(&self) -> Result<Option<SessionUser>, Error> {
        Ok(self.lock()?.user().cloned())
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.lock()
            .map(|session| session.is_authenticated())
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>, Error> {
        self.session.lock().map_err(|error| {
            tracing::error!("could not acquire the session lock: {error}");
            Error::LockError
        })
    }
}

fn load_session(storage: &LocalStorage) -> Result<Session, Error> {
    let token = storage.get(TOKEN_KEY)?.filter(|token| !token.is_empty());
    let user = storage.get(USER_KEY)?;

    match (token, user) {
        (None, None) => Ok(Session::unauthenticated()),
        (Some(token), Some(user_json)) => match serde_json::from_str::<SessionUser>(&user_json) {
            Ok(user) => Ok(Session {
                token,
                user: Some(user),
            }),
            Err(error) => {
                tracing::warn!("discarding stored user that is not valid JSON: {error}");
                storage.remove_all(&[TOKEN_KEY, USER_KEY])?;
                Ok(Session::unauthenticated())
            }
        },
        _ => {
            tracing::warn!("discarding incomplete session found in local storage");
            storage.remove_all(&[TOKEN_KEY, USER_KEY])?;
            Ok(Session::unauthenticated())
        }
    }
}
