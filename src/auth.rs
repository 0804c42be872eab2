/*! This module defines the log-in and sign-up forms and the client actions that start and end a session. */

use serde::Serialize;

use crate::{
    Error,
    client::SoonClient,
    session::{AuthResponse, SessionUser},
};

/// The message shown when the backend rejects a log in or sign up.
const AUTH_FAILED: &str = "Auth failed";

/// Credentials entered during log-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogInForm {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Details entered during sign-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpForm {
    /// Email to log in with.
    pub email: String,
    /// Password to log in with.
    pub password: String,
    /// The public handle.
    pub username: String,
    /// The user's full name, may be empty.
    pub name: String,
}

impl SoonClient {
    /// Log in and persist the session.
    ///
    /// # Errors
    ///
    /// This function will return an error in a few situations.
    /// - The backend rejects the credentials.
    /// - The backend cannot be reached.
    /// - The session cannot be persisted, in which case the client stays
    ///   logged out.
    pub async fn log_in(&self, form: &LogInForm) -> Result<SessionUser, Error> {
        let result = self.api.log_in(form).await;
        self.start_session(result)
    }

    /// Register a new account and persist the session.
    ///
    /// # Errors
    ///
    /// See [SoonClient::log_in].
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SessionUser, Error> {
        let result = self.api.sign_up(form).await;
        self.start_session(result)
    }

    /// End the session and forget the persisted token.
    pub fn log_out(&self) -> Result<(), Error> {
        self.session.logout()
    }

    fn start_session(&self, response: Result<AuthResponse, Error>) -> Result<SessionUser, Error> {
        let user = response.and_then(|response| {
            self.session.login(response)?;
            self.session.user()?.ok_or(Error::MissingLocalRecord)
        });

        match user {
            Ok(user) => Ok(user),
            Err(error @ (Error::Unauthorized | Error::HttpStatus(_))) => {
                tracing::warn!("authentication failed: {error}");
                self.notifications.push(AUTH_FAILED);
                Err(error)
            }
            Err(error) => self.report(Err(error), "sign in"),
        }
    }
}
