//! Optimistic updates: change local state first, confirm with the backend
//! second, and undo the change if the backend says no.
//!
//! Every user action that mutates backend state (like, join, follow, comment,
//! post) runs through [Optimistic::run]:
//!
//! 1. Without a session the action stops and the user is asked to sign in.
//!    No request is made.
//! 2. `apply` makes the tentative change and returns what is needed to undo it.
//! 3. `request` sends the mutation with the bearer token.
//! 4. On success `reconcile` replaces the tentative change with what the
//!    backend reported.
//! 5. On failure `rollback` restores the prior value and the user is notified.
//!
//! Repeated actions on the same record are neither queued nor coalesced, two
//! quick toggles race and the last response to arrive wins locally.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use crate::{
    Error, notification::NotificationQueue, scroll::LivenessGuard, session::SessionStore,
};

/// Shared local state that optimistic updates can be applied to.
pub trait LocalState<S> {
    /// Run `f` with exclusive access to the state.
    ///
    /// # Errors
    /// Returns [Error::LockError] if the state cannot be locked.
    fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, Error>;
}

impl<S> LocalState<S> for Mutex<S> {
    fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, Error> {
        let mut state = self.lock().map_err(|error| {
            tracing::error!("could not acquire the local state lock: {error}");
            Error::LockError
        })?;

        Ok(f(&mut state))
    }
}

impl<S, L: LocalState<S>> LocalState<S> for Arc<L> {
    fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, Error> {
        self.as_ref().update(f)
    }
}

/// The four steps of an optimistic update.
///
/// `Undo` is whatever `apply` needs to hand to `reconcile` or `rollback`,
/// usually the prior value of the fields it changed.
pub struct Optimistic<Apply, Request, Reconcile, Rollback> {
    /// What the user must sign in to do, e.g. "like posts".
    pub sign_in_to: &'static str,
    /// What failed, for the error notification, e.g. "like the post".
    pub failure: &'static str,
    /// Make the tentative change.
    pub apply: Apply,
    /// Send the mutation to the backend. Receives the bearer token.
    pub request: Request,
    /// Adopt the backend's response.
    pub reconcile: Reconcile,
    /// Undo the tentative change.
    pub rollback: Rollback,
}

impl<Apply, Request, Reconcile, Rollback> Optimistic<Apply, Request, Reconcile, Rollback> {
    /// Run the update against `state`.
    ///
    /// If `liveness` is given and the view it belongs to is gone by the time
    /// the backend answers, the response is returned but `state` is left
    /// alone and no notification is shown.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] without a session, the error from
    /// `apply` if the change could not be made, or the request error after
    /// rolling back.
    pub async fn run<S, L, Undo, T, Fut>(
        self,
        session: &SessionStore,
        notifications: &NotificationQueue,
        state: &L,
        liveness: Option<&LivenessGuard>,
    ) -> Result<T, Error>
    where
        L: LocalState<S> + ?Sized,
        Apply: FnOnce(&mut S) -> Result<Undo, Error>,
        Request: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
        Reconcile: FnOnce(&mut S, &T, Undo),
        Rollback: FnOnce(&mut S, Undo),
    {
        let Optimistic {
            sign_in_to,
            failure,
            apply,
            request,
            reconcile,
            rollback,
        } = self;

        let Some(token) = session.token()? else {
            tracing::debug!("blocked unauthenticated attempt to {failure}");
            let error = Error::Unauthenticated(sign_in_to);
            notifications.push(error.user_message(failure));
            return Err(error);
        };

        let undo = match state.update(apply).and_then(|applied| applied) {
            Ok(undo) => undo,
            Err(error) => {
                tracing::warn!("could not {failure}: {error}");
                notifications.push(error.user_message(failure));
                return Err(error);
            }
        };

        let result = request(token).await;

        if liveness.is_some_and(|guard| !guard.is_alive()) {
            tracing::debug!("view closed before the backend answered, dropping result of {failure}");
            return result;
        }

        match result {
            Ok(response) => {
                state.update(|local| reconcile(local, &response, undo))?;
                Ok(response)
            }
            Err(error) => {
                tracing::warn!("could not {failure}, rolling back: {error}");
                state.update(|local| rollback(local, undo))?;
                notifications.push(error.user_message(failure));
                Err(error)
            }
        }
    }
}
