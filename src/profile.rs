//! User profiles and follows.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    client::SoonClient,
    id::UserId,
    optimistic::{LocalState, Optimistic},
    post::Post,
    scroll::LivenessGuard,
    trip::UserTrips,
};

/// The author of a post or comment, or the host of a trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserSummary {
    /// The user's ID. Older records may not carry one.
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<UserId>,
    /// The user's handle.
    #[serde(default)]
    pub username: String,
    /// Link to the user's avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A user's profile as seen by the logged in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Who the profile belongs to.
    pub user: ProfileUser,
    /// Whether the logged in user follows them. Always false without a session.
    #[serde(default)]
    pub is_following: bool,
}

/// The public details of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUser {
    /// The user's ID.
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    /// The user's handle.
    pub username: String,
    /// The user's full name.
    #[serde(default)]
    pub name: Option<String>,
    /// A short description the user wrote about themselves.
    #[serde(default)]
    pub bio: Option<String>,
    /// Link to the user's avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileUser {
    /// The name to show, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

impl SoonClient {
    /// Get a user's profile.
    ///
    /// The session token is sent when there is one so that
    /// [Profile::is_following] is filled in.
    pub async fn profile(&self, user_id: &UserId) -> Result<Profile, Error> {
        let token = self.session.token()?;
        let result = self.api.profile(token.as_deref(), user_id).await;

        self.report(result, "load the profile")
    }

    /// Get the posts a user shared.
    pub async fn user_posts(&self, user_id: &UserId) -> Result<Vec<Post>, Error> {
        let result = self.api.user_posts(user_id).await;
        self.report(result, "load the posts")
    }

    /// Get the trips a user hosts and has joined.
    pub async fn user_trips(&self, user_id: &UserId) -> Result<UserTrips, Error> {
        let result = self.api.user_trips(user_id).await;
        self.report(result, "load the trips")
    }

    /// Whether `profile` belongs to the logged in user, who cannot follow
    /// themselves.
    pub fn is_own_profile(&self, profile: &Profile) -> bool {
        matches!(
            self.session.user(),
            Ok(Some(user)) if user.id == profile.user.id
        )
    }

    /// Follow the user behind `profile`, or unfollow them if the logged in
    /// user already follows them.
    ///
    /// `is_following` flips straight away and flips back if the backend
    /// rejects the change.
    pub async fn toggle_follow(
        &self,
        profile: &impl LocalState<Profile>,
        liveness: Option<&LivenessGuard>,
    ) -> Result<(), Error> {
        let (user_id, was_following) =
            profile.update(|profile: &mut Profile| (profile.user.id.clone(), profile.is_following))?;

        Optimistic {
            sign_in_to: "follow users",
            failure: if was_following {
                "unfollow the user"
            } else {
                "follow the user"
            },
            apply: |profile: &mut Profile| {
                let prior = profile.is_following;
                profile.is_following = !prior;
                Ok(prior)
            },
            request: |token: String| async move {
                if was_following {
                    self.api.unfollow(&token, &user_id).await
                } else {
                    self.api.follow(&token, &user_id).await
                }
            },
            reconcile: |_: &mut Profile, _: &(), _: bool| {},
            rollback: |profile: &mut Profile, prior: bool| profile.is_following = prior,
        }
        .run(&self.session, &self.notifications, profile, liveness)
        .await
    }
}
