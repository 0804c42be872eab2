//! Travel posts: sharing, liking and reading them.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    client::SoonClient,
    id::PostId,
    optimistic::{LocalState, Optimistic},
    profile::UserSummary,
    scroll::LivenessGuard,
};

/// A travel post in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// The post's ID.
    #[serde(rename = "_id")]
    pub id: PostId,
    /// Who shared the post.
    #[serde(default)]
    pub user: Option<UserSummary>,
    /// Links to the post's photos.
    #[serde(default)]
    pub images: Vec<String>,
    /// The text under the photos.
    #[serde(default)]
    pub caption: Option<String>,
    /// Where the photos were taken.
    #[serde(default)]
    pub location: Option<String>,
    /// How many users like the post.
    #[serde(default)]
    pub likes: u64,
    /// Whether the logged in user likes the post.
    #[serde(default)]
    pub liked: bool,
    /// How many comments the post has.
    #[serde(default)]
    pub comments_count: u64,
}

/// The form for sharing a post.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewPost {
    /// The text under the photos.
    pub caption: Option<String>,
    /// Links to the photos.
    pub images: Vec<String>,
    /// Where the photos were taken.
    pub location: Option<String>,
}

/// The backend's answer to a like toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeResponse {
    /// The number of likes after the toggle.
    pub count: u64,
    /// Whether the logged in user now likes the post, if the backend says.
    #[serde(default)]
    pub liked: Option<bool>,
}

fn find_post<'a>(posts: &'a mut [Post], post_id: &PostId) -> Option<&'a mut Post> {
    posts.iter_mut().find(|post| post.id == *post_id)
}

impl SoonClient {
    /// Get a single post.
    pub async fn post(&self, post_id: &PostId) -> Result<Post, Error> {
        let result = self.api.post(post_id).await;
        self.report(result, "load the post")
    }

    /// Like a post in `posts`, or remove the like.
    ///
    /// The like count moves by one straight away and is replaced by the
    /// backend's count once it answers.
    ///
    /// # Errors
    /// Returns [Error::MissingLocalRecord] if `post_id` is not in `posts`.
    pub async fn toggle_like(
        &self,
        posts: &impl LocalState<Vec<Post>>,
        post_id: &PostId,
        liveness: Option<&LivenessGuard>,
    ) -> Result<LikeResponse, Error> {
        Optimistic {
            sign_in_to: "like posts",
            failure: "like the post",
            apply: |posts: &mut Vec<Post>| -> Result<(u64, bool), Error> {
                let post = find_post(posts, post_id).ok_or(Error::MissingLocalRecord)?;
                let prior = (post.likes, post.liked);

                post.liked = !post.liked;
                post.likes = if post.liked {
                    post.likes + 1
                } else {
                    post.likes.saturating_sub(1)
                };

                Ok(prior)
            },
            request: |token: String| async move { self.api.toggle_like(&token, post_id).await },
            reconcile: |posts: &mut Vec<Post>, response: &LikeResponse, _prior: (u64, bool)| {
                if let Some(post) = find_post(posts, post_id) {
                    post.likes = response.count;
                    if let Some(liked) = response.liked {
                        post.liked = liked;
                    }
                }
            },
            rollback: |posts: &mut Vec<Post>, (likes, liked): (u64, bool)| {
                if let Some(post) = find_post(posts, post_id) {
                    post.likes = likes;
                    post.liked = liked;
                }
            },
        }
        .run(&self.session, &self.notifications, posts, liveness)
        .await
    }

    /// Share a post and put it at the top of `posts`.
    ///
    /// The post shows up under a temporary ID until the backend assigns the
    /// real one, and is removed again if the backend rejects it.
    pub async fn create_post(
        &self,
        posts: &impl LocalState<Vec<Post>>,
        new_post: NewPost,
        liveness: Option<&LivenessGuard>,
    ) -> Result<Post, Error> {
        let temp_id = PostId::new(self.next_temporary_id());
        let tentative = Post {
            id: temp_id.clone(),
            user: self.session_author()?,
            images: new_post.images.clone(),
            caption: new_post.caption.clone(),
            location: new_post.location.clone(),
            likes: 0,
            liked: false,
            comments_count: 0,
        };

        Optimistic {
            sign_in_to: "share posts",
            failure: "share the post",
            apply: |posts: &mut Vec<Post>| {
                posts.insert(0, tentative);
                Ok(())
            },
            request: |token: String| async move { self.api.create_post(&token, &new_post).await },
            reconcile: |posts: &mut Vec<Post>, saved: &Post, ()| {
                if let Some(post) = find_post(posts, &temp_id) {
                    *post = saved.clone();
                }
            },
            rollback: |posts: &mut Vec<Post>, ()| posts.retain(|post| post.id != temp_id),
        }
        .run(&self.session, &self.notifications, posts, liveness)
        .await
    }
}
