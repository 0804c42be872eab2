//! Comments on posts.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    client::SoonClient,
    id::{CommentId, PostId},
    optimistic::{LocalState, Optimistic},
    profile::UserSummary,
    scroll::LivenessGuard,
};

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// The comment's ID. Temporary until the backend confirms the comment.
    #[serde(rename = "_id")]
    pub id: CommentId,
    /// What the commenter wrote.
    #[serde(default)]
    pub text: String,
    /// Who wrote the comment.
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// The form for commenting on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    /// What to say.
    pub text: String,
}

impl SoonClient {
    /// Get the comments on a post.
    pub async fn comments(&self, post_id: &PostId) -> Result<Vec<Comment>, Error> {
        let result = self.api.comments(post_id).await;
        self.report(result, "load the comments")
    }

    /// Comment on a post and append the comment to `comments`.
    ///
    /// # Errors
    /// Returns [Error::EmptyComment] without contacting the backend if `text`
    /// is blank.
    pub async fn add_comment(
        &self,
        comments: &impl LocalState<Vec<Comment>>,
        post_id: &PostId,
        text: &str,
        liveness: Option<&LivenessGuard>,
    ) -> Result<Comment, Error> {
        let text = text.trim();
        let temp_id = CommentId::new(self.next_temporary_id());
        let tentative = Comment {
            id: temp_id.clone(),
            text: text.to_owned(),
            user: self.session_author()?,
        };
        let new_comment = NewComment {
            text: text.to_owned(),
        };

        Optimistic {
            sign_in_to: "comment",
            failure: "post the comment",
            apply: |comments: &mut Vec<Comment>| {
                if tentative.text.is_empty() {
                    return Err(Error::EmptyComment);
                }

                comments.push(tentative);
                Ok(())
            },
            request: |token: String| async move {
                self.api.add_comment(&token, post_id, &new_comment).await
            },
            reconcile: |comments: &mut Vec<Comment>, saved: &Comment, ()| {
                if let Some(comment) = comments.iter_mut().find(|comment| comment.id == temp_id) {
                    *comment = saved.clone();
                }
            },
            rollback: |comments: &mut Vec<Comment>, ()| {
                comments.retain(|comment| comment.id != temp_id)
            },
        }
        .run(&self.session, &self.notifications, comments, liveness)
        .await
    }
}
