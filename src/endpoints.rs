//! The backend endpoint paths.
//!
//! For endpoints that take a parameter, e.g., '/posts/{post_id}/like', use [endpoint_segments].

/// Log in with an email and password.
pub const LOG_IN: &str = "/auth/login";
/// Register a new user.
pub const SIGN_UP: &str = "/auth/signup";
/// The cursor paginated feed of posts.
pub const FEED: &str = "/feed";
/// Create a post.
pub const POSTS: &str = "/posts";
/// Get a single post.
pub const POST: &str = "/posts/{post_id}";
/// Toggle the like on a post.
pub const POST_LIKE: &str = "/posts/{post_id}/like";
/// List or add comments on a post.
pub const POST_COMMENTS: &str = "/posts/{post_id}/comments";
/// List (cursor paginated) or create trips.
pub const TRIPS: &str = "/trips";
/// Get a single trip.
pub const TRIP: &str = "/trips/{trip_id}";
/// Join a trip.
pub const TRIP_JOIN: &str = "/trips/{trip_id}/join";
/// A user's profile.
pub const USER: &str = "/users/{user_id}";
/// The posts of a user.
pub const USER_POSTS: &str = "/users/{user_id}/posts";
/// The trips a user hosts or joined.
pub const USER_TRIPS: &str = "/users/{user_id}/trips";
/// Follow (POST) or unfollow (DELETE) a user.
pub const FOLLOW: &str = "/follow/{user_id}";

/// The path segments of `endpoint_path`, with the parameter segment
/// replaced by `id`.
///
/// A parameter is a whole segment wrapped in braces, e.g. `{post_id}`. The
/// segments are not escaped here, the caller percent-encodes them when it
/// appends them to a URL.
pub fn endpoint_segments<'a>(endpoint_path: &'a str, id: &'a str) -> impl Iterator<Item = &'a str> {
    endpoint_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(move |segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                id
            } else {
                segment
            }
        })
}
