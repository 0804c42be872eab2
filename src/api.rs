//! A thin typed client for the Soon REST backend.
//!
//! The client is stateless: it knows the backend URL and nothing about the
//! session. Callers pass the bearer token to the calls that need one.

use reqwest::{Method, StatusCode, Url, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error,
    auth::{LogInForm, SignUpForm},
    comment::{Comment, NewComment},
    config::ClientConfig,
    endpoints::{self, endpoint_segments},
    id::{PostId, TripId, UserId},
    logging::{log_request, log_response},
    pagination::Page,
    post::{LikeResponse, NewPost, Post},
    profile::Profile,
    session::AuthResponse,
    trip::{JoinResponse, NewTrip, Trip, UserTrips},
};

/// Query parameter carrying the pagination cursor.
const CURSOR_PARAM: &str = "cursor";

/// HTTP access to the backend.
///
/// Cloning the client is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

/// The parts of a request that vary between endpoints.
struct ApiRequest<'a> {
    method: Method,
    path: &'static str,
    id: Option<&'a str>,
    cursor: Option<&'a str>,
    token: Option<&'a str>,
    body: Option<String>,
}

impl<'a> ApiRequest<'a> {
    fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            id: None,
            cursor: None,
            token: None,
            body: None,
        }
    }

    /// Fill the path parameter with `id`.
    fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    fn cursor(mut self, cursor: Option<&'a str>) -> Self {
        self.cursor = cursor;
        self
    }

    fn token(mut self, token: Option<&'a str>) -> Self {
        self.token = token;
        self
    }

    fn json<B: Serialize>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }
}

impl ApiClient {
    /// Create a client for the backend in `config`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidBackendUrl] if the backend URL cannot have
    /// paths appended to it, or an [Error::Network] if the HTTP client cannot
    /// be built, e.g. when no TLS backend is available.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = match Url::parse(&config.backend_url) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => return Err(Error::InvalidBackendUrl(config.backend_url.clone())),
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// The backend URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Log in with an email and password.
    pub async fn log_in(&self, form: &LogInForm) -> Result<AuthResponse, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::LOG_IN).json(form)?;
        self.fetch(request).await
    }

    /// Register a new account, which also logs the user in.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthResponse, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::SIGN_UP).json(form)?;
        self.fetch(request).await
    }

    /// Get the page of the feed that starts at `cursor`, or the first page.
    pub async fn feed_page(&self, cursor: Option<&str>) -> Result<Page<Post>, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::FEED).cursor(cursor);
        self.fetch(request).await
    }

    /// Share a new post.
    pub async fn create_post(&self, token: &str, post: &NewPost) -> Result<Post, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::POSTS)
            .token(Some(token))
            .json(post)?;
        self.fetch(request).await
    }

    /// Like the post, or remove the like if the user already likes it.
    pub async fn toggle_like(&self, token: &str, post_id: &PostId) -> Result<LikeResponse, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::POST_LIKE)
            .id(post_id.as_str())
            .token(Some(token));
        self.fetch(request).await
    }

    /// Get a single post.
    pub async fn post(&self, post_id: &PostId) -> Result<Post, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::POST).id(post_id.as_str());
        self.fetch(request).await
    }

    /// Get the comments on a post.
    pub async fn comments(&self, post_id: &PostId) -> Result<Vec<Comment>, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::POST_COMMENTS).id(post_id.as_str());
        self.fetch(request).await
    }

    /// Comment on a post.
    pub async fn add_comment(
        &self,
        token: &str,
        post_id: &PostId,
        comment: &NewComment,
    ) -> Result<Comment, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::POST_COMMENTS)
            .id(post_id.as_str())
            .token(Some(token))
            .json(comment)?;
        self.fetch(request).await
    }

    /// Host a new trip.
    pub async fn create_trip(&self, token: &str, trip: &NewTrip) -> Result<Trip, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::TRIPS)
            .token(Some(token))
            .json(trip)?;
        self.fetch(request).await
    }

    /// Get the page of trips that starts at `cursor`, or the first page.
    pub async fn trips_page(&self, cursor: Option<&str>) -> Result<Page<Trip>, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::TRIPS).cursor(cursor);
        self.fetch(request).await
    }

    /// Get a single trip.
    pub async fn trip(&self, trip_id: &TripId) -> Result<Trip, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::TRIP).id(trip_id.as_str());
        self.fetch(request).await
    }

    /// Ask to join a trip. Full trips put the user on the waitlist.
    pub async fn join_trip(&self, token: &str, trip_id: &TripId) -> Result<JoinResponse, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::TRIP_JOIN)
            .id(trip_id.as_str())
            .token(Some(token));
        self.fetch(request).await
    }

    /// Get a user's profile.
    ///
    /// With a `token` the profile says whether the logged in user follows them.
    pub async fn profile(&self, token: Option<&str>, user_id: &UserId) -> Result<Profile, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::USER)
            .id(user_id.as_str())
            .token(token);
        self.fetch(request).await
    }

    /// Get the posts a user shared.
    pub async fn user_posts(&self, user_id: &UserId) -> Result<Vec<Post>, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::USER_POSTS).id(user_id.as_str());
        self.fetch(request).await
    }

    /// Get the trips a user hosts and the trips they joined.
    pub async fn user_trips(&self, user_id: &UserId) -> Result<UserTrips, Error> {
        let request = ApiRequest::new(Method::GET, endpoints::USER_TRIPS).id(user_id.as_str());
        self.fetch(request).await
    }

    /// Follow a user.
    pub async fn follow(&self, token: &str, user_id: &UserId) -> Result<(), Error> {
        let request = ApiRequest::new(Method::POST, endpoints::FOLLOW)
            .id(user_id.as_str())
            .token(Some(token));
        self.send(request).await.map(|_| ())
    }

    /// Stop following a user.
    pub async fn unfollow(&self, token: &str, user_id: &UserId) -> Result<(), Error> {
        let request = ApiRequest::new(Method::DELETE, endpoints::FOLLOW)
            .id(user_id.as_str())
            .token(Some(token));
        self.send(request).await.map(|_| ())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest<'_>) -> Result<T, Error> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|error| {
            tracing::error!("could not parse backend response: {error}");
            Error::InvalidResponse(error.to_string())
        })
    }

    /// Send `request` and return the body of a successful response.
    async fn send(&self, request: ApiRequest<'_>) -> Result<String, Error> {
        let url = self.url_for(&request)?;
        log_request(request.method.as_str(), url.as_str(), request.body.as_deref());

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if let Some(cursor) = request.cursor {
            builder = builder.query(&[(CURSOR_PARAM, cursor)]);
        }
        if let Some(token) = request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(|error| {
            tracing::warn!("{} {url} failed: {error}", request.method);
            Error::from(error)
        })?;
        let status = response.status();
        let body = response.text().await?;
        log_response(request.method.as_str(), url.as_str(), status.as_u16(), &body);

        match status {
            status if status.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => {
                tracing::warn!("{} {url} responded with {status}", request.method);
                Err(Error::HttpStatus(status.as_u16()))
            }
        }
    }

    /// The backend URL plus the request's path, with the id percent-encoded
    /// as a single segment.
    fn url_for(&self, request: &ApiRequest<'_>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBackendUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(endpoint_segments(request.path, request.id.unwrap_or_default()));

        Ok(url)
    }
}

#[cfg(test)]
mod api_client_tests {
    use crate::{
        Error,
        api::ApiClient,
        config::ClientConfig,
        auth::LogInForm,
        id::{PostId, TripId, UserId},
        test_utils::{FakeBackend, fake_posts},
        trip::JoinStatus,
    };

    #[tokio::test]
    async fn first_feed_page_omits_cursor() {
        let backend = FakeBackend::start().await;
        backend.set_feed_page(None, fake_posts(0..3), Some("c1"));

        let page = backend.api().feed_page(None).await.unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/feed");
        assert_eq!(requests[0].query, None);
    }

    #[tokio::test]
    async fn later_feed_page_sends_cursor() {
        let backend = FakeBackend::start().await;
        backend.set_feed_page(Some("c1"), fake_posts(3..5), None);

        let page = backend.api().feed_page(Some("c1")).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_cursor, None);
        assert_eq!(backend.requests()[0].query.as_deref(), Some("cursor=c1"));
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let backend = FakeBackend::start().await;

        backend
            .api()
            .toggle_like("tok-1", &PostId::new("p1"))
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/posts/p1/like");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn ids_are_percent_encoded_in_the_path() {
        let backend = FakeBackend::start().await;

        backend
            .api()
            .toggle_like("tok-1", &PostId::new("a/b?c#d"))
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].path, "/posts/a%2Fb%3Fc%23d/like");
        assert_eq!(requests[0].query, None);
    }

    #[test]
    fn backend_url_must_be_a_base() {
        let config = ClientConfig::default().with_backend_url("mailto:soon@example.com");

        let result = ApiClient::new(&config);

        assert!(matches!(result, Err(Error::InvalidBackendUrl(_))));
    }

    #[tokio::test]
    async fn anonymous_requests_have_no_authorization_header() {
        let backend = FakeBackend::start().await;

        backend.api().trip(&TripId::new("t1")).await.unwrap();

        assert_eq!(backend.requests()[0].authorization, None);
    }

    #[tokio::test]
    async fn log_in_returns_session_details() {
        let backend = FakeBackend::start().await;
        let form = LogInForm {
            email: "wanderer@soon.travel".to_owned(),
            password: "hunter2".to_owned(),
        };

        let response = backend.api().log_in(&form).await.unwrap();

        assert_eq!(response.user_id, UserId::new("u1"));
        assert_eq!(response.username, "wanderer");
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let backend = FakeBackend::start().await;
        let form = LogInForm {
            email: "wanderer@soon.travel".to_owned(),
            password: "wrong".to_owned(),
        };

        let result = backend.api().log_in(&form).await;

        assert_eq!(result, Err(Error::Unauthorized));
    }

    #[tokio::test]
    async fn server_error_maps_to_http_status() {
        let backend = FakeBackend::start().await;
        backend.fail_path("/posts/p1/like");

        let result = backend.api().toggle_like("tok-1", &PostId::new("p1")).await;

        assert_eq!(result, Err(Error::HttpStatus(500)));
    }

    #[tokio::test]
    async fn join_status_is_parsed() {
        let backend = FakeBackend::start().await;
        backend.set_join_status("waitlisted");

        let response = backend
            .api()
            .join_trip("tok-1", &TripId::new("t1"))
            .await
            .unwrap();

        assert_eq!(response.status, JoinStatus::Waitlisted);
    }

    #[tokio::test]
    async fn unfollow_uses_delete() {
        let backend = FakeBackend::start().await;

        backend
            .api()
            .unfollow("tok-1", &UserId::new("u2"))
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].path, "/follow/u2");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let api = crate::test_utils::unreachable_api().await;

        let result = api.post(&PostId::new("p1")).await;

        assert!(matches!(result, Err(Error::Network(_))), "got {result:?}");
    }
}
