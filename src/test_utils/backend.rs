//! An in-process stand-in for the Soon backend.
//!
//! Serves canned responses on an ephemeral port and records every request so
//! tests can assert on what the client sent, and on what it did not send.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Notify};

use crate::{
    api::ApiClient, client::SoonClient, config::ClientConfig, id::UserId, session::AuthResponse,
    storage::LocalStorage,
};

/// The password the fake backend accepts.
pub(crate) const TEST_PASSWORD: &str = "hunter2";
/// The token the fake backend hands out.
pub(crate) const TEST_TOKEN: &str = "tok-1";

/// A request as the fake backend received it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug)]
struct BackendState {
    requests: Vec<RecordedRequest>,
    failing_paths: Vec<String>,
    feed_pages: HashMap<String, Value>,
    trip_pages: HashMap<String, Value>,
    like_response: Value,
    join_status: String,
    is_following: bool,
    comments: Vec<Value>,
    next_id: u32,
    hold: Option<Arc<Notify>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            failing_paths: Vec::new(),
            feed_pages: HashMap::new(),
            trip_pages: HashMap::new(),
            like_response: json!({ "count": 1, "liked": true }),
            join_status: "joined".to_owned(),
            is_following: false,
            comments: Vec::new(),
            next_id: 1,
            hold: None,
        }
    }
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }
}

type SharedState = Arc<Mutex<BackendState>>;

/// A running fake backend. The server stops when the test's runtime shuts down.
pub(crate) struct FakeBackend {
    url: String,
    state: SharedState,
}

impl FakeBackend {
    pub(crate) async fn start() -> Self {
        let state = SharedState::default();
        let router = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Could not bind fake backend");
        let address = listener.local_addr().expect("Could not get fake backend address");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Fake backend stopped unexpectedly");
        });

        Self {
            url: format!("http://{address}"),
            state,
        }
    }

    pub(crate) fn config(&self) -> ClientConfig {
        ClientConfig::default().with_backend_url(&self.url)
    }

    pub(crate) fn api(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("Could not create API client")
    }

    /// A client with an empty in-memory storage, i.e. logged out.
    pub(crate) fn client(&self) -> SoonClient {
        let storage = LocalStorage::open_in_memory().expect("Could not create local storage");
        SoonClient::new(self.config(), storage).expect("Could not create client")
    }

    /// A client logged in as "wanderer" without going through the backend.
    pub(crate) fn logged_in_client(&self) -> SoonClient {
        let client = self.client();
        client
            .session()
            .login(AuthResponse {
                token: TEST_TOKEN.to_owned(),
                user_id: UserId::new("u1"),
                username: "wanderer".to_owned(),
            })
            .expect("Could not log in");
        client
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Answer every request to `path` with 500.
    pub(crate) fn fail_path(&self, path: &str) {
        self.lock().failing_paths.push(path.to_owned());
    }

    pub(crate) fn set_feed_page(&self, cursor: Option<&str>, items: Vec<Value>, next: Option<&str>) {
        self.lock().feed_pages.insert(
            cursor.unwrap_or_default().to_owned(),
            json!({ "items": items, "nextCursor": next }),
        );
    }

    pub(crate) fn set_trip_page(&self, cursor: Option<&str>, items: Vec<Value>, next: Option<&str>) {
        self.lock().trip_pages.insert(
            cursor.unwrap_or_default().to_owned(),
            json!({ "items": items, "nextCursor": next }),
        );
    }

    pub(crate) fn set_like_response(&self, count: u64, liked: bool) {
        self.lock().like_response = json!({ "count": count, "liked": liked });
    }

    pub(crate) fn set_join_status(&self, status: &str) {
        self.lock().join_status = status.to_owned();
    }

    pub(crate) fn set_following(&self, is_following: bool) {
        self.lock().is_following = is_following;
    }

    /// Hold every response after its request is recorded until the returned
    /// gate is notified, once per request.
    pub(crate) fn hold_responses(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().hold = Some(gate.clone());
        gate
    }

    pub(crate) fn is_following(&self) -> bool {
        self.lock().is_following
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().expect("Could not lock fake backend state")
    }
}

/// An API client pointed at a port nothing listens on.
pub(crate) async fn unreachable_api() -> ApiClient {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind a free port");
    let address = listener.local_addr().expect("Could not get address");
    drop(listener);

    ApiClient::new(&ClientConfig::default().with_backend_url(&format!("http://{address}")))
        .expect("Could not create API client")
}

/// Posts with ids `p<i>` for every `i` in `ids`.
pub(crate) fn fake_posts(ids: std::ops::Range<u32>) -> Vec<Value> {
    ids.map(|i| {
        json!({
            "_id": format!("p{i}"),
            "user": { "_id": "u2", "username": "nomad" },
            "images": [format!("https://img.soon.travel/{i}.jpg")],
            "caption": format!("Day {i} on the road"),
            "location": "Lisbon",
            "likes": i,
            "comments_count": 0
        })
    })
    .collect()
}

/// Trips with ids `t<i>` for every `i` in `ids`.
pub(crate) fn fake_trips(ids: std::ops::Range<u32>) -> Vec<Value> {
    ids.map(|i| fake_trip(&format!("t{i}"))).collect()
}

fn fake_trip(id: &str) -> Value {
    json!({
        "_id": id,
        "title": "Hiking the Dolomites",
        "location": "Cortina d'Ampezzo",
        "description": "Five days hut to hut.",
        "start_date": "2025-07-01T00:00:00Z",
        "end_date": "2025-07-05T00:00:00Z",
        "capacity": 8,
        "host": { "_id": "u2", "username": "nomad" },
        "is_joined": false,
        "joined_count": 3
    })
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/auth/login", post(log_in))
        .route("/auth/signup", post(sign_up))
        .route("/feed", get(feed))
        .route("/posts", post(create_post))
        .route("/posts/{post_id}", get(get_post))
        .route("/posts/{post_id}/like", post(like))
        .route("/posts/{post_id}/comments", get(get_comments).post(add_comment))
        .route("/trips", get(trips).post(create_trip))
        .route("/trips/{trip_id}", get(get_trip))
        .route("/trips/{trip_id}/join", post(join_trip))
        .route("/users/{user_id}", get(get_profile))
        .route("/users/{user_id}/posts", get(get_user_posts))
        .route("/users/{user_id}/trips", get(get_user_trips))
        .route("/follow/{user_id}", post(follow).delete(unfollow))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

async fn record_request(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(str::to_owned),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    };

    let (should_fail, hold) = {
        let mut state = state.lock().expect("Could not lock fake backend state");
        let should_fail = state.failing_paths.contains(&recorded.path);
        state.requests.push(recorded);
        (should_fail, state.hold.clone())
    };

    if let Some(gate) = hold {
        gate.notified().await;
    }

    if should_fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    next.run(request).await
}

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, BackendState> {
    state.lock().expect("Could not lock fake backend state")
}

fn session_json(username: &str) -> Value {
    json!({ "token": TEST_TOKEN, "user_id": "u1", "username": username })
}

async fn log_in(Json(body): Json<Value>) -> Response {
    if body["password"] == TEST_PASSWORD {
        Json(session_json("wanderer")).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn sign_up(Json(body): Json<Value>) -> Response {
    match body["username"].as_str() {
        Some(username) if !username.is_empty() => Json(session_json(username)).into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn page_for(pages: &HashMap<String, Value>, params: &HashMap<String, String>) -> Value {
    let cursor = params.get("cursor").cloned().unwrap_or_default();

    pages
        .get(&cursor)
        .cloned()
        .unwrap_or_else(|| json!({ "items": [], "nextCursor": null }))
}

async fn feed(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(page_for(&lock(&state).feed_pages, &params))
}

async fn trips(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(page_for(&lock(&state).trip_pages, &params))
}

async fn create_post(State(state): State<SharedState>, Json(body): Json<Value>) -> Json<Value> {
    let id = lock(&state).next_id("post");

    Json(json!({
        "_id": id,
        "user": { "_id": "u1", "username": "wanderer" },
        "caption": body["caption"],
        "images": body["images"],
        "location": body["location"],
        "likes": 0,
        "comments_count": 0
    }))
}

async fn get_post(Path(post_id): Path<String>) -> Response {
    if post_id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut post = fake_posts(0..1).remove(0);
    post["_id"] = json!(post_id);
    Json(post).into_response()
}

async fn like(State(state): State<SharedState>) -> Json<Value> {
    Json(lock(&state).like_response.clone())
}

async fn get_comments(State(state): State<SharedState>) -> Json<Value> {
    Json(json!(lock(&state).comments.clone()))
}

async fn add_comment(State(state): State<SharedState>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = lock(&state);
    let id = state.next_id("c");
    let comment = json!({
        "_id": id,
        "text": body["text"],
        "user": { "_id": "u1", "username": "wanderer" }
    });
    state.comments.push(comment.clone());

    Json(comment)
}

async fn create_trip(State(state): State<SharedState>, Json(mut body): Json<Value>) -> Json<Value> {
    body["_id"] = json!(lock(&state).next_id("trip"));
    body["host"] = json!({ "_id": "u1", "username": "wanderer" });
    body["joined_count"] = json!(0);

    Json(body)
}

async fn get_trip(Path(trip_id): Path<String>) -> Json<Value> {
    Json(fake_trip(&trip_id))
}

async fn join_trip(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "status": lock(&state).join_status }))
}

async fn get_profile(State(state): State<SharedState>, Path(user_id): Path<String>) -> Json<Value> {
    Json(json!({
        "user": {
            "_id": user_id,
            "username": "nomad",
            "name": "Nora Nomad",
            "bio": "Always somewhere else."
        },
        "is_following": lock(&state).is_following
    }))
}

async fn get_user_posts() -> Json<Value> {
    Json(json!(fake_posts(0..2)))
}

async fn get_user_trips() -> Json<Value> {
    Json(json!({ "hosted": fake_trips(0..1), "joined": fake_trips(1..3) }))
}

async fn follow(State(state): State<SharedState>) -> StatusCode {
    lock(&state).is_following = true;
    StatusCode::NO_CONTENT
}

async fn unfollow(State(state): State<SharedState>) -> StatusCode {
    lock(&state).is_following = false;
    StatusCode::NO_CONTENT
}
