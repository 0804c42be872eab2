#![allow(missing_docs)]

pub(crate) mod backend;
pub(crate) mod http;
pub(crate) mod logs;

pub(crate) use backend::{
    FakeBackend, TEST_PASSWORD, TEST_TOKEN, fake_posts, fake_trips, unreachable_api,
};
pub(crate) use http::{assert_bearer, assert_no_request_to};
pub(crate) use logs::record_log_messages;
