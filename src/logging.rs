//! Logging set-up and helpers for logging backend requests.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use serde_json::Value;

use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Request and response bodies longer than this are truncated at the `debug`
/// level and logged in full at the `trace` level.
pub(crate) const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Install the global tracing subscriber.
///
/// Messages at `info` and above go to stderr, unless `RUST_LOG` says
/// otherwise. Everything at `debug` and above is appended to `log_file`.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn setup_logging(log_file: &Path) -> Result<(), io::Error> {
    let log_file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(debug_log)
        .init();

    Ok(())
}

/// Log an outgoing request with `password` fields redacted.
pub(crate) fn log_request(method: &str, url: &str, body: Option<&str>) {
    let Some(body) = body else {
        tracing::debug!("{method} {url}");
        return;
    };

    let body = redact_password(body, "password");

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!(
            "{method} {url}\nbody: {}...",
            truncate(&body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::trace!("Full request body: {body:?}");
    } else {
        tracing::debug!("{method} {url}\nbody: {body:?}");
    }
}

/// Log a response status and body.
pub(crate) fn log_response(method: &str, url: &str, status: u16, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!(
            "{method} {url} -> {status}\nbody: {}...",
            truncate(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::trace!("Full response body: {body:?}");
    } else {
        tracing::debug!("{method} {url} -> {status}\nbody: {body:?}");
    }
}

/// Replace the value of every JSON field named `field_name` with asterisks.
///
/// Bodies that are not JSON, or have no such field, are returned unchanged.
fn redact_password(json_text: &str, field_name: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<Value>(json_text) else {
        return json_text.to_owned();
    };

    if redact_field(&mut value, field_name) {
        value.to_string()
    } else {
        json_text.to_owned()
    }
}

fn redact_field(value: &mut Value, field_name: &str) -> bool {
    match value {
        Value::Object(fields) => fields.iter_mut().fold(false, |redacted, (key, field)| {
            if key == field_name {
                *field = Value::String(REDACTED.to_owned());
                true
            } else {
                redact_field(field, field_name) | redacted
            }
        }),
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |redacted, item| redact_field(item, field_name) | redacted),
        _ => false,
    }
}

fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}
