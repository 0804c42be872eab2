use crate::test_utils::backend::RecordedRequest;

#[track_caller]
pub(crate) fn assert_no_request_to(requests: &[RecordedRequest], path: &str) {
    let hits: Vec<_> = requests
        .iter()
        .filter(|request| request.path == path)
        .collect();

    assert!(hits.is_empty(), "want no request to {path}, got {hits:?}");
}

#[track_caller]
pub(crate) fn assert_bearer(request: &RecordedRequest, token: &str) {
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {token}").as_str()),
        "request to {} has the wrong authorization header",
        request.path
    );
}
