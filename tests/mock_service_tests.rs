//! Trigger and random-key writes against a mock key-value service

use longpoll_bench::{
    client::{HttpRequest, ReqwestTransport, RetryPolicy, Transport},
    executor::{issue_trigger, Orchestrator, RunOptions},
    logging::{Logger, NetworkLogger, TrialLogger},
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(base: &str, connection_count: usize) -> Orchestrator {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::with_defaults().unwrap());
    let options = RunOptions {
        target: Url::parse(&format!("{}/v2/keys/name", base)).unwrap(),
        connection_count,
        trigger_value: "jex".to_string(),
        retry: RetryPolicy::fixed(Duration::from_millis(10)),
        read_retry: RetryPolicy::fixed(Duration::from_millis(10)),
        timeout: Some(Duration::from_secs(10)),
        repeat_count: 1,
    };
    Orchestrator::new(
        transport,
        options,
        Arc::new(NetworkLogger::quiet()),
        TrialLogger::from_logger(Logger::quiet("TRIAL")),
    )
}

#[tokio::test]
async fn test_trigger_is_form_encoded_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/keys/name"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("value=jex"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"action":"set"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::with_defaults().unwrap();
    let key = Url::parse(&format!("{}/v2/keys/name", server.uri())).unwrap();
    issue_trigger(
        &transport,
        &key,
        "jex",
        RetryPolicy::fixed(Duration::from_millis(10)),
        &NetworkLogger::quiet(),
    )
    .await;
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/keys/name"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::with_defaults().unwrap();
    let key = Url::parse(&format!("{}/v2/keys/name", server.uri())).unwrap();
    issue_trigger(
        &transport,
        &key,
        "jex",
        RetryPolicy::fixed(Duration::from_millis(10)),
        &NetworkLogger::quiet(),
    )
    .await;
}

#[tokio::test]
async fn test_long_poll_request_carries_wait_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/keys/name"))
        .and(query_param("wait", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::with_defaults().unwrap();
    let key = Url::parse(&format!("{}/v2/keys/name", server.uri())).unwrap();
    let mut response = transport.send(&HttpRequest::long_poll(&key)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.read_to_end().await.unwrap(), b"{}".to_vec());
}

#[tokio::test]
async fn test_random_keys_put_to_distinct_paths() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v2/keys/\d+$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(5)
        .mount(&server)
        .await;

    let run = orchestrator(&server.uri(), 5).run_random_keys().unwrap();
    let report = run.wait_all().await.unwrap();
    assert_eq!(report.connection_count, 5);
    assert!(report.completion.unwrap() >= report.dispatch);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);

    let paths: HashSet<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(paths.len(), 5);
    for request in &requests {
        let key = request.url.path().trim_start_matches("/v2/keys/");
        assert_eq!(String::from_utf8_lossy(&request.body), format!("value={}", key));
    }
}

#[tokio::test]
async fn test_zero_connection_trial_still_writes() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/keys/name"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let trial = orchestrator(&server.uri(), 0).run_trial(0).await.unwrap();
    assert_eq!(trial.connection_count, 0);
}

#[tokio::test]
async fn test_immediate_responses_resolve_every_session() {
    // A server that answers watches at once still yields exactly one trigger
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("wait", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(8)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let summary = orchestrator(&server.uri(), 8).run_trials().await.unwrap();
    assert_eq!(summary.trial_count(), 1);
}
