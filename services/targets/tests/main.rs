use std::env;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use pretty_assertions::assert_eq;
use serde_json::json;
use vws_core::hash::hex_md5;
use vws_core::{Context, Error, ErrorKind, HttpSend, OsEnv};
use vws_http_send_reqwest::ReqwestHttpSend;
use vws_targets::{
    authorization, sign, Client, Config, Credential, ResultCode, ServiceResponse, TargetPayload,
    TransportError,
};
use wiremock::matchers::{body_partial_json, body_string, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const ACCESS_KEY: &str = "server_access_key";
const SECRET_KEY: &str = "server_secret_key";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Matches requests whose `Authorization` header is the signature of the
/// request as received by the server.
struct VerifySignature {
    access_key: &'static str,
    secret_key: &'static str,
}

impl VerifySignature {
    fn new(access_key: &'static str, secret_key: &'static str) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }
}

impl Match for VerifySignature {
    fn matches(&self, request: &Request) -> bool {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        let signature = sign(
            self.secret_key,
            request.method.as_str(),
            &hex_md5(&request.body),
            &header("content-type"),
            &header("date"),
            request.url.path(),
        );
        header("authorization") == authorization(self.access_key, &signature)
    }
}

fn client(server: &MockServer) -> Client {
    client_with_http(server, ReqwestHttpSend::default())
}

fn client_with_http(server: &MockServer, http: impl HttpSend) -> Client {
    Client::from_config(
        Context::new().with_http_send(http),
        Config::new()
            .with_access_key(ACCESS_KEY)
            .with_secret_key(SECRET_KEY)
            .with_endpoint(server.uri()),
    )
}

/// Reject everything that no other mock matched, like the service does
/// for requests with a bad signature.
async fn mount_authentication_failure(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "result_code": "AuthenticationFailure",
            "transaction_id": "tx-auth",
        })))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_target() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/targets"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .and(body_partial_json(json!({
            "name": "box",
            "width": 0.5,
            "image": "bWV0YQ==",
            "active_flag": true,
            "application_metadata": "bWV0YQ==",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "result_code": "TargetCreated",
            "transaction_id": "tx1",
            "target_id": "T1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = TargetPayload::new("box", 0.5, b"meta", true, "meta");
    let resp = client(&server).create_target(&payload)?.await?;

    assert_eq!(resp.result_code, ResultCode::TargetCreated);
    assert!(resp.is_success());
    assert_eq!(resp.target_id.as_deref(), Some("T1"));
    assert_eq!(resp.transaction_id.as_deref(), Some("tx1"));
    Ok(())
}

#[tokio::test]
async fn test_retrieve_unknown_target() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets/missing"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "result_code": "UnknownTarget",
            "transaction_id": "tx2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server).retrieve_target("missing")?.await?;

    assert_eq!(resp.result_code, ResultCode::Application("UnknownTarget".into()));
    assert!(!resp.is_success());
    assert!(!resp.result_code.is_transport_error());
    assert!(resp.target_record.is_none());
    Ok(())
}

#[tokio::test]
async fn test_retrieve_target_record() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets/T1"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "transaction_id": "tx3",
            "status": "processing",
            "target_record": {
                "target_id": "T1",
                "active_flag": true,
                "name": "box",
                "width": 0.5,
                "tracking_rating": -1,
                "reco_rating": "",
            },
        })))
        .mount(&server)
        .await;

    let resp = client(&server).retrieve_target("T1")?.await?;

    assert!(resp.is_success());
    assert_eq!(resp.status.as_deref(), Some("processing"));
    let record = resp.target_record.expect("target record must be present");
    assert_eq!(record.name, "box");
    assert_eq!(record.width, 0.5);
    assert_eq!(record.tracking_rating, -1);
    Ok(())
}

#[tokio::test]
async fn test_bad_signature_is_an_application_error() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "results": [],
        })))
        .expect(0)
        .mount(&server)
        .await;
    mount_authentication_failure(&server).await;

    let client = Client::from_config(
        Context::new().with_http_send(ReqwestHttpSend::default()),
        Config::new()
            .with_access_key(ACCESS_KEY)
            .with_secret_key("wrong_secret_key")
            .with_endpoint(server.uri()),
    );
    let resp = client.retrieve_target_list()?.await?;

    assert_eq!(resp.result_code.as_str(), "AuthenticationFailure");
    assert!(resp.results.is_none());
    Ok(())
}

#[tokio::test]
async fn test_set_credential_signs_later_calls() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets"))
        .and(VerifySignature::new("rotated_access_key", "rotated_secret_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "results": ["T1", "T2"],
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_authentication_failure(&server).await;

    let client = client(&server);
    let before = client.retrieve_target_list()?.await?;
    assert_eq!(before.result_code.as_str(), "AuthenticationFailure");

    client.set_credential(Credential::new("rotated_access_key", "rotated_secret_key"));
    let after = client.retrieve_target_list()?.await?;
    assert_eq!(after.result_code, ResultCode::Success);
    assert_eq!(after.results, Some(vec!["T1".to_string(), "T2".to_string()]));
    Ok(())
}

#[tokio::test]
async fn test_call_is_signed_when_first_polled() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets"))
        .and(VerifySignature::new("rotated_access_key", "rotated_secret_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "results": [],
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_authentication_failure(&server).await;

    let client = client(&server);
    let pending = client.retrieve_target_list()?;
    client.set_credential(Credential::new("rotated_access_key", "rotated_secret_key"));

    let resp = pending.await?;
    assert_eq!(resp.result_code, ResultCode::Success);
    Ok(())
}

#[tokio::test]
async fn test_partial_updates() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    for body in [
        r#"{"name":"crate"}"#,
        r#"{"width":2.0}"#,
        r#"{"image":"bWV0YQ=="}"#,
        r#"{"active_flag":false}"#,
        r#"{"application_metadata":"bWV0YQ=="}"#,
    ] {
        Mock::given(method("PUT"))
            .and(path("/targets/T1"))
            .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
            .and(body_string(body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result_code": "Success",
                "transaction_id": "tx-update",
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client(&server);
    let calls = [
        client.update_target_name("T1", "crate")?,
        client.update_target_width("T1", 2.0)?,
        client.update_target_image("T1", b"meta")?,
        client.update_target_active_flag("T1", false)?,
        client.update_target_metadata("T1", "meta")?,
    ];
    for call in calls {
        let resp = call.await?;
        assert_eq!(resp.result_code, ResultCode::Success);
    }
    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_target() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/targets/T1"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .and(body_partial_json(json!({"name": "box", "active_flag": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/targets/T1"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "result_code": "TargetStatusProcessing",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let payload = TargetPayload::new("box", 1.0, b"jpeg", false, "");
    let resp = client.update_target("T1", &payload)?.await?;
    assert!(resp.is_success());

    let resp = client.delete_target("T1")?.await?;
    assert_eq!(resp.result_code.as_str(), "TargetStatusProcessing");
    Ok(())
}

#[tokio::test]
async fn test_retrieve_duplicates() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/duplicates/T1"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "similar_targets": ["T2"],
        })))
        .mount(&server)
        .await;

    let resp = client(&server).retrieve_duplicates("T1")?.await?;
    assert_eq!(resp.similar_targets, Some(vec!["T2".to_string()]));
    Ok(())
}

#[tokio::test]
async fn test_summaries() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/summary"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "transaction_id": "tx4",
            "name": "db",
            "active_images": 2,
            "inactive_images": 1,
            "failed_images": 0,
            "target_quota": 1000,
            "request_quota": 100000,
            "request_usage": 3,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/summary/T1"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "database_name": "db",
            "target_name": "box",
            "upload_date": "2024-01-01",
            "active_flag": true,
            "status": "success",
            "tracking_rating": 4,
            "reco_rating": "",
            "total_recos": 10,
            "current_month_recos": 2,
            "previous_month_recos": 8,
        })))
        .mount(&server)
        .await;

    let client = client(&server);

    let db = client.retrieve_database_summary()?.await?;
    assert_eq!(db.name.as_deref(), Some("db"));
    assert_eq!(db.active_images, Some(2));
    assert_eq!(db.inactive_images, Some(1));
    assert_eq!(db.failed_images, Some(0));
    assert_eq!(db.request_usage, Some(3));
    assert!(db.total_recos.is_none());

    let target = client.retrieve_target_summary("T1")?.await?;
    assert_eq!(target.target_name.as_deref(), Some("box"));
    assert_eq!(target.tracking_rating, Some(4));
    assert_eq!(target.previous_month_recos, Some(8));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(VerifySignature::new(ACCESS_KEY, SECRET_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
        })))
        .expect(8)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut handles = Vec::new();
    for idx in 0..8 {
        let call = client.retrieve_target(&format!("T{idx}"))?;
        handles.push(tokio::spawn(call));
    }
    for handle in handles {
        let resp = handle.await??;
        assert!(resp.is_success());
    }
    Ok(())
}

#[tokio::test]
async fn test_on_complete_delivers_once() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "Success",
            "name": "db",
        })))
        .mount(&server)
        .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    client(&server)
        .retrieve_database_summary()?
        .on_complete(move |resp| {
            let _ = tx.send(resp);
        })
        .await?;

    let resp = rx.recv().await.expect("handler must be called")?;
    assert_eq!(resp.name.as_deref(), Some("db"));
    assert!(rx.recv().await.is_none(), "handler must be called once");
    Ok(())
}

#[tokio::test]
async fn test_processing_timeout() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/summary"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result_code": "Success"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let http = ReqwestHttpSend::with_timeouts(Duration::from_secs(5), Duration::from_millis(200))?;
    let resp = client_with_http(&server, http)
        .retrieve_database_summary()?
        .await?;

    assert_eq!(resp.result_code.as_str(), "Processing the request Timed Out");
    assert!(resp.name.is_none());
    Ok(())
}

#[derive(Debug)]
struct ConnectTimeout;

#[async_trait]
impl HttpSend for ConnectTimeout {
    async fn http_send(&self, _: http::Request<Bytes>) -> vws_core::Result<http::Response<Bytes>> {
        Err(Error::new(ErrorKind::ConnectTimeout, "connect timed out"))
    }
}

#[tokio::test]
async fn test_connection_timeout() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    let resp = client_with_http(&server, ConnectTimeout)
        .retrieve_target("T1")?
        .await?;

    assert_eq!(resp.result_code.as_str(), "Connection Timed Out");
    assert_eq!(
        resp.result_code,
        ResultCode::Transport(TransportError::ConnectionTimedOut)
    );
    assert!(resp.target_record.is_none());
    Ok(())
}

#[tokio::test]
async fn test_abort() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/targets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result_code": "Success"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let call = client(&server).retrieve_target_list()?;
    let abort = call.abort_handle();
    let handle = tokio::spawn(call);

    tokio::time::sleep(Duration::from_millis(100)).await;
    abort.abort();

    let resp = tokio::time::timeout(Duration::from_secs(2), handle).await???;
    assert_eq!(resp.result_code.as_str(), "Request Aborted");
    Ok(())
}

#[tokio::test]
async fn test_empty_target_id_sends_nothing() -> Result<()> {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).retrieve_target_summary("").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    Ok(())
}

fn init_live_client() -> Option<Client> {
    init_logger();
    let _ = dotenv::dotenv();

    if env::var("VWS_TEST").is_err() || env::var("VWS_TEST").unwrap() != "on" {
        return None;
    }

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    Some(Client::from_config(ctx, Config::new()))
}

#[tokio::test]
async fn test_live_database_summary() -> Result<()> {
    let Some(client) = init_live_client() else {
        warn!("VWS_TEST is not set, skipped");
        return Ok(());
    };

    let resp = client.retrieve_database_summary()?.await?;
    assert_eq!(resp.result_code, ResultCode::Success, "{resp:?}");
    assert!(resp.name.is_some());
    Ok(())
}
