//! Login orchestration: cached-identity reuse, forced refresh, and the
//! no-partial-persist guarantee on failed exchanges.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wxcheckin_rs::{
    ApiClient, AppConfig, Authenticator, CodeSource, Error, IdentityRecord, IdentityStore,
    MemoryStore, Result, TokenInfo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct FixedCode {
    code: String,
    calls: Arc<AtomicUsize>,
}

impl FixedCode {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeSource for FixedCode {
    async fn login_code(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.clone())
    }
}

struct NoCode;

#[async_trait]
impl CodeSource for NoCode {
    async fn login_code(&self) -> Result<String> {
        Err(Error::Platform("login failed: no code returned".into()))
    }
}

fn record(access_token: &str, expires: &str) -> IdentityRecord {
    IdentityRecord {
        token: TokenInfo {
            access_token: access_token.into(),
            refresh_token: "rt".into(),
            expires: expires.into(),
        },
        user: None,
        openid: "oid-cached".into(),
        unionid: "uid-cached".into(),
    }
}

fn login_response(access_token: &str) -> serde_json::Value {
    json!({
        "success": true,
        "message": "ok",
        "data": {
            "token": {
                "accessToken": access_token,
                "refreshToken": "rt-fresh",
                "expires": "2030-01-01 00:00:00"
            },
            "user": null,
            "openid": "oid-fresh",
            "unionid": "uid-fresh"
        }
    })
}

fn client_for(server: &MockServer, store: Arc<MemoryStore>) -> ApiClient {
    let config = AppConfig::default().with_api_url(server.uri());
    ApiClient::new(config, store)
}

// ---------------------------------------------------------------------------
// Cached-identity fast path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_unexpired_identity_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response("at-fresh")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(&record("at-cached", "2030-01-01 00:00:00")).unwrap();

    let code_source = FixedCode::new("c-1");
    let auth = Authenticator::new(client_for(&server, store.clone()), code_source.clone());

    let id = auth.login(false).await.unwrap();
    assert_eq!(id.token.access_token, "at-cached");
    assert_eq!(id.openid, "oid-cached");
    assert_eq!(code_source.calls(), 0);
}

#[tokio::test]
async fn expired_identity_triggers_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .and(body_json(json!({ "code": "c-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response("at-fresh")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(&record("at-stale", "2020-01-01 00:00:00")).unwrap();

    let auth = Authenticator::new(client_for(&server, store.clone()), FixedCode::new("c-2"));

    let id = auth.login(false).await.unwrap();
    assert_eq!(id.token.access_token, "at-fresh");

    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.token.access_token, "at-fresh");
    assert_eq!(persisted.openid, "oid-fresh");
}

#[tokio::test]
async fn forced_refresh_exchanges_despite_valid_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response("at-fresh")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(&record("at-cached", "2030-01-01 00:00:00")).unwrap();

    let code_source = FixedCode::new("c-3");
    let auth = Authenticator::new(client_for(&server, store.clone()), code_source.clone());

    let id = auth.login(true).await.unwrap();
    assert_eq!(id.token.access_token, "at-fresh");
    assert_eq!(code_source.calls(), 1);

    // Cache overwritten wholesale
    assert_eq!(store.load().unwrap().unwrap().token.access_token, "at-fresh");
}

// ---------------------------------------------------------------------------
// Failure paths leave the store untouched
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_exchange_keeps_previous_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(&record("at-stale", "2020-01-01 00:00:00")).unwrap();

    let auth = Authenticator::new(client_for(&server, store.clone()), FixedCode::new("c-4"));

    let err = auth.login(false).await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 500 }));
    assert_eq!(store.load().unwrap().unwrap().token.access_token, "at-stale");
}

#[tokio::test]
async fn platform_code_failure_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response("at-fresh")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let auth = Authenticator::new(client_for(&server, store.clone()), NoCode);

    let err = auth.login(true).await.unwrap_err();
    assert!(matches!(err, Error::Platform(_)));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn rejected_envelope_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/site/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "code already used",
            "data": null
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let auth = Authenticator::new(client_for(&server, store.clone()), FixedCode::new("c-5"));

    let err = auth.login(true).await.unwrap_err();
    match err {
        Error::Api { message } => assert_eq!(message, "code already used"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(store.load().unwrap().is_none());
}
