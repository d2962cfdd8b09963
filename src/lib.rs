#![doc = r#"
wxcheckin-rs

Client library for the checkin/device mini-program REST backend.

What's here:
- sign: per-request MD5 signatures for local-refresh endpoints that run
  before any bearer token exists.
- identity/store/login: the persisted login session (access/refresh tokens,
  user profile, WeChat ids), its 3-second-buffer expiry policy, and the
  cached-or-exchange login flow.
- client + checkin/device/pay: one `ApiClient` wrapping the HTTP plumbing,
  with endpoint wrappers spread over per-domain modules.

Platform calls (login code acquisition, the payment sheet, storage) sit
behind ports so everything runs without a platform runtime.

Quick usage:

```ignore
use std::sync::Arc;
use wxcheckin_rs::{ApiClient, AppConfig, Authenticator, FileStore, Identifier};

async fn run(code_source: impl wxcheckin_rs::CodeSource) -> wxcheckin_rs::Result<()> {
    let store = Arc::new(FileStore::new("/data/wxcheckin"));
    let client = ApiClient::new(AppConfig::from_env(), store);

    // Login (cached identity reused while valid)
    let auth = Authenticator::new(client.clone(), code_source);
    let id = auth.login(false).await?;

    // Signed status refresh, no bearer token needed
    let status = client
        .set_ready("checkin-token", &Identifier::OpenId(id.openid.clone()))
        .await?;
    println!("applet status: {:?}", status.applet.map(|a| a.status));
    Ok(())
}
```
"#]

pub mod checkin;
pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod identity;
pub mod login;
pub mod pay;
pub mod sign;
pub mod store;

pub use checkin::{extract_query_param, StatusData, Verse};
pub use client::{ApiClient, ApiEnvelope};
pub use config::AppConfig;
pub use device::{Device, DevicePatch, DeviceQuery, Setup, SetupPatch};
pub use error::{Error, Result};
pub use identity::{IdentityRecord, TokenInfo, UserProfile};
pub use login::{Authenticator, CodeSource, PhonePayload};
pub use pay::{generate_order_no, MockSheet, OrderRequest, PaymentSheet, PaySign};
pub use sign::{Identifier, SignedQuery, Signer};
pub use store::{auth_header, FileStore, IdentityStore, MemoryStore};
