//! Payment order creation, querying, and the payment-sheet port.
//!
//! The backend wraps the upstream payment provider; the client only creates
//! an order, hands the signed parameters to the platform's payment sheet,
//! and polls the order state afterwards. The sheet itself is a black-box
//! platform call, modeled as the [`PaymentSheet`] trait so flows can run
//! against a mock in devtools and tests.
//!
//! Endpoints:
//! - `POST /wechat-pay/wxpay-order`: create an order, returns the signed sheet parameters
//! - `GET /wechat-pay/wxpay-query-order-by-out-trade-no`: query order state

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::client::ApiClient;
use crate::error::{Error, Result};

/// Order creation request.
#[derive(Clone, Debug, Serialize)]
pub struct OrderRequest {
    pub openid: String,
    pub out_trade_no: String,
    /// Amount in cents
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Signed parameters the platform payment sheet consumes.
#[derive(Clone, Debug, Deserialize)]
pub struct PaySign {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(rename = "nonceStr")]
    pub nonce_str: String,
    pub package: String,
    #[serde(rename = "signType")]
    pub sign_type: String,
    #[serde(rename = "paySign")]
    pub pay_sign: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrderAmount {
    pub payer_currency: String,
    pub total: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrderSceneInfo {
    pub device_id: String,
}

/// Order detail as the payment provider reports it.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderInfo {
    pub amount: OrderAmount,
    pub appid: String,
    pub mchid: String,
    pub out_trade_no: String,
    #[serde(default)]
    pub promotion_detail: Vec<serde_json::Value>,
    pub scene_info: OrderSceneInfo,
    pub trade_state: String,
    pub trade_state_desc: String,
}

/// Order state snapshot from the query endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderOutcome {
    pub order_info: OrderInfo,
    pub trade_state: String,
    pub trade_state_desc: String,
}

#[derive(Deserialize)]
struct CodeEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> CodeEnvelope<T> {
    fn into_data(self, what: &str) -> Result<T> {
        match (self.code, self.data) {
            (0, Some(data)) => Ok(data),
            (code, _) => Err(Error::Api {
                message: match self.message {
                    Some(m) => format!("{what} failed (code {code}): {m}"),
                    None => format!("{what} failed (code {code})"),
                },
            }),
        }
    }
}

/// Port for the platform payment sheet.
///
/// `present` resolves to `true` when the user completes payment and `false`
/// when they cancel or the sheet fails; sheet-level failures are user
/// decisions, not errors.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    async fn present(&self, sign: &PaySign) -> bool;
}

/// Sheet stand-in for devtools runs, where the real sheet cannot open.
#[derive(Clone, Debug)]
pub struct MockSheet {
    pub approve: bool,
}

#[async_trait]
impl PaymentSheet for MockSheet {
    async fn present(&self, _sign: &PaySign) -> bool {
        debug!(approve = self.approve, "mock payment sheet");
        self.approve
    }
}

impl ApiClient {
    /// Create a payment order and return the signed sheet parameters.
    #[instrument(level = "debug", skip(self, request))]
    pub async fn create_order(&self, request: &OrderRequest) -> Result<PaySign> {
        let url = self.endpoint("/wechat-pay/wxpay-order")?;
        let env: CodeEnvelope<PaySign> = self.post_json(url, request).await?;
        env.into_data("order creation")
    }

    /// Query an order by its merchant trade number.
    #[instrument(level = "debug", skip(self))]
    pub async fn query_order(&self, out_trade_no: &str) -> Result<OrderOutcome> {
        let mut url = self.endpoint("/wechat-pay/wxpay-query-order-by-out-trade-no")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("out_trade_no", out_trade_no);
        }
        let env: CodeEnvelope<OrderOutcome> = self.get_json(url).await?;
        env.into_data("order query")
    }

    /// Whether the order has been paid.
    ///
    /// Query failures report as unpaid rather than erroring: the caller is
    /// polling, and an unreachable query is indistinguishable from "not yet".
    pub async fn is_order_paid(&self, out_trade_no: &str) -> bool {
        match self.query_order(out_trade_no).await {
            Ok(outcome) => outcome.trade_state == "SUCCESS",
            Err(e) => {
                warn!("order query failed: {e}");
                false
            }
        }
    }

    /// Create an order and run it through the payment sheet.
    ///
    /// Returns whether the user completed payment. Order creation failures
    /// propagate as errors; sheet declines do not.
    #[instrument(level = "debug", skip(self, request, sheet))]
    pub async fn pay(&self, request: &OrderRequest, sheet: &dyn PaymentSheet) -> Result<bool> {
        let sign = self.create_order(request).await?;
        let paid = sheet.present(&sign).await;
        debug!(paid, out_trade_no = %request.out_trade_no, "payment sheet finished");
        Ok(paid)
    }
}

/// Generate a merchant trade number: millisecond timestamp plus six
/// pseudo-random digits.
pub fn generate_order_no() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let millis = now.as_millis();
    let seed = (now.as_nanos() as u64) ^ (std::process::id() as u64).wrapping_mul(0x9E3779B185EBCA87);
    let random = 100_000 + xorshift64star(seed | 1) % 900_000;
    format!("{millis}{random}")
}

/// xorshift64* PRNG step
fn xorshift64star(mut x: u64) -> u64 {
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x.wrapping_mul(0x2545F4914F6CDD1D)
}
