use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The processor understood the reversal and declined it. The
    /// description is reported verbatim to the operator, never retried.
    #[error("{0}")]
    Rejected(String),
}

/// Reverses a captured charge against the payer's real account.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund(&self, real_id: i64, charge_id: &str) -> Result<(), PaymentError>;
}

/// Telegram Stars reversal via the raw Bot API; teloxide has no typed
/// wrapper that surfaces the processor's description text.
#[derive(Clone)]
pub struct StarsGateway {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    ok: bool,
    description: Option<String>,
}

impl StarsGateway {
    pub fn new(bot_token: String) -> Self {
        Self::with_api_base("https://api.telegram.org".to_string(), bot_token)
    }

    pub fn with_api_base(api_base: String, bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        }
    }
}

#[async_trait]
impl PaymentGateway for StarsGateway {
    async fn refund(&self, real_id: i64, charge_id: &str) -> Result<(), PaymentError> {
        let url = format!("{}/bot{}/refundStarPayment", self.api_base, self.bot_token);

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "user_id": real_id,
                "telegram_payment_charge_id": charge_id,
            }))
            .send()
            .await?;

        // Telegram answers JSON on both 200 and 4xx; the ok flag is the
        // source of truth, not the status code.
        let body: RefundResponse = resp.json().await?;
        if !body.ok {
            return Err(PaymentError::Rejected(
                body.description
                    .unwrap_or_else(|| "refund declined without description".to_string()),
            ));
        }

        info!("Stars refund accepted for charge {}", charge_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn refund_ok_when_processor_accepts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/refundStarPayment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = StarsGateway::with_api_base(server.uri(), "TOKEN".into());
        gateway.refund(42, "chg_1").await.unwrap();
    }

    #[tokio::test]
    async fn refund_surfaces_processor_description_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/refundStarPayment"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: CHARGE_ALREADY_REFUNDED",
            })))
            .mount(&server)
            .await;

        let gateway = StarsGateway::with_api_base(server.uri(), "TOKEN".into());
        let err = gateway.refund(42, "chg_1").await.unwrap_err();

        assert!(
            matches!(err, PaymentError::Rejected(ref d) if d == "Bad Request: CHARGE_ALREADY_REFUNDED")
        );
    }
}
