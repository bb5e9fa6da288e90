use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::plan::PlanKind;
use crate::panel::descriptor;

#[derive(Debug, Error)]
pub enum PanelError {
    /// Network or HTTP-layer failure; potentially transient.
    #[error("panel transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The panel understood the request and refused it.
    #[error("{0}")]
    Rejected(String),
    /// The revoke target does not exist. Informational: the credential
    /// may already be gone, callers must not treat this as transport.
    #[error("credential {email} not found in inbound {inbound_id}")]
    CredentialNotFound { email: String, inbound_id: i64 },
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Panel-assigned identifier; never changes once issued.
    pub client_id: String,
    /// The fake id in panel terms, used to re-locate the credential.
    pub email: String,
    pub connection_uri: String,
}

/// Provisioning seam the orchestrators depend on. No automatic retries
/// behind this trait: re-issuing blindly risks duplicate credentials,
/// so retry policy stays with the caller.
#[async_trait]
pub trait CredentialProvisioner: Send + Sync {
    async fn issue_credential(
        &self,
        fake_id: i64,
        expiry_millis: i64,
        plan: PlanKind,
        inbound_id: i64,
    ) -> Result<IssuedCredential, PanelError>;

    async fn revoke_credential(&self, fake_id: i64, inbound_id: i64) -> Result<(), PanelError>;
}

/// Client for the 3x-ui style access panel. Holds no session state:
/// every logical operation builds a fresh cookie jar and logs in again,
/// trading latency for resilience to panel-side session expiry.
#[derive(Clone)]
pub struct PanelClient {
    base_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct Inbound {
    id: i64,
    port: u16,
    settings: String,
    #[serde(rename = "streamSettings")]
    stream_settings: String,
}

#[derive(Debug, Deserialize)]
struct StreamSettings {
    #[serde(rename = "realitySettings")]
    reality: RealitySettings,
}

#[derive(Debug, Deserialize)]
struct RealitySettings {
    settings: RealityKeys,
    #[serde(rename = "shortIds")]
    short_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RealityKeys {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct InboundSettings {
    #[serde(default)]
    clients: Vec<InboundClient>,
}

#[derive(Debug, Deserialize)]
struct InboundClient {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: String,
}

/// Success iff HTTP 200 and the body's `success` flag, when present and
/// well-formed, is not false.
async fn checked(resp: reqwest::Response, what: &str) -> Result<serde_json::Value, PanelError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(PanelError::Rejected(format!(
            "{what} failed with HTTP {status}: {text}"
        )));
    }

    let body: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let msg = body.get("msg").and_then(|v| v.as_str()).unwrap_or("");
        return Err(PanelError::Rejected(format!(
            "{what} rejected by panel: {msg}"
        )));
    }

    Ok(body)
}

impl PanelClient {
    pub fn new(base_url: String, username: String, password: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        }
    }

    fn session(&self) -> Result<Client, PanelError> {
        Ok(Client::builder().cookie_store(true).build()?)
    }

    async fn login(&self, http: &Client) -> Result<(), PanelError> {
        let resp = http
            .post(format!("{}/login", self.base_url))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;
        checked(resp, "login").await?;
        Ok(())
    }

    async fn fetch_inbound(&self, http: &Client, inbound_id: i64) -> Result<Inbound, PanelError> {
        let resp = http
            .get(format!("{}/panel/api/inbounds/list", self.base_url))
            .send()
            .await?;
        let body = checked(resp, "inbound list").await?;

        let inbounds: Vec<Inbound> =
            serde_json::from_value(body.get("obj").cloned().unwrap_or(serde_json::Value::Null))
                .map_err(|e| {
                    PanelError::Rejected(format!("unexpected inbound list shape: {e}"))
                })?;

        inbounds
            .into_iter()
            .find(|i| i.id == inbound_id)
            .ok_or_else(|| PanelError::Rejected(format!("inbound {inbound_id} not found")))
    }
}

#[async_trait]
impl CredentialProvisioner for PanelClient {
    async fn issue_credential(
        &self,
        fake_id: i64,
        expiry_millis: i64,
        plan: PlanKind,
        inbound_id: i64,
    ) -> Result<IssuedCredential, PanelError> {
        let http = self.session()?;
        self.login(&http).await?;

        let inbound = self.fetch_inbound(&http, inbound_id).await?;
        let stream: StreamSettings = serde_json::from_str(&inbound.stream_settings)
            .map_err(|e| PanelError::Rejected(format!("unexpected stream settings: {e}")))?;
        let short_id = stream
            .reality
            .short_ids
            .first()
            .cloned()
            .ok_or_else(|| {
                PanelError::Rejected(format!("inbound {inbound_id} has no reality short ids"))
            })?;

        let client_id = Uuid::new_v4().to_string();
        let email = fake_id.to_string();

        let payload = json!({
            "id": inbound_id,
            "remark": "",
            "enable": true,
            "expiryTime": expiry_millis,
            "totalGB": 0,
            "client": {
                "id": client_id,
                "email": email,
                "enable": true,
                "expiryTime": expiry_millis,
                "limitIp": 0,
                "totalGB": 0,
                "tgId": 0,
                "reset": 0,
                "flow": "xtls-rprx-vision",
            },
        });

        let resp = http
            .post(format!("{}/panel/api/inbounds/addClient", self.base_url))
            .json(&payload)
            .send()
            .await?;
        checked(resp, "addClient").await?;

        let connection_uri = descriptor::build_vless(
            &client_id,
            &descriptor::base_host(&self.base_url),
            inbound.port,
            plan.tag(),
            fake_id,
            &stream.reality.settings.public_key,
            &short_id,
        );

        info!(
            "Issued panel client email={} uuid={} inbound={}",
            email, client_id, inbound_id
        );

        Ok(IssuedCredential {
            client_id,
            email,
            connection_uri,
        })
    }

    async fn revoke_credential(&self, fake_id: i64, inbound_id: i64) -> Result<(), PanelError> {
        let http = self.session()?;
        self.login(&http).await?;

        let inbound = self.fetch_inbound(&http, inbound_id).await?;
        let settings: InboundSettings = serde_json::from_str(&inbound.settings)
            .map_err(|e| PanelError::Rejected(format!("unexpected inbound settings: {e}")))?;

        let email = fake_id.to_string();
        let target = settings
            .clients
            .iter()
            .find(|c| c.email == email)
            .ok_or_else(|| PanelError::CredentialNotFound {
                email: email.clone(),
                inbound_id,
            })?;

        let resp = http
            .post(format!(
                "{}/panel/api/inbounds/{}/delClient/{}",
                self.base_url, inbound_id, target.id
            ))
            .send()
            .await?;
        checked(resp, "delClient").await?;

        info!(
            "Revoked panel client email={} uuid={} inbound={}",
            email, target.id, inbound_id
        );

        Ok(())
    }
}
