//! Shared in-memory fakes for the orchestrator tests. The ledger fake
//! mirrors the real repository's semantics (creating a grant retires
//! the prior ones); the panel and gateway fakes just record calls.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use kynix_db::models::{NewCredential, Subscription, User};

use crate::config::InboundRoutes;
use crate::models::plan::PlanKind;
use crate::panel::{CredentialProvisioner, IssuedCredential, PanelError};
use crate::services::ledger::{SubscriptionLedger, UserDirectory};
use crate::services::payment_gateway::{PaymentError, PaymentGateway};

pub const ROUTES: InboundRoutes = InboundRoutes {
    plus: 11,
    infinite: 22,
};

pub fn user_fixture(id: i64) -> User {
    User {
        id,
        tg_id: 1_000 + id,
        fake_id: 10_000_000 + id,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    subs: Mutex<Vec<Subscription>>,
    next_id: AtomicI64,
    fail_writes: bool,
    create_calls: AtomicUsize,
    deactivate_calls: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn all(&self) -> Vec<Subscription> {
        self.subs.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn deactivate_calls(&self) -> usize {
        self.deactivate_calls.load(Ordering::SeqCst)
    }

    pub fn seed(&self, user_id: i64, active: bool, permanent: bool) -> Subscription {
        let sub = Subscription {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            active,
            expires_at: if permanent {
                None
            } else {
                Some(Utc::now() + Duration::days(30))
            },
            xui_client_id: "uuid-seeded".to_string(),
            xui_email: "seeded".to_string(),
            xui_config: "vless://seeded".to_string(),
            created_at: Utc::now(),
            closed_at: None,
        };
        self.subs.lock().unwrap().push(sub.clone());
        sub
    }

    fn create(
        &self,
        user_id: i64,
        expires_at: Option<chrono::DateTime<Utc>>,
        credential: NewCredential,
    ) -> anyhow::Result<Subscription> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            anyhow::bail!("ledger unavailable");
        }
        let mut subs = self.subs.lock().unwrap();
        for s in subs.iter_mut().filter(|s| s.user_id == user_id && s.active) {
            s.active = false;
            s.closed_at = Some(Utc::now());
        }
        let sub = Subscription {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            active: true,
            expires_at,
            xui_client_id: credential.client_id,
            xui_email: credential.email,
            xui_config: credential.config,
            created_at: Utc::now(),
            closed_at: None,
        };
        subs.push(sub.clone());
        Ok(sub)
    }
}

#[async_trait]
impl SubscriptionLedger for MemoryLedger {
    async fn latest(&self, user_id: i64) -> anyhow::Result<Option<Subscription>> {
        Ok(self
            .subs
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.id)
            .cloned())
    }

    async fn deactivate_all(&self, user_id: i64) -> anyhow::Result<()> {
        self.deactivate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            anyhow::bail!("ledger unavailable");
        }
        let mut subs = self.subs.lock().unwrap();
        for s in subs.iter_mut().filter(|s| s.user_id == user_id && s.active) {
            s.active = false;
            s.closed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_time_boxed(
        &self,
        user_id: i64,
        days: i64,
        credential: NewCredential,
    ) -> anyhow::Result<Subscription> {
        self.create(user_id, Some(Utc::now() + Duration::days(days)), credential)
    }

    async fn create_permanent(
        &self,
        user_id: i64,
        credential: NewCredential,
    ) -> anyhow::Result<Subscription> {
        self.create(user_id, None, credential)
    }
}

#[derive(Debug, Clone)]
pub struct IssueCall {
    pub fake_id: i64,
    pub expiry_millis: i64,
    pub inbound_id: i64,
    pub client_id: String,
}

pub enum RevokeOutcome {
    Ok,
    Rejected,
    NotFound,
}

pub struct RecordingPanel {
    pub issue_calls: Mutex<Vec<IssueCall>>,
    pub revoke_calls: Mutex<Vec<(i64, i64)>>,
    reject_issue: bool,
    revoke_outcome: RevokeOutcome,
}

impl RecordingPanel {
    pub fn ok() -> Self {
        Self::with_revoke(RevokeOutcome::Ok)
    }

    pub fn rejecting_issue() -> Self {
        Self {
            reject_issue: true,
            ..Self::with_revoke(RevokeOutcome::Ok)
        }
    }

    pub fn with_revoke(revoke_outcome: RevokeOutcome) -> Self {
        Self {
            issue_calls: Mutex::new(Vec::new()),
            revoke_calls: Mutex::new(Vec::new()),
            reject_issue: false,
            revoke_outcome,
        }
    }
}

#[async_trait]
impl CredentialProvisioner for RecordingPanel {
    async fn issue_credential(
        &self,
        fake_id: i64,
        expiry_millis: i64,
        _plan: PlanKind,
        inbound_id: i64,
    ) -> Result<IssuedCredential, PanelError> {
        if self.reject_issue {
            return Err(PanelError::Rejected("panel said no".to_string()));
        }
        let mut calls = self.issue_calls.lock().unwrap();
        let client_id = format!("uuid-{}", calls.len() + 1);
        calls.push(IssueCall {
            fake_id,
            expiry_millis,
            inbound_id,
            client_id: client_id.clone(),
        });
        Ok(IssuedCredential {
            client_id: client_id.clone(),
            email: fake_id.to_string(),
            connection_uri: format!("vless://{client_id}@vpn.example.net:443"),
        })
    }

    async fn revoke_credential(&self, fake_id: i64, inbound_id: i64) -> Result<(), PanelError> {
        self.revoke_calls.lock().unwrap().push((fake_id, inbound_id));
        match self.revoke_outcome {
            RevokeOutcome::Ok => Ok(()),
            RevokeOutcome::Rejected => Err(PanelError::Rejected("panel said no".to_string())),
            RevokeOutcome::NotFound => Err(PanelError::CredentialNotFound {
                email: fake_id.to_string(),
                inbound_id,
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Mutex<Vec<(i64, String)>>,
    pub reject_with: Option<String>,
}

impl RecordingGateway {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn rejecting(description: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject_with: Some(description.to_string()),
        }
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn refund(&self, real_id: i64, charge_id: &str) -> Result<(), PaymentError> {
        self.calls
            .lock()
            .unwrap()
            .push((real_id, charge_id.to_string()));
        match &self.reject_with {
            Some(d) => Err(PaymentError::Rejected(d.clone())),
            None => Ok(()),
        }
    }
}

/// Directory over a fixed set of users; lookups never fail.
pub struct FixedUsers {
    users: Vec<User>,
}

impl FixedUsers {
    pub fn of(users: Vec<User>) -> Arc<Self> {
        Arc::new(Self { users })
    }
}

#[async_trait]
impl UserDirectory for FixedUsers {
    async fn get_or_create(&self, tg_id: i64) -> anyhow::Result<User> {
        self.users
            .iter()
            .find(|u| u.tg_id == tg_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no fixture for tg_id {tg_id}"))
    }

    async fn get_by_fake_id(&self, fake_id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.fake_id == fake_id).cloned())
    }
}
