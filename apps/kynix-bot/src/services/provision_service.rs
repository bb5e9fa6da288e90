use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use kynix_db::models::{NewCredential, Subscription, User};

use crate::config::InboundRoutes;
use crate::models::plan::PlanKind;
use crate::panel::{CredentialProvisioner, PanelError};
use crate::services::ledger::SubscriptionLedger;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Nothing was changed anywhere; safe to report "try again".
    #[error("{0}")]
    Panel(#[from] PanelError),
    /// The credential exists on the panel but was never recorded.
    /// Requires manual reconciliation, not an automatic rollback.
    #[error("subscription could not be recorded: {0}")]
    Ledger(anyhow::Error),
}

/// Drives a purchase from entitlement to connection descriptor:
/// issue the panel credential, then record the ledger row.
///
/// Issuance comes first on purpose. An issued-but-unrecorded credential
/// can be found later by diffing the panel's client list against the
/// ledger; a recorded-but-never-issued one tells the user they have
/// access they do not have.
#[derive(Clone)]
pub struct ProvisionService {
    panel: Arc<dyn CredentialProvisioner>,
    ledger: Arc<dyn SubscriptionLedger>,
    routes: InboundRoutes,
}

impl ProvisionService {
    pub fn new(
        panel: Arc<dyn CredentialProvisioner>,
        ledger: Arc<dyn SubscriptionLedger>,
        routes: InboundRoutes,
    ) -> Self {
        Self {
            panel,
            ledger,
            routes,
        }
    }

    /// On success the returned subscription carries the connection URI
    /// to hand to the user verbatim. A failed provisioning never
    /// reverses the triggering payment here; that call belongs to the
    /// admin workflow.
    pub async fn provision(
        &self,
        user: &User,
        plan: PlanKind,
        payment_ref: Option<&str>,
    ) -> Result<Subscription, ProvisionError> {
        let inbound_id = self.routes.for_plan(plan);
        let expiry = plan.expiry_millis(Utc::now());

        let issued = self
            .panel
            .issue_credential(user.fake_id, expiry, plan, inbound_id)
            .await?;

        let credential = NewCredential {
            client_id: issued.client_id.clone(),
            email: issued.email.clone(),
            config: issued.connection_uri.clone(),
        };

        let recorded = match plan {
            PlanKind::TimeBoxed { days } => {
                self.ledger.create_time_boxed(user.id, days, credential).await
            }
            PlanKind::Permanent => self.ledger.create_permanent(user.id, credential).await,
        };

        match recorded {
            Ok(sub) => {
                info!(
                    "Provisioned {} access for fake_id={} payment_ref={:?}",
                    plan.tag(),
                    user.fake_id,
                    payment_ref
                );
                Ok(sub)
            }
            Err(e) => {
                error!(
                    "ORPHANED CREDENTIAL uuid={} email={} inbound={}: ledger write failed: {:#}",
                    issued.client_id, issued.email, inbound_id, e
                );
                Err(ProvisionError::Ledger(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{user_fixture, MemoryLedger, RecordingPanel, ROUTES};

    fn service(panel: Arc<RecordingPanel>, ledger: Arc<MemoryLedger>) -> ProvisionService {
        ProvisionService::new(panel, ledger, ROUTES)
    }

    #[tokio::test]
    async fn panel_failure_leaves_ledger_untouched() {
        let panel = Arc::new(RecordingPanel::rejecting_issue());
        let ledger = Arc::new(MemoryLedger::new());
        let svc = service(panel.clone(), ledger.clone());

        let err = svc
            .provision(&user_fixture(1), PlanKind::TimeBoxed { days: 30 }, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Panel(PanelError::Rejected(_))));
        assert_eq!(ledger.create_calls(), 0);
        assert_eq!(ledger.all().len(), 0);
    }

    #[tokio::test]
    async fn time_boxed_purchase_records_issued_credential() {
        let panel = Arc::new(RecordingPanel::ok());
        let ledger = Arc::new(MemoryLedger::new());
        let svc = service(panel.clone(), ledger.clone());
        let user = user_fixture(1);

        let sub = svc
            .provision(&user, PlanKind::TimeBoxed { days: 30 }, Some("chg_1"))
            .await
            .unwrap();

        let issued = {
            let issues = panel.issue_calls.lock().unwrap();
            assert_eq!(issues.len(), 1);
            issues[0].clone()
        };
        assert_eq!(issued.inbound_id, ROUTES.plus);
        assert!(issued.expiry_millis > 0);

        assert!(sub.active);
        assert_eq!(sub.xui_client_id, issued.client_id);
        let days_left = (sub.expires_at.unwrap() - Utc::now()).num_days();
        assert!((29..=30).contains(&days_left));

        let latest = svc.ledger.latest(user.id).await.unwrap().unwrap();
        assert_eq!(latest.id, sub.id);
    }

    #[tokio::test]
    async fn permanent_grant_uses_infinite_inbound_and_retires_prior_grants() {
        let panel = Arc::new(RecordingPanel::ok());
        let ledger = Arc::new(MemoryLedger::new());
        let svc = service(panel.clone(), ledger.clone());
        let user = user_fixture(1);

        svc.provision(&user, PlanKind::TimeBoxed { days: 30 }, None)
            .await
            .unwrap();
        let sub = svc
            .provision(&user, PlanKind::Permanent, None)
            .await
            .unwrap();

        let issues = panel.issue_calls.lock().unwrap();
        assert_eq!(issues[1].inbound_id, ROUTES.infinite);
        assert_eq!(issues[1].expiry_millis, 0);

        assert!(sub.active);
        assert!(sub.expires_at.is_none());

        let all = ledger.all();
        assert_eq!(all.len(), 2);
        let active: Vec<_> = all.iter().filter(|s| s.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, sub.id);
    }

    #[tokio::test]
    async fn at_most_one_active_grant_after_any_purchase_sequence() {
        let panel = Arc::new(RecordingPanel::ok());
        let ledger = Arc::new(MemoryLedger::new());
        let svc = service(panel, ledger.clone());
        let user = user_fixture(7);

        for plan in [
            PlanKind::TimeBoxed { days: 30 },
            PlanKind::Permanent,
            PlanKind::TimeBoxed { days: 90 },
            PlanKind::Permanent,
        ] {
            svc.provision(&user, plan, None).await.unwrap();
            let now = Utc::now();
            let live = ledger
                .all()
                .iter()
                .filter(|s| s.active && s.expires_at.map(|e| e > now).unwrap_or(true))
                .count();
            assert_eq!(live, 1);
        }
    }

    #[tokio::test]
    async fn ledger_failure_after_issuance_is_reported_as_orphan() {
        let panel = Arc::new(RecordingPanel::ok());
        let ledger = Arc::new(MemoryLedger::failing());
        let svc = service(panel.clone(), ledger.clone());

        let err = svc
            .provision(&user_fixture(1), PlanKind::Permanent, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Ledger(_)));
        // The credential was issued; the ledger row was not.
        assert_eq!(panel.issue_calls.lock().unwrap().len(), 1);
        assert_eq!(ledger.all().len(), 0);
    }
}
